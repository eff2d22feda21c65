use std::io::{BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use timely_proto::prelude::{decode_frame, encode_command, Command, Ele, Frame, Reply};

use crate::config::ConnectionConfig;
use crate::error::TransportError;

/// Request/reply channel to the store.
///
/// Implementations send one command and wait for its reply. Reconnection, if
/// any, happens here; callers never retry.
pub trait Transport: Send {
    fn call(&mut self, command: &Command) -> Result<Reply, TransportError>;

    /// Enable or disable reconnect-on-failure, returning the previous setting.
    ///
    /// Transports that never reconnect keep the default.
    fn set_reconnect(&mut self, enabled: bool) -> bool {
        let _ = enabled;
        false
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&mut self, command: &Command) -> Result<Reply, TransportError> {
        (**self).call(command)
    }

    fn set_reconnect(&mut self, enabled: bool) -> bool {
        (**self).set_reconnect(enabled)
    }
}

/// RESP2 over a single TCP stream, opened on first use.
pub struct TcpTransport {
    config: ConnectionConfig,
    reconnect: bool,
    stream: Option<BufReader<TcpStream>>,
}

impl TcpTransport {
    pub fn new(config: ConnectionConfig) -> Self {
        let reconnect = config.reconnect;
        Self {
            config,
            reconnect,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Drop the current stream; the next call opens a fresh one.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("disconnected from {}", self.config.address());
        }
    }

    fn connect(&self) -> Result<BufReader<TcpStream>, TransportError> {
        let address = self.config.address();
        let stream = match self.config.connect_timeout {
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in address.to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match (connected, last_err) {
                    (Some(stream), _) => stream,
                    (None, Some(err)) => return Err(err.into()),
                    (None, None) => {
                        return Err(TransportError::Io(std::io::Error::new(
                            std::io::ErrorKind::AddrNotAvailable,
                            format!("{address} did not resolve"),
                        )))
                    }
                }
            }
            None => TcpStream::connect(&address)?,
        };
        stream.set_read_timeout(self.config.read_timeout)?;
        stream.set_nodelay(true)?;
        log::debug!("connected to {address}");
        Ok(BufReader::new(stream))
    }

    fn roundtrip(&mut self, command: &Command) -> Result<Reply, TransportError> {
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Closed);
        };

        let mut buf = Vec::new();
        encode_command(&mut buf, command)?;
        let frame = stream
            .get_mut()
            .write_all(&buf)
            .map_err(TransportError::from)
            .and_then(|_| decode_frame(stream).map_err(TransportError::from));

        match frame {
            Ok(frame) => into_reply(frame),
            Err(err) => {
                // The stream position is unknown after a failed read or write.
                self.stream = None;
                Err(err)
            }
        }
    }
}

impl Transport for TcpTransport {
    fn call(&mut self, command: &Command) -> Result<Reply, TransportError> {
        match self.roundtrip(command) {
            Err(err) if self.reconnect && err.is_connection_error() => {
                log::warn!(
                    "{} failed ({err}), reconnecting to {}",
                    command.opcode(),
                    self.config.address()
                );
                self.roundtrip(command)
            }
            other => other,
        }
    }

    fn set_reconnect(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.reconnect, enabled)
    }
}

/// Map a decoded frame onto the reply model.
pub fn into_reply(frame: Frame) -> Result<Reply, TransportError> {
    match frame {
        Frame::Error(message) => Err(TransportError::Command(message)),
        Frame::Array(None) => Ok(Reply::Scalar(Ele::Nil)),
        Frame::Array(Some(items)) => items
            .into_iter()
            .map(Frame::into_ele)
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Seq)
            .map_err(TransportError::from),
        scalar => Ok(Reply::Scalar(scalar.into_ele()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_reply() {
        assert_eq!(
            into_reply(Frame::Simple("PONG".into())).unwrap(),
            Reply::Scalar(Ele::from("PONG"))
        );
        assert_eq!(into_reply(Frame::Array(None)).unwrap(), Reply::nil());
        assert_eq!(
            into_reply(Frame::Array(Some(vec![Frame::bulk("0"), Frame::Integer(1)]))).unwrap(),
            Reply::Seq(vec![Ele::from("0"), Ele::Int(1)])
        );
    }

    #[test]
    fn test_error_frame_is_command_error() {
        let err = into_reply(Frame::Error("ERR no such series".into())).unwrap_err();
        assert!(matches!(err, TransportError::Command(msg) if msg == "ERR no such series"));
    }

    #[test]
    fn test_nested_array_is_protocol_error() {
        let frame = Frame::Array(Some(vec![Frame::Array(Some(vec![]))]));
        assert!(matches!(
            into_reply(frame),
            Err(TransportError::Protocol(_))
        ));
    }

    #[test]
    fn test_reconnect_flag_swaps() {
        let mut transport = TcpTransport::new(ConnectionConfig::default());
        assert!(transport.set_reconnect(false));
        assert!(!transport.set_reconnect(true));
        assert!(!transport.is_connected());
    }
}
