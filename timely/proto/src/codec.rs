//! RESP2 framing.
//!
//! Commands go out as arrays of bulk strings. Replies come back as one of the
//! five RESP2 frame kinds; `Frame::into_ele` flattens the scalar ones into the
//! element model used everywhere else.

use std::io::{BufRead, Write};

use crate::protocol::command::Command;
use crate::types::{Ele, ProtoError};

/// Largest bulk string accepted from the wire, as in Redis.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Frame>>),
}

impl Frame {
    pub fn bulk<T: Into<Vec<u8>>>(data: T) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    pub fn from_command(command: &Command) -> Self {
        Frame::Array(Some(
            command
                .tokens()
                .into_iter()
                .map(|token| Frame::Bulk(Some(token)))
                .collect(),
        ))
    }

    /// Convert a scalar frame into an element.
    ///
    /// Error and array frames have no element form and are rejected.
    pub fn into_ele(self) -> Result<Ele, ProtoError> {
        match self {
            Frame::Simple(s) => Ok(Ele::Text(s)),
            Frame::Integer(x) => Ok(Ele::Int(x)),
            Frame::Bulk(Some(data)) => Ok(Ele::Text(String::from_utf8(data)?)),
            Frame::Bulk(None) => Ok(Ele::Nil),
            Frame::Error(_) | Frame::Array(_) => Err(ProtoError::NestedFrame),
        }
    }
}

impl From<Ele> for Frame {
    fn from(value: Ele) -> Self {
        match value {
            Ele::Nil => Frame::Bulk(None),
            Ele::Int(x) => Frame::Integer(x),
            Ele::Text(s) => Frame::Bulk(Some(s.into_bytes())),
        }
    }
}

pub fn encode_command<W: Write>(writer: &mut W, command: &Command) -> Result<(), ProtoError> {
    encode_frame(writer, &Frame::from_command(command))
}

pub fn encode_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<(), ProtoError> {
    match frame {
        Frame::Simple(s) => write!(writer, "+{s}\r\n")?,
        Frame::Error(s) => write!(writer, "-{s}\r\n")?,
        Frame::Integer(x) => write!(writer, ":{x}\r\n")?,
        Frame::Bulk(None) => writer.write_all(b"$-1\r\n")?,
        Frame::Bulk(Some(data)) => {
            write!(writer, "${}\r\n", data.len())?;
            writer.write_all(data)?;
            writer.write_all(b"\r\n")?;
        }
        Frame::Array(None) => writer.write_all(b"*-1\r\n")?,
        Frame::Array(Some(items)) => {
            write!(writer, "*{}\r\n", items.len())?;
            for item in items {
                encode_frame(writer, item)?;
            }
        }
    }
    Ok(())
}

pub fn decode_frame<R: BufRead>(reader: &mut R) -> Result<Frame, ProtoError> {
    let line = read_line(reader)?;
    let (prefix, body) = match line.split_first() {
        Some((prefix, body)) => (*prefix, body),
        None => return Err(ProtoError::InvalidLength("empty frame".to_string())),
    };
    let text = String::from_utf8(body.to_vec())?;

    match prefix {
        b'+' => Ok(Frame::Simple(text)),
        b'-' => Ok(Frame::Error(text)),
        b':' => text
            .parse()
            .map(Frame::Integer)
            .map_err(|_| ProtoError::InvalidInteger(text)),
        b'$' => match parse_length(&text)? {
            None => Ok(Frame::Bulk(None)),
            Some(len) => {
                let framed = len
                    .checked_add(2)
                    .filter(|_| len <= MAX_BULK_LEN)
                    .ok_or_else(|| ProtoError::InvalidLength(text.clone()))?;
                let mut data = vec![0u8; framed];
                reader.read_exact(&mut data)?;
                if !data.ends_with(b"\r\n") {
                    return Err(ProtoError::InvalidLength(text));
                }
                data.truncate(len);
                Ok(Frame::Bulk(Some(data)))
            }
        },
        b'*' => match parse_length(&text)? {
            None => Ok(Frame::Array(None)),
            Some(len) => {
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(decode_frame(reader)?);
                }
                Ok(Frame::Array(Some(items)))
            }
        },
        other => Err(ProtoError::UnexpectedByte(other as char)),
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, ProtoError> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    if !line.ends_with(b"\r\n") {
        return Err(ProtoError::InvalidLength(
            String::from_utf8_lossy(&line).into_owned(),
        ));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

// `-1` is the null marker for both bulk strings and arrays.
fn parse_length(text: &str) -> Result<Option<usize>, ProtoError> {
    match text.parse::<i64>() {
        Ok(-1) => Ok(None),
        Ok(len) if len >= 0 => Ok(Some(len as usize)),
        _ => Err(ProtoError::InvalidLength(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::command::Opcode;

    fn decode(bytes: &[u8]) -> Result<Frame, ProtoError> {
        decode_frame(&mut Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn test_encode_command() {
        let cmd = Command::new(Opcode::Get)
            .arg("s")
            .arg(5i64)
            .arg("value");
        let mut buf = Vec::new();
        encode_command(&mut buf, &cmd).unwrap();
        assert_eq!(
            buf,
            b"*4\r\n$3\r\nGET\r\n$1\r\ns\r\n$1\r\n5\r\n$5\r\nvalue\r\n".to_vec()
        );
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(b"+PONG\r\n").unwrap(), Frame::Simple("PONG".into()));
        assert_eq!(decode(b":1\r\n").unwrap(), Frame::Integer(1));
        assert_eq!(decode(b"$-1\r\n").unwrap(), Frame::Bulk(None));
        assert_eq!(decode(b"$2\r\n10\r\n").unwrap(), Frame::bulk("10"));
        assert_eq!(
            decode(b"-ERR no such series\r\n").unwrap(),
            Frame::Error("ERR no such series".into())
        );
    }

    #[test]
    fn test_decode_array() {
        let frame = decode(b"*3\r\n$1\r\n0\r\n:7\r\n$-1\r\n").unwrap();
        let items = match frame {
            Frame::Array(Some(items)) => items,
            other => panic!("unexpected frame {other:?}"),
        };
        let eles = items
            .into_iter()
            .map(Frame::into_ele)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(eles, vec![Ele::from("0"), Ele::Int(7), Ele::Nil]);
        assert_eq!(decode(b"*-1\r\n").unwrap(), Frame::Array(None));
    }

    #[test]
    fn test_bulk_may_contain_crlf() {
        assert_eq!(
            decode(b"$4\r\na\r\nb\r\n").unwrap(),
            Frame::bulk("a\r\nb")
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode(b""), Err(ProtoError::Io(_))));
        assert!(matches!(decode(b"?x\r\n"), Err(ProtoError::UnexpectedByte('?'))));
        assert!(matches!(decode(b":abc\r\n"), Err(ProtoError::InvalidInteger(_))));
        assert!(matches!(decode(b"$-5\r\n"), Err(ProtoError::InvalidLength(_))));
        assert!(matches!(decode(b"$3\r\nab"), Err(ProtoError::Io(_))));
        assert!(matches!(decode(b"+OK\n"), Err(ProtoError::InvalidLength(_))));
    }

    #[test]
    fn test_oversized_bulk_is_rejected_before_reading() {
        for header in [
            "$9223372036854775807\r\n".to_string(),
            format!("${}\r\n", MAX_BULK_LEN + 1),
        ] {
            assert!(
                matches!(decode(header.as_bytes()), Err(ProtoError::InvalidLength(_))),
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_frame_roundtrip_through_encoder() {
        let frame = Frame::Array(Some(vec![
            Frame::Integer(-3),
            Frame::bulk("json"),
            Frame::Bulk(None),
        ]));
        let mut buf = Vec::new();
        encode_frame(&mut buf, &frame).unwrap();
        assert_eq!(decode(&buf).unwrap(), frame);
    }

    #[test]
    fn test_nested_frames_have_no_element_form() {
        assert!(Frame::Array(Some(vec![])).into_ele().is_err());
        assert!(Frame::Error("ERR".into()).into_ele().is_err());
    }
}
