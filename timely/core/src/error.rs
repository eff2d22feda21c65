use thiserror::Error;
use timely_proto::prelude::ProtoError;

/// Failures of the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(ProtoError),

    /// An error reply sent by the store itself.
    #[error("{0}")]
    Command(String),

    #[error("connection closed by peer")]
    Closed,
}

impl TransportError {
    /// Whether the stream is unusable after this error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, TransportError::Io(_) | TransportError::Closed)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::Closed
        } else {
            TransportError::Io(err)
        }
    }
}

impl From<ProtoError> for TransportError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::Io(err) => err.into(),
            other => TransportError::Protocol(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum TimelyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    SampleNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = TimelyError> = std::result::Result<T, E>;
