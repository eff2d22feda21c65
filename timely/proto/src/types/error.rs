use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected frame prefix: {0:?}")]
    UnexpectedByte(char),

    #[error("invalid frame length: {0}")]
    InvalidLength(String),

    #[error("invalid integer frame: {0}")]
    InvalidInteger(String),

    #[error("frame is not utf-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("nested frames are not part of the reply model")]
    NestedFrame,

    #[error("unknown format: {0}")]
    UnknownFormat(String),

    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("wrong element type")]
    WrongElementType,
}
