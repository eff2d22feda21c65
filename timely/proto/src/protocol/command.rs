use std::fmt::Display;
use std::str::FromStr;

use crate::types::{Ele, ProtoError};

/// Commands understood by the store.
///
/// `DelSeries` covers both whole-series deletion (`DELSERIES series`) and
/// per-sample deletion (`DELSERIES series time`); the arity tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Ping,
    Info,
    Exists,
    Dimensions,
    Members,
    Range,
    Get,
    Set,
    DelSeries,
}

impl Opcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Ping => "PING",
            Opcode::Info => "INFO",
            Opcode::Exists => "EXISTS",
            Opcode::Dimensions => "DIMENSIONS",
            Opcode::Members => "MEMBERS",
            Opcode::Range => "RANGE",
            Opcode::Get => "GET",
            Opcode::Set => "SET",
            Opcode::DelSeries => "DELSERIES",
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opcode {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PING" => Ok(Opcode::Ping),
            "INFO" => Ok(Opcode::Info),
            "EXISTS" => Ok(Opcode::Exists),
            "DIMENSIONS" => Ok(Opcode::Dimensions),
            "MEMBERS" => Ok(Opcode::Members),
            "RANGE" => Ok(Opcode::Range),
            "GET" => Ok(Opcode::Get),
            "SET" => Ok(Opcode::Set),
            "DELSERIES" => Ok(Opcode::DelSeries),
            _ => Err(ProtoError::UnknownOpcode(s.to_string())),
        }
    }
}

/// An ordered token sequence: the opcode followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    args: Vec<Ele>,
}

impl Command {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: Vec::new(),
        }
    }

    pub fn arg<T: Into<Ele>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Ele>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn arguments(&self) -> &[Ele] {
        &self.args
    }

    /// Opcode and arguments as wire tokens, opcode first.
    pub fn tokens(&self) -> Vec<Vec<u8>> {
        std::iter::once(self.opcode.as_str().as_bytes().to_vec())
            .chain(self.args.iter().map(Ele::to_wire))
            .collect()
    }

    /// Rebuild a command from received tokens, as a server would.
    pub fn from_tokens<I, T>(tokens: I) -> Result<Self, ProtoError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ele>,
    {
        let mut tokens = tokens.into_iter().map(Into::into);
        let opcode = match tokens.next() {
            Some(Ele::Text(name)) => name.parse()?,
            Some(other) => return Err(ProtoError::UnknownOpcode(other.to_string())),
            None => return Err(ProtoError::UnknownOpcode(String::new())),
        };
        Ok(Command::new(opcode).args(tokens))
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.opcode.as_str())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
