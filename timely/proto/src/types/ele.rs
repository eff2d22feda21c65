use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A single scalar exchanged with the store.
///
/// Every command token and every reply element is an `Ele`. The store speaks
/// a text protocol, so a dimension value comes back as `Text` even when it was
/// written as a number; integer replies (`EXISTS`, `SET`, ...) come back as `Int`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Hash, Clone, Default)]
#[serde(untagged)]
pub enum Ele {
    #[default]
    Nil,
    Int(i64),
    Text(String),
}

impl Ele {
    pub fn is_nil(&self) -> bool {
        matches!(self, Ele::Nil)
    }

    /// Bytes sent on the wire when this element is used as a command token.
    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            Ele::Nil => Vec::new(),
            Ele::Int(x) => x.to_string().into_bytes(),
            Ele::Text(x) => x.as_bytes().to_vec(),
        }
    }
}

impl Display for Ele {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ele::Nil => f.write_str("nil"),
            Ele::Int(x) => f.write_fmt(format_args!("{x}")),
            Ele::Text(x) => f.write_str(x),
        }
    }
}

impl From<&str> for Ele {
    fn from(value: &str) -> Self {
        Ele::Text(value.to_string())
    }
}

impl From<String> for Ele {
    fn from(value: String) -> Self {
        Ele::Text(value)
    }
}

impl From<&String> for Ele {
    fn from(value: &String) -> Self {
        Ele::Text(value.clone())
    }
}

impl From<i64> for Ele {
    fn from(value: i64) -> Self {
        Ele::Int(value)
    }
}

impl From<i32> for Ele {
    fn from(value: i32) -> Self {
        Ele::Int(value as i64)
    }
}

impl From<u32> for Ele {
    fn from(value: u32) -> Self {
        Ele::Int(value as i64)
    }
}

impl From<u64> for Ele {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(x) => Ele::Int(x),
            Err(_) => Ele::Text(value.to_string()),
        }
    }
}

impl From<usize> for Ele {
    fn from(value: usize) -> Self {
        Ele::from(value as u64)
    }
}

// Floats and booleans have no integer reply form; they travel as text.
impl From<f64> for Ele {
    fn from(value: f64) -> Self {
        Ele::Text(value.to_string())
    }
}

impl From<f32> for Ele {
    fn from(value: f32) -> Self {
        Ele::Text(value.to_string())
    }
}

impl From<bool> for Ele {
    fn from(value: bool) -> Self {
        Ele::Text(value.to_string())
    }
}

impl<T: Into<Ele>> From<Option<T>> for Ele {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Ele::Nil)
    }
}
