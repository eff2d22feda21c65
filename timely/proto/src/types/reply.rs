use serde::{Deserialize, Serialize};

use super::Ele;

/// A successful reply from the store.
///
/// Error replies never appear here; the transport turns them into errors.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum Reply {
    Scalar(Ele),
    Seq(Vec<Ele>),
}

impl Reply {
    pub fn nil() -> Self {
        Reply::Scalar(Ele::Nil)
    }

    pub fn is_seq(&self) -> bool {
        matches!(self, Reply::Seq(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Scalar(Ele::Nil))
    }
}

impl From<Ele> for Reply {
    fn from(value: Ele) -> Self {
        Reply::Scalar(value)
    }
}

impl FromIterator<Ele> for Reply {
    fn from_iter<I: IntoIterator<Item = Ele>>(iter: I) -> Self {
        Reply::Seq(iter.into_iter().collect())
    }
}
