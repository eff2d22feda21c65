//! Reply reshaping.
//!
//! The store answers the same command with different shapes depending on how
//! many records matched and which codec was requested. Everything here is a
//! pure function from a [`Reply`] to the shape the caller asked for.

use serde::Serialize;
use timely_proto::prelude::{Ele, Format, Reply};

use crate::error::{Result, TimelyError};

/// Decoded reply of a multi-record query (`MEMBERS`, `RANGE`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Members {
    /// One tuple per record, fields in reply order.
    Tuples(Vec<Vec<Ele>>),
    /// A pre-encoded payload passed through as the store sent it.
    Encoded(Ele),
    /// One pre-encoded document per record.
    Documents(Vec<Ele>),
}

impl Members {
    pub fn tuples(&self) -> Option<&[Vec<Ele>]> {
        match self {
            Members::Tuples(tuples) => Some(tuples),
            Members::Encoded(_) | Members::Documents(_) => None,
        }
    }

    /// Number of records, counting a lone encoded payload as one unless nil.
    pub fn len(&self) -> usize {
        match self {
            Members::Tuples(tuples) => tuples.len(),
            Members::Documents(documents) => documents.len(),
            Members::Encoded(payload) => usize::from(!payload.is_nil()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded `INFO` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Info {
    Fields(Vec<(String, Ele)>),
    Scalar(Ele),
}

impl Info {
    pub fn get(&self, key: &str) -> Option<&Ele> {
        match self {
            Info::Fields(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Info::Scalar(_) => None,
        }
    }
}

/// An integer reply is true when it is `1`; every other shape stays unknown.
///
/// A nil reply is what a deferred (pipelined) command yields; it must not be
/// mistaken for `false`.
pub fn boolify(reply: &Reply) -> Option<bool> {
    match reply {
        Reply::Scalar(Ele::Int(x)) => Some(*x == 1),
        _ => None,
    }
}

/// Pair a flat `k1 v1 k2 v2 ...` sequence into ordered fields.
pub fn hashify(reply: Reply) -> Info {
    match reply {
        Reply::Seq(items) => {
            let mut fields = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let Some(key) = items.next() {
                fields.push((key.to_string(), items.next().unwrap_or_default()));
            }
            Info::Fields(fields)
        }
        Reply::Scalar(ele) => Info::Scalar(ele),
    }
}

/// Dimension names, from either a space-delimited string or a sequence.
pub fn names(reply: Reply) -> Vec<String> {
    match reply {
        Reply::Scalar(Ele::Text(s)) => s.split_whitespace().map(str::to_string).collect(),
        Reply::Scalar(Ele::Nil) => Vec::new(),
        Reply::Scalar(ele) => vec![ele.to_string()],
        Reply::Seq(items) => items
            .into_iter()
            .filter(|ele| !ele.is_nil())
            .map(|ele| ele.to_string())
            .collect(),
    }
}

/// Values of a single sample; a lone scalar becomes a one-element sequence.
pub fn values(reply: Reply) -> Vec<Ele> {
    match reply {
        Reply::Seq(items) => items,
        Reply::Scalar(ele) => vec![ele],
    }
}

/// Values of a single sample, or `None` when the reply is not a sequence.
///
/// The store answers a lookup of a missing sample with nil or a status
/// string; only a sequence carries field values.
pub fn sample(reply: Reply) -> Option<Vec<Ele>> {
    match reply {
        Reply::Seq(items) => Some(items),
        Reply::Scalar(_) => None,
    }
}

/// Split a multi-record reply into records of `arity` fields each.
///
/// For `native` a sequence is chunked and a lone scalar is a single one-field
/// record. The JSON codecs are never decoded: a sequence holds one document
/// per record and a lone scalar is the whole payload.
pub fn partition(reply: Reply, arity: usize, format: Format) -> Result<Members> {
    match reply {
        Reply::Seq(items) if format.is_json() => Ok(Members::Documents(items)),
        Reply::Seq(_) if arity == 0 => Err(TimelyError::InvalidArgument(
            "at least one dimension must be requested".to_string(),
        )),
        Reply::Seq(items) => Ok(Members::Tuples(
            items.chunks(arity).map(<[Ele]>::to_vec).collect(),
        )),
        Reply::Scalar(ele) if format.is_json() => Ok(Members::Encoded(ele)),
        Reply::Scalar(ele) => Ok(Members::Tuples(vec![vec![ele]])),
    }
}
