//! Conversions out of `Ele`.
//!
//! Replies from the store are mostly text, so the numeric conversions here
//! accept both `Int` elements and text that parses cleanly.

use super::error::ProtoError;
use super::Ele;

/// Trait for converting Ele to various types
pub trait FromEle: Sized {
    /// Convert an Ele value to this type
    ///
    /// # Errors
    /// Returns `ProtoError::WrongElementType` if the conversion is not possible
    fn from_ele(ele: &Ele) -> Result<Self, ProtoError>;
}

impl FromEle for String {
    fn from_ele(ele: &Ele) -> Result<Self, ProtoError> {
        match ele {
            Ele::Text(s) => Ok(s.clone()),
            Ele::Int(i) => Ok(i.to_string()),
            Ele::Nil => Err(ProtoError::WrongElementType),
        }
    }
}

impl FromEle for i64 {
    fn from_ele(ele: &Ele) -> Result<Self, ProtoError> {
        match ele {
            Ele::Int(x) => Ok(*x),
            Ele::Text(s) => s.trim().parse().map_err(|_| ProtoError::WrongElementType),
            Ele::Nil => Err(ProtoError::WrongElementType),
        }
    }
}

impl FromEle for i32 {
    fn from_ele(ele: &Ele) -> Result<Self, ProtoError> {
        let x = i64::from_ele(ele)?;
        i32::try_from(x).map_err(|_| ProtoError::WrongElementType)
    }
}

impl FromEle for f64 {
    fn from_ele(ele: &Ele) -> Result<Self, ProtoError> {
        match ele {
            Ele::Int(x) => Ok(*x as f64),
            Ele::Text(s) => parse_float(s).ok_or(ProtoError::WrongElementType),
            Ele::Nil => Err(ProtoError::WrongElementType),
        }
    }
}

impl<T: FromEle> FromEle for Option<T> {
    fn from_ele(ele: &Ele) -> Result<Self, ProtoError> {
        match ele {
            Ele::Nil => Ok(None),
            _ => T::from_ele(ele).map(Some),
        }
    }
}

/// Floats as the store prints them, including `inf`, `-inf` and `+inf`.
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("inf")) {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    s.parse().ok()
}

/// Extension trait for Ele to provide convenient conversion methods
pub trait EleExt {
    /// Convert Ele to String, handling all types
    fn to_string_lossy(&self) -> String;

    /// Try to convert Ele to a specific type
    fn parse_as<T: FromEle>(&self) -> Result<T, ProtoError>;

    /// Borrow the text of a `Text` element
    fn as_str(&self) -> Option<&str>;

    /// Integer value of an `Int` element or of text holding an integer
    fn as_i64(&self) -> Option<i64>;

    /// Float value of a numeric element
    fn as_f64(&self) -> Option<f64>;
}

impl EleExt for Ele {
    fn to_string_lossy(&self) -> String {
        self.to_string()
    }

    fn parse_as<T: FromEle>(&self) -> Result<T, ProtoError> {
        T::from_ele(self)
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Ele::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        i64::from_ele(self).ok()
    }

    fn as_f64(&self) -> Option<f64> {
        f64::from_ele(self).ok()
    }
}
