use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ProtoError;

/// Output codec requested from the store for multi-record queries.
///
/// Only `Native` replies are decoded into records; the JSON codecs come back
/// as pre-encoded text and are handed to the caller untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Format {
    #[default]
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "json.object")]
    JsonObject,
    #[serde(rename = "json.array")]
    JsonArray,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Native => "native",
            Format::JsonObject => "json.object",
            Format::JsonArray => "json.array",
        }
    }

    pub fn is_json(&self) -> bool {
        !matches!(self, Format::Native)
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Format::Native),
            "json.object" => Ok(Format::JsonObject),
            "json.array" => Ok(Format::JsonArray),
            _ => Err(ProtoError::UnknownFormat(s.to_string())),
        }
    }
}

impl From<Format> for crate::types::Ele {
    fn from(value: Format) -> Self {
        crate::types::Ele::Text(value.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        for format in [Format::Native, Format::JsonObject, Format::JsonArray] {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
        assert!("json".parse::<Format>().is_err());
        assert!(!Format::Native.is_json());
        assert!(Format::JsonArray.is_json());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&Format::JsonObject).unwrap(),
            r#""json.object""#
        );
        let format: Format = serde_json::from_str(r#""native""#).unwrap();
        assert_eq!(format, Format::Native);
    }
}
