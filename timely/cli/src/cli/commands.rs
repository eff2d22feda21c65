use anyhow::Result;
use clap::Subcommand;
use serde_json::{Map, Value};
use timely_core::connection::Connection;
use timely_core::decode::{Info, Members};
use timely_core::series::TIME_FIELD;
use timely_proto::prelude::{Ele, Format};

/// What a command prints: JSON built here, or a payload the store already encoded.
#[derive(Debug, PartialEq)]
pub enum Output {
    Json(Value),
    Raw(String),
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the store answers
    Ping,

    /// Show store information
    Info,

    /// Check whether a series exists
    #[command(visible_aliases = ["ex"])]
    Exists { series: String },

    /// List the dimensions stored on one sample
    #[command(visible_aliases = ["dims"])]
    Dimensions {
        series: String,
        #[arg(allow_negative_numbers = true)]
        time: i64,
    },

    /// Read dimensions of one sample
    ///
    /// Examples:
    /// ```bash
    /// $ timely get vehicle.42 1700000000000 value position_lat
    /// ```
    Get {
        series: String,
        #[arg(allow_negative_numbers = true)]
        time: i64,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Write dimensions of one sample
    ///
    /// Examples:
    /// ```bash
    /// $ timely set vehicle.42 1700000000000 value=1 position_lat=52.1
    /// ```
    Set {
        series: String,
        #[arg(allow_negative_numbers = true)]
        time: i64,
        #[arg(required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Read dimensions of every sample in a series
    #[command(visible_aliases = ["ls"])]
    Members {
        series: String,
        /// native, json.object or json.array
        #[arg(short, long, default_value = "native")]
        format: Format,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Read dimensions of the samples with FROM <= time < TO
    Range {
        series: String,
        #[arg(allow_negative_numbers = true)]
        from: i64,
        #[arg(allow_negative_numbers = true)]
        to: i64,
        /// native, json.object or json.array
        #[arg(short, long, default_value = "native")]
        format: Format,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Delete a series, or one sample when TIME is given
    #[command(visible_aliases = ["rm"])]
    Del {
        series: String,
        #[arg(allow_negative_numbers = true)]
        time: Option<i64>,
    },
}

impl Commands {
    pub fn execute(&self, conn: &Connection) -> Result<Output> {
        let output = match self {
            Commands::Ping => Output::Json(serde_json::to_value(conn.ping()?)?),
            Commands::Info => Output::Json(match conn.info()? {
                Info::Fields(fields) => Value::Object(
                    fields
                        .into_iter()
                        .map(|(key, value)| serde_json::to_value(value).map(|v| (key, v)))
                        .collect::<Result<Map<_, _>, _>>()?,
                ),
                Info::Scalar(value) => serde_json::to_value(value)?,
            }),
            Commands::Exists { series } => Output::Json(serde_json::to_value(conn.exists(series)?)?),
            Commands::Dimensions { series, time } => {
                Output::Json(serde_json::to_value(conn.dimensions(series, *time)?)?)
            }
            Commands::Get {
                series,
                time,
                fields,
            } => {
                // The store leads the reply with the sample time.
                let values = conn.get(series, *time, fields)?;
                let names: Vec<String> = std::iter::once(TIME_FIELD.to_string())
                    .chain(fields.iter().cloned())
                    .collect();
                Output::Json(keyed(&names, values)?)
            }
            Commands::Set {
                series,
                time,
                fields,
            } => {
                let fields = fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()));
                Output::Json(serde_json::to_value(conn.set(series, *time, fields)?)?)
            }
            Commands::Members {
                series,
                format,
                fields,
            } => members(conn.members_with_time(series, *format, fields)?)?,
            Commands::Range {
                series,
                from,
                to,
                format,
                fields,
            } => members(conn.range_with_time(series, *format, *from, *to, fields)?)?,
            Commands::Del { series, time } => {
                let deleted = match time {
                    Some(time) => conn.delete_member(series, *time)?,
                    None => conn.delete_series(series)?,
                };
                Output::Json(serde_json::to_value(deleted)?)
            }
        };
        Ok(output)
    }
}

fn keyed(fields: &[String], values: Vec<Ele>) -> Result<Value> {
    let mut values = values.into_iter();
    let mut object = Map::new();
    for field in fields {
        let value = values.next().unwrap_or_default();
        object.insert(field.clone(), serde_json::to_value(value)?);
    }
    Ok(Value::Object(object))
}

fn members(members: Members) -> Result<Output> {
    Ok(match members {
        Members::Encoded(Ele::Text(payload)) => Output::Raw(payload),
        Members::Documents(documents) => Output::Raw(
            documents
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Output::Json(serde_json::to_value(other)?),
    })
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got `{s}`")),
    }
}
