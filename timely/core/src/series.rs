//! Series instances bound to a [`SeriesModel`].
//!
//! ```no_run
//! use std::time::SystemTime;
//!
//! use timely_core::prelude::*;
//!
//! timely_core::series_model! {
//!     pub struct Position {
//!         value,
//!         position_lat: lazy,
//!         position_long: lazy,
//!     }
//! }
//!
//! let series = Series::<Position>::open("vehicle.42")?;
//! let now = SystemTime::now();
//! series.add(now, [("value", "1"), ("position_lat", "52.1")])?;
//!
//! let record = series.get(now, &GetOptions::default())?;
//! assert!(record.get("position_lat").is_none());
//!
//! let everything = series.all(&Query::new().include(["value", "position_lat"]))?;
//! let encoded = series.all(&Query::new().codec(Format::JsonObject))?;
//! # Ok::<(), TimelyError>(())
//! ```

use std::marker::PhantomData;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use timely_proto::prelude::{Ele, Format, FromEle};

use crate::connection::{self, Connection};
use crate::decode::Members;
use crate::error::{Result, TimelyError};
use crate::schema::{Schema, SeriesModel};
use crate::time::{self, SampleTime};

/// Name under which a sample's time appears in records.
pub const TIME_FIELD: &str = "time";

/// One sample as ordered `(field, value)` pairs, `time` first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Ele)>,
}

impl Record {
    /// Pair `names` with `values` positionally. Missing values are nil and
    /// surplus values are dropped.
    pub fn zip(names: &[String], values: Vec<Ele>) -> Self {
        let mut values = values.into_iter();
        let mut record = Record::default();
        for name in names {
            record.insert(name.clone(), values.next().unwrap_or_default());
        }
        record
    }

    /// Set a field, keeping its position if it is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Ele>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Ele> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn time(&self) -> Option<i64> {
        self.get(TIME_FIELD).and_then(|t| i64::from_ele(t).ok())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Ele)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<(String, Ele)> {
        self.fields
    }
}

impl<K: Into<String>, V: Into<Ele>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::default();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Post-decoding shape of a multi-record result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Keyed records.
    Hash,
    /// Tuples as decoded.
    Array,
    /// Whatever the decoder produced, encoded payloads included.
    Raw,
}

impl FromStr for Shape {
    type Err = TimelyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hash" => Ok(Shape::Hash),
            "array" => Ok(Shape::Array),
            "raw" => Ok(Shape::Raw),
            _ => Err(TimelyError::InvalidArgument(format!(
                "unknown result shape `{s}`, expected hash, array or raw"
            ))),
        }
    }
}

/// Which samples a multi-record query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryRange {
    #[default]
    All,
    /// Closed on both ends.
    Between { from: i64, to: i64 },
}

impl QueryRange {
    pub fn between<A: SampleTime, B: SampleTime>(from: A, to: B) -> Self {
        QueryRange::Between {
            from: time::coerce_to_id(&from),
            to: time::coerce_to_id(&to),
        }
    }
}

impl<T: SampleTime> From<RangeInclusive<T>> for QueryRange {
    fn from(range: RangeInclusive<T>) -> Self {
        let (from, to) = range.into_inner();
        QueryRange::between(from, to)
    }
}

impl FromStr for QueryRange {
    type Err = TimelyError;

    /// `all`, `a..b` or `a..=b`; both bounded forms include `b`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "all" {
            return Ok(QueryRange::All);
        }
        let invalid = || {
            TimelyError::InvalidArgument(format!(
                "invalid query range `{s}`, expected `all` or `from..to`"
            ))
        };
        let (from, to) = s.split_once("..").ok_or_else(invalid)?;
        let to = to.strip_prefix('=').unwrap_or(to);
        let from: i64 = from.trim().parse().map_err(|_| invalid())?;
        let to: i64 = to.trim().parse().map_err(|_| invalid())?;
        Ok(QueryRange::Between { from, to })
    }
}

/// Options for [`Series::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Must be absent or `native`.
    pub codec: Option<Format>,
    /// Defaults to the schema's eager dimensions.
    pub include: Option<Vec<String>>,
}

impl GetOptions {
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn codec(mut self, codec: Format) -> Self {
        self.codec = Some(codec);
        self
    }
}

/// Options for [`Series::all`].
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Defaults to `native`.
    pub codec: Option<Format>,
    /// Defaults to the schema's eager dimensions.
    pub include: Option<Vec<String>>,
    pub range: QueryRange,
    /// Defaults to `hash` for `native` and `raw` otherwise.
    pub shape: Option<Shape>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codec(mut self, codec: Format) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn range(mut self, range: impl Into<QueryRange>) -> Self {
        self.range = range.into();
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }
}

/// Result of [`Series::all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Selection {
    Records(Vec<Record>),
    Tuples(Vec<Vec<Ele>>),
    Encoded(Ele),
    /// One encoded payload per record.
    Documents(Vec<Ele>),
}

impl Selection {
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Selection::Records(records) => Some(records),
            _ => None,
        }
    }

    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Selection::Records(records) => Some(records),
            _ => None,
        }
    }

    pub fn encoded(&self) -> Option<&Ele> {
        match self {
            Selection::Encoded(payload) => Some(payload),
            _ => None,
        }
    }

    /// Number of records; a lone encoded payload counts as one unless nil.
    pub fn len(&self) -> usize {
        match self {
            Selection::Records(records) => records.len(),
            Selection::Tuples(tuples) => tuples.len(),
            Selection::Encoded(payload) => usize::from(!payload.is_nil()),
            Selection::Documents(documents) => documents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named series whose dimensions are described by `M`.
pub struct Series<M> {
    id: String,
    connection: Arc<Connection>,
    model: PhantomData<fn() -> M>,
}

impl<M> Clone for Series<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            connection: self.connection.clone(),
            model: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for Series<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Series").field("id", &self.id).finish()
    }
}

impl<M: SeriesModel> Series<M> {
    pub fn new(connection: Arc<Connection>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connection,
            model: PhantomData,
        }
    }

    /// Bind to the process-wide default connection.
    pub fn open(id: impl Into<String>) -> Result<Self> {
        Ok(Self::new(connection::current()?, id))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &'static Schema {
        M::schema()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// The series id, or the id and `subkeys` joined with dots.
    pub fn key_for_series(&self, subkeys: &[&str]) -> String {
        if subkeys.is_empty() {
            self.id.clone()
        } else {
            format!("{}.{}", self.id, subkeys.join("."))
        }
    }

    pub fn coerce_to_id<T: SampleTime + ?Sized>(value: &T) -> i64 {
        time::coerce_to_id(value)
    }

    /// Write one sample. Fields the schema does not declare are dropped.
    pub fn add<T, I, K, V>(&self, time: T, fields: I) -> Result<Option<bool>>
    where
        T: SampleTime,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Ele>,
    {
        let schema = self.schema();
        let fields: Vec<(String, Ele)> = fields
            .into_iter()
            .filter(|(name, _)| schema.contains(name.as_ref()))
            .map(|(name, value)| (name.as_ref().to_string(), value.into()))
            .collect();
        self.connection
            .set(&self.key_for_series(&[]), Self::coerce_to_id(&time), fields)
    }

    pub fn remove<T: SampleTime>(&self, time: T) -> Result<Option<bool>> {
        self.connection
            .delete_member(&self.key_for_series(&[]), Self::coerce_to_id(&time))
    }

    pub fn destroy(&self) -> Result<Option<bool>> {
        self.connection.delete_series(&self.key_for_series(&[]))
    }

    pub fn exists(&self) -> Result<Option<bool>> {
        self.connection.exists(&self.key_for_series(&[]))
    }

    /// Dimensions actually stored on the sample at `time`.
    pub fn dimensions_at<T: SampleTime>(&self, time: T) -> Result<Vec<String>> {
        self.connection
            .dimensions(&self.key_for_series(&[]), Self::coerce_to_id(&time))
    }

    /// Fetch one sample as a keyed record.
    pub fn get<T: SampleTime>(&self, time: T, options: &GetOptions) -> Result<Record> {
        if let Some(codec) = options.codec.filter(Format::is_json) {
            return Err(TimelyError::InvalidArgument(format!(
                "cannot fetch a single sample encoded as {codec}"
            )));
        }
        let include = self.include(options.include.as_deref());
        let id = Self::coerce_to_id(&time);
        let values = self
            .connection
            .synchronize(|s| s.sample(&self.key_for_series(&[]), id, &include))?
            .ok_or_else(|| {
                TimelyError::SampleNotFound(format!("sample was not found at index: {id}"))
            })?;
        Ok(Record::zip(&record_fields(&include), values))
    }

    /// Fetch every sample, or those in a closed time range.
    pub fn all(&self, query: &Query) -> Result<Selection> {
        let codec = query.codec.unwrap_or_default();
        let shape = query.shape.unwrap_or(if codec.is_json() {
            Shape::Raw
        } else {
            Shape::Hash
        });
        let include = self.include(query.include.as_deref());
        let key = self.key_for_series(&[]);

        let members = match query.range {
            QueryRange::All => self.connection.members_with_time(&key, codec, &include)?,
            // The wire range excludes its upper bound.
            QueryRange::Between { from, to } => {
                self.connection
                    .range_with_time(&key, codec, from, to.saturating_add(1), &include)?
            }
        };
        format_results(&record_fields(&include), members, shape)
    }

    /// Dimensions to request. The store leads every reply with the sample
    /// time on its own, so `time` is never sent.
    fn include(&self, include: Option<&[String]>) -> Vec<String> {
        let names = match include {
            Some(names) => names.to_vec(),
            None => self.schema().names(false),
        };
        names.into_iter().filter(|name| name != TIME_FIELD).collect()
    }
}

// Names for zipping a reply tuple: the store-supplied time, then `include`.
fn record_fields(include: &[String]) -> Vec<String> {
    std::iter::once(TIME_FIELD.to_string())
        .chain(include.iter().cloned())
        .collect()
}

fn format_results(fields: &[String], members: Members, shape: Shape) -> Result<Selection> {
    match (shape, members) {
        (Shape::Hash, Members::Tuples(tuples)) => Ok(Selection::Records(
            tuples
                .into_iter()
                .map(|tuple| Record::zip(fields, tuple))
                .collect(),
        )),
        (Shape::Hash, Members::Encoded(_) | Members::Documents(_)) => {
            Err(TimelyError::InvalidArgument(
                "an encoded result cannot be shaped as hash".to_string(),
            ))
        }
        (Shape::Array | Shape::Raw, Members::Tuples(tuples)) => Ok(Selection::Tuples(tuples)),
        (Shape::Array | Shape::Raw, Members::Encoded(payload)) => Ok(Selection::Encoded(payload)),
        (Shape::Array | Shape::Raw, Members::Documents(documents)) => {
            Ok(Selection::Documents(documents))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_zip() {
        let names = vec!["time".to_string(), "value".to_string()];
        let record = Record::zip(&names, vec![Ele::from("0"), Ele::from("1")]);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["time", "value"]);
        assert_eq!(record.time(), Some(0));
        assert_eq!(record.get("value"), Some(&Ele::from("1")));

        let short = Record::zip(&names, vec![Ele::from("0")]);
        assert_eq!(short.get("value"), Some(&Ele::Nil));
        let long = Record::zip(&names, vec![Ele::Int(1), Ele::Int(2), Ele::Int(3)]);
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn test_record_serializes_in_order() {
        let record: Record = [("time", "1000"), ("value", "2"), ("alpha", "x")]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"time":"1000","value":"2","alpha":"x"}"#
        );
    }

    #[test]
    fn test_query_range_parse() {
        assert_eq!("all".parse::<QueryRange>().unwrap(), QueryRange::All);
        assert_eq!(
            "10..20".parse::<QueryRange>().unwrap(),
            QueryRange::Between { from: 10, to: 20 }
        );
        assert_eq!(
            "-5..=5".parse::<QueryRange>().unwrap(),
            QueryRange::Between { from: -5, to: 5 }
        );
        for bad in ["", "everything", "1..", "a..b", "1-2"] {
            assert!(
                matches!(bad.parse::<QueryRange>(), Err(TimelyError::InvalidArgument(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_query_range_coerces_bounds() {
        assert_eq!(
            QueryRange::from(1.9f64..=3.2f64),
            QueryRange::Between { from: 1, to: 3 }
        );
    }

    #[test]
    fn test_shape_parse() {
        assert_eq!("hash".parse::<Shape>().unwrap(), Shape::Hash);
        assert_eq!("raw".parse::<Shape>().unwrap(), Shape::Raw);
        assert!("table".parse::<Shape>().is_err());
    }

    #[test]
    fn test_record_fields_lead_with_time() {
        assert_eq!(
            record_fields(&["value".to_string(), "alpha".to_string()]),
            vec!["time", "value", "alpha"]
        );
        assert_eq!(record_fields(&[]), vec!["time"]);
    }

    #[test]
    fn test_format_results() {
        let fields = vec!["time".to_string(), "value".to_string()];
        let tuples = Members::Tuples(vec![vec![Ele::from("0"), Ele::from("1")]]);

        let hashed = format_results(&fields, tuples.clone(), Shape::Hash).unwrap();
        assert_eq!(hashed.records().unwrap()[0].get("value"), Some(&Ele::from("1")));

        let raw = format_results(&fields, tuples, Shape::Array).unwrap();
        assert_eq!(
            raw,
            Selection::Tuples(vec![vec![Ele::from("0"), Ele::from("1")]])
        );

        let blob = Members::Encoded(Ele::from("[]"));
        assert!(format_results(&fields, blob.clone(), Shape::Hash).is_err());
        assert_eq!(
            format_results(&fields, blob, Shape::Raw).unwrap(),
            Selection::Encoded(Ele::from("[]"))
        );

        let documents = Members::Documents(vec![Ele::from("{}"), Ele::from("{}")]);
        assert!(format_results(&fields, documents.clone(), Shape::Hash).is_err());
        assert_eq!(format_results(&fields, documents, Shape::Raw).unwrap().len(), 2);
    }
}
