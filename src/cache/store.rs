//! Normalized cache snapshot: entity states, collection pages and records.

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Query parameters identifying a collection page (e.g. `{ "page": 1 }`).
///
/// Ordered map so that two queries with the same pairs compare equal
/// regardless of the order they were written in.
pub type QueryParams = BTreeMap<String, Value>;

/// Build a [`QueryParams`] mapping from name/value pairs.
pub fn query_params<I, K>(pairs: I) -> QueryParams
where
  I: IntoIterator<Item = (K, Value)>,
  K: Into<String>,
{
  pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Whether two query parameter maps name the same page.
///
/// Numbers compare by numeric value, so a page stored as `{ "page": 1.0 }`
/// answers a query for `{ "page": 1 }`.
pub(super) fn same_params(a: &QueryParams, b: &QueryParams) -> bool {
  a.len() == b.len()
    && a
      .iter()
      .zip(b)
      .all(|((ka, va), (kb, vb))| ka == kb && same_value(va, vb))
}

fn same_value(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
    (Value::Array(x), Value::Array(y)) => {
      x.len() == y.len() && x.iter().zip(y).all(|(v, w)| same_value(v, w))
    }
    (Value::Object(x), Value::Object(y)) => {
      x.len() == y.len()
        && x
          .iter()
          .all(|(k, v)| y.get(k).is_some_and(|w| same_value(v, w)))
    }
    _ => a == b,
  }
}

/// Key of a record inside an entity type's `byId` table.
///
/// Ids arrive either as strings or as integers. Both forms are normalized to
/// their string representation, so `1` and `"1"` address the same record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RecordId {
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

impl From<String> for RecordId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

impl From<u64> for RecordId {
  fn from(id: u64) -> Self {
    Self(id.to_string())
  }
}

impl From<i64> for RecordId {
  fn from(id: i64) -> Self {
    Self(id.to_string())
  }
}

impl From<u32> for RecordId {
  fn from(id: u32) -> Self {
    Self(id.to_string())
  }
}

impl From<i32> for RecordId {
  fn from(id: i32) -> Self {
    Self(id.to_string())
  }
}

impl Serialize for RecordId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for RecordId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct RecordIdVisitor;

    impl Visitor<'_> for RecordIdVisitor {
      type Value = RecordId;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer record id")
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
        Ok(RecordId::from(v))
      }

      fn visit_string<E: de::Error>(self, v: String) -> Result<RecordId, E> {
        Ok(RecordId(v))
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
        Ok(RecordId::from(v))
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
        Ok(RecordId::from(v))
      }
    }

    deserializer.deserialize_any(RecordIdVisitor)
  }
}

/// When an entry was last fetched.
///
/// Serialized as the host application's tri-state number: `null` (or an
/// absent field) for never fetched, `0` while a fetch is in flight, and a
/// millisecond Unix timestamp once a fetch has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchTime {
  /// No fetch has ever been started
  #[default]
  Never,
  /// A fetch is currently outstanding
  InFlight,
  /// The last fetch completed (successfully or not) at this time
  At(DateTime<Utc>),
}

impl FetchTime {
  /// Interpret a raw millisecond value. Negative values are not valid.
  pub fn from_millis(ms: i64) -> Option<Self> {
    match ms {
      0 => Some(Self::InFlight),
      ms if ms > 0 => DateTime::from_timestamp_millis(ms).map(Self::At),
      _ => None,
    }
  }

  /// The raw millisecond representation, `None` when never fetched.
  pub fn as_millis(&self) -> Option<i64> {
    match self {
      Self::Never => None,
      Self::InFlight => Some(0),
      Self::At(at) => Some(at.timestamp_millis()),
    }
  }
}

impl From<DateTime<Utc>> for FetchTime {
  fn from(at: DateTime<Utc>) -> Self {
    Self::At(at)
  }
}

impl Serialize for FetchTime {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self.as_millis() {
      Some(ms) => serializer.serialize_i64(ms),
      None => serializer.serialize_none(),
    }
  }
}

impl<'de> Deserialize<'de> for FetchTime {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    match Option::<i64>::deserialize(deserializer)? {
      None => Ok(Self::Never),
      Some(ms) => Self::from_millis(ms)
        .ok_or_else(|| de::Error::custom(format!("invalid fetch time {}", ms))),
    }
  }
}

/// Error recorded by the fetch layer for a collection page or a record.
///
/// Stored verbatim and surfaced unchanged by the selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FetchError {
  pub message: String,
  /// HTTP status of the failed response, when there was one
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<u16>,
}

impl FetchError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      status: None,
    }
  }

  pub fn with_status(mut self, status: u16) -> Self {
    self.status = Some(status);
    self
  }
}

fn empty_object() -> Value {
  Value::Object(Map::new())
}

/// One fetched page of an entity type, identified by its query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
  #[serde(default)]
  pub params: QueryParams,
  /// Page metadata returned alongside the ids (totals, cursors, ...)
  #[serde(default = "empty_object")]
  pub other_info: Value,
  /// Ids of the records on this page, in server order
  #[serde(default)]
  pub ids: Vec<RecordId>,
  #[serde(default)]
  pub fetch_time: FetchTime,
  #[serde(default)]
  pub error: Option<FetchError>,
}

impl CollectionEntry {
  /// A page that has never been fetched.
  pub fn new(params: QueryParams) -> Self {
    Self {
      params,
      other_info: empty_object(),
      ids: Vec::new(),
      fetch_time: FetchTime::Never,
      error: None,
    }
  }
}

/// A single record and the metadata of the fetch that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: Deserialize<'de>"))]
pub struct RecordEntry<R> {
  #[serde(default)]
  pub fetch_time: FetchTime,
  #[serde(default)]
  pub error: Option<FetchError>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub record: Option<R>,
}

impl<R> RecordEntry<R> {
  pub fn loaded(record: R, at: DateTime<Utc>) -> Self {
    Self {
      fetch_time: FetchTime::At(at),
      error: None,
      record: Some(record),
    }
  }
}

impl<R> Default for RecordEntry<R> {
  fn default() -> Self {
    Self {
      fetch_time: FetchTime::Never,
      error: None,
      record: None,
    }
  }
}

/// Everything cached for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: Deserialize<'de>"))]
pub struct EntityState<R> {
  /// Collection pages in fetch order
  #[serde(default)]
  pub collections: Vec<CollectionEntry>,
  #[serde(default)]
  pub by_id: BTreeMap<RecordId, RecordEntry<R>>,
}

impl<R> Default for EntityState<R> {
  fn default() -> Self {
    Self {
      collections: Vec::new(),
      by_id: BTreeMap::new(),
    }
  }
}

impl<R> EntityState<R> {
  /// Find the page whose params structurally equal `params`.
  pub fn collection(&self, params: &QueryParams) -> Option<&CollectionEntry> {
    self
      .collections
      .iter()
      .find(|entry| same_params(&entry.params, params))
  }

  pub fn record(&self, id: &RecordId) -> Option<&RecordEntry<R>> {
    self.by_id.get(id)
  }
}

/// Immutable cache snapshot keyed by entity-type name.
///
/// Entity states are shared behind `Arc`, so cloning a store is cheap and
/// [`Store::apply`](crate::cache::Store::apply) only copies the entity type
/// an event touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store<R = Value> {
  pub(super) entities: BTreeMap<String, Arc<EntityState<R>>>,
}

impl<R> Default for Store<R> {
  fn default() -> Self {
    Self {
      entities: BTreeMap::new(),
    }
  }
}

impl<R> Store<R> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Return a store with `state` installed under `entity_type`.
  pub fn with_entity(mut self, entity_type: impl Into<String>, state: EntityState<R>) -> Self {
    self.entities.insert(entity_type.into(), Arc::new(state));
    self
  }

  pub fn entity(&self, entity_type: &str) -> Option<&EntityState<R>> {
    self.entities.get(entity_type).map(Arc::as_ref)
  }

  pub fn entity_types(&self) -> impl Iterator<Item = &str> {
    self.entities.keys().map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.entities.is_empty()
  }
}
