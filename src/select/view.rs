//! View models returned by the selectors.
//!
//! The serialized forms keep the shape rendering code already expects: a
//! healthy record serializes as the bare payload, anything else as an
//! `{ isLoading, needsFetch, error }` status object.

use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::action::FetchAction;
use crate::cache::{FetchError, FetchStatus, Freshness, RecordId};

/// Message reported for a record that has never been requested.
pub const LOADING_MESSAGE: &str = "Loading...";

/// Result of looking up a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordView<'s, R> {
  /// No entry exists for the id; nothing was ever requested
  Absent,
  /// An entry exists but its payload is not renderable yet
  Pending(FetchStatus),
  /// Fresh, error-free payload
  Ready(&'s R),
}

impl<'s, R> RecordView<'s, R> {
  pub fn is_loading(&self) -> bool {
    match self {
      Self::Absent => true,
      Self::Pending(status) => status.is_loading(),
      Self::Ready(_) => false,
    }
  }

  pub fn needs_fetch(&self) -> bool {
    match self {
      Self::Absent => true,
      Self::Pending(status) => status.needs_fetch(),
      Self::Ready(_) => false,
    }
  }

  /// The error recorded by the fetch layer. `Absent` has none.
  pub fn error(&self) -> Option<&FetchError> {
    match self {
      Self::Pending(status) => status.error(),
      _ => None,
    }
  }

  /// Text to show in place of the record: the recorded error message, or
  /// [`LOADING_MESSAGE`] when the record was never requested.
  pub fn message(&self) -> Option<&str> {
    match self {
      Self::Absent => Some(LOADING_MESSAGE),
      Self::Pending(status) => status.error().map(|e| e.message.as_str()),
      Self::Ready(_) => None,
    }
  }

  pub fn freshness(&self) -> Freshness {
    match self {
      Self::Absent => Freshness::Missing,
      Self::Pending(status) => status.freshness,
      Self::Ready(_) => Freshness::Fresh,
    }
  }

  pub fn record(&self) -> Option<&'s R> {
    match self {
      Self::Ready(record) => Some(*record),
      _ => None,
    }
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, Self::Ready(_))
  }
}

impl<R: Serialize> Serialize for RecordView<'_, R> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Ready(record) => record.serialize(serializer),
      Self::Absent => {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("isLoading", &true)?;
        map.serialize_entry("needsFetch", &true)?;
        map.serialize_entry("error", &FetchError::new(LOADING_MESSAGE))?;
        map.end()
      }
      Self::Pending(status) => {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("isLoading", &status.is_loading())?;
        map.serialize_entry("needsFetch", &status.needs_fetch())?;
        map.serialize_entry("error", &status.error())?;
        map.end()
      }
    }
  }
}

/// Result of looking up one collection page.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionView<'s, R> {
  /// Page metadata, an empty object when the page is unknown
  pub other_info: Cow<'s, Value>,
  /// Records of the page, in page order
  pub data: Vec<&'s R>,
  /// Page ids with no payload in `byId`, in page order
  pub unresolved: Vec<&'s RecordId>,
  pub status: FetchStatus,
}

impl<'s, R> CollectionView<'s, R> {
  /// View of a page that is not in the cache.
  pub fn missing() -> Self {
    Self {
      other_info: Cow::Owned(Value::Object(Map::new())),
      data: Vec::new(),
      unresolved: Vec::new(),
      status: FetchStatus::missing(),
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status.is_loading()
  }

  pub fn needs_fetch(&self) -> bool {
    self.status.needs_fetch()
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.status.error()
  }
}

impl<R: Serialize> Serialize for CollectionView<'_, R> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("otherInfo", &self.other_info)?;
    map.serialize_entry("data", &self.data)?;
    map.serialize_entry("isLoading", &self.is_loading())?;
    map.serialize_entry("needsFetch", &self.needs_fetch())?;
    // An unknown page carries no error field at all.
    if self.status.freshness != Freshness::Missing {
      map.serialize_entry("error", &self.error())?;
    }
    if !self.unresolved.is_empty() {
      map.serialize_entry("unresolved", &self.unresolved)?;
    }
    map.end()
  }
}

/// A view together with the fetch action it was selected for.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'s, R> {
  Collection {
    view: CollectionView<'s, R>,
    fetch: &'s FetchAction,
  },
  Record {
    view: RecordView<'s, R>,
    fetch: &'s FetchAction,
  },
}

impl<'s, R> Selection<'s, R> {
  /// The action to dispatch to (re)fetch this data.
  pub fn fetch(&self) -> &'s FetchAction {
    match self {
      Self::Collection { fetch, .. } | Self::Record { fetch, .. } => *fetch,
    }
  }

  pub fn is_loading(&self) -> bool {
    match self {
      Self::Collection { view, .. } => view.is_loading(),
      Self::Record { view, .. } => view.is_loading(),
    }
  }

  pub fn needs_fetch(&self) -> bool {
    match self {
      Self::Collection { view, .. } => view.needs_fetch(),
      Self::Record { view, .. } => view.needs_fetch(),
    }
  }

  pub fn error(&self) -> Option<&FetchError> {
    match self {
      Self::Collection { view, .. } => view.error(),
      Self::Record { view, .. } => view.error(),
    }
  }
}

impl<R: Serialize> Serialize for Selection<'_, R> {
  /// The view's fields with a `fetch` field merged in. A record payload that
  /// is not a JSON object is placed under `record`.
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let view = match self {
      Self::Collection { view, .. } => serde_json::to_value(view),
      Self::Record { view, .. } => serde_json::to_value(view),
    }
    .map_err(S::Error::custom)?;

    let mut fields = match view {
      Value::Object(fields) => fields,
      other => {
        let mut fields = Map::new();
        fields.insert("record".to_string(), other);
        fields
      }
    };
    let fetch = serde_json::to_value(self.fetch()).map_err(S::Error::custom)?;
    fields.insert("fetch".to_string(), fetch);
    fields.serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::FetchTime;
  use chrono::{DateTime, Duration};
  use serde_json::json;

  fn status(fetch_time: FetchTime, error: Option<FetchError>) -> FetchStatus {
    let now = DateTime::from_timestamp_millis(1_000_000).unwrap();
    FetchStatus::classify(fetch_time, error.as_ref(), now, Duration::hours(24))
  }

  #[test]
  fn test_absent_record_serializes_loading_placeholder() {
    let view: RecordView<'_, Value> = RecordView::Absent;
    assert_eq!(
      serde_json::to_value(&view).unwrap(),
      json!({ "isLoading": true, "needsFetch": true, "error": { "message": "Loading..." } })
    );
    assert_eq!(view.error(), None);
    assert_eq!(view.message(), Some(LOADING_MESSAGE));
  }

  #[test]
  fn test_pending_record_serializes_null_error() {
    let view: RecordView<'_, Value> = RecordView::Pending(status(FetchTime::InFlight, None));
    assert_eq!(
      serde_json::to_value(&view).unwrap(),
      json!({ "isLoading": true, "needsFetch": false, "error": null })
    );
  }

  #[test]
  fn test_ready_record_serializes_bare_payload() {
    let record = json!({ "id": 1 });
    let view = RecordView::Ready(&record);
    assert_eq!(serde_json::to_value(&view).unwrap(), record);
  }

  #[test]
  fn test_missing_collection_has_no_error_field() {
    let view: CollectionView<'_, Value> = CollectionView::missing();
    assert_eq!(
      serde_json::to_value(&view).unwrap(),
      json!({ "otherInfo": {}, "data": [], "isLoading": true, "needsFetch": true })
    );
  }

  #[test]
  fn test_selection_merges_fetch() {
    let action = FetchAction::record("counters", 1u64);
    let count = json!(3);
    let selection = Selection::Record {
      view: RecordView::Ready(&count),
      fetch: &action,
    };

    let value = serde_json::to_value(&selection).unwrap();
    assert_eq!(value["record"], json!(3));
    assert_eq!(value["fetch"]["kind"], json!("record"));
    assert_eq!(value["fetch"]["entityType"], json!("counters"));
  }
}
