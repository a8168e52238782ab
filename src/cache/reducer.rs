//! Copy-on-write store updates driven by fetch lifecycle events.
//!
//! The dispatch layer reports what happened to a fetch; [`Store::apply`]
//! returns the next snapshot. The input snapshot is never touched: entity
//! states are shared behind `Arc` and only the one an event targets is
//! cloned before it is modified.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::store::{
  same_params, CollectionEntry, EntityState, FetchError, FetchTime, QueryParams, RecordEntry,
  RecordId, Store,
};
use crate::action::FetchAction;

/// Something that happened to a fetch described by a [`FetchAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent<R> {
  /// The request was sent
  Started(FetchAction),
  /// A collection page arrived
  CollectionLoaded {
    action: FetchAction,
    /// Records on the page, in order
    records: Vec<(RecordId, R)>,
    other_info: Value,
    at: DateTime<Utc>,
  },
  /// A single record arrived
  RecordLoaded {
    action: FetchAction,
    record: R,
    at: DateTime<Utc>,
  },
  /// The request failed
  Failed {
    action: FetchAction,
    error: FetchError,
    at: DateTime<Utc>,
  },
}

impl<R> FetchEvent<R> {
  pub fn action(&self) -> &FetchAction {
    match self {
      Self::Started(action)
      | Self::CollectionLoaded { action, .. }
      | Self::RecordLoaded { action, .. }
      | Self::Failed { action, .. } => action,
    }
  }
}

/// Location of one entry inside a store.
enum Target<'a> {
  Collection(&'a str, &'a QueryParams),
  Record(&'a str, &'a RecordId),
}

impl<'a> From<&'a FetchAction> for Target<'a> {
  fn from(action: &'a FetchAction) -> Self {
    match action {
      FetchAction::Collection {
        entity_type,
        params,
        ..
      } => Target::Collection(entity_type, params),
      FetchAction::Record {
        entity_type, id, ..
      } => Target::Record(entity_type, id),
    }
  }
}

impl<R: Clone> Store<R> {
  /// Produce the snapshot that follows `event`.
  ///
  /// A loaded event whose action kind does not match (e.g. `RecordLoaded`
  /// carrying a collection action) leaves the store unchanged.
  pub fn apply(&self, event: &FetchEvent<R>) -> Self {
    let mut next = self.clone();
    let entity_type = event.action().entity_type();

    match event {
      FetchEvent::Started(action) => {
        debug!(entity_type, "fetch started");
        next.update(action.into(), |fetch_time, error| {
          *fetch_time = FetchTime::InFlight;
          *error = None;
        });
      }
      FetchEvent::CollectionLoaded {
        action: FetchAction::Collection { params, .. },
        records,
        other_info,
        at,
      } => {
        debug!(entity_type, count = records.len(), "collection loaded");
        let state = next.entity_mut(entity_type);
        for (id, record) in records {
          state
            .by_id
            .insert(id.clone(), RecordEntry::loaded(record.clone(), *at));
        }
        let entry = collection_mut(state, params);
        entry.ids = records.iter().map(|(id, _)| id.clone()).collect();
        entry.other_info = other_info.clone();
        entry.fetch_time = FetchTime::At(*at);
        entry.error = None;
      }
      FetchEvent::RecordLoaded {
        action: FetchAction::Record { id, .. },
        record,
        at,
      } => {
        debug!(entity_type, %id, "record loaded");
        next
          .entity_mut(entity_type)
          .by_id
          .insert(id.clone(), RecordEntry::loaded(record.clone(), *at));
      }
      FetchEvent::Failed { action, error, at } => {
        debug!(entity_type, %error, "fetch failed");
        next.update(action.into(), |fetch_time, slot| {
          *fetch_time = FetchTime::At(*at);
          *slot = Some(error.clone());
        });
      }
      FetchEvent::CollectionLoaded { .. } | FetchEvent::RecordLoaded { .. } => {
        debug!(
          entity_type,
          "loaded event does not match its action kind, ignoring"
        );
      }
    }

    next
  }

  /// Unshare and return the state for `entity_type`, creating it if needed.
  fn entity_mut(&mut self, entity_type: &str) -> &mut EntityState<R> {
    let shared = self
      .entities
      .entry(entity_type.to_string())
      .or_insert_with(|| Arc::new(EntityState::default()));
    Arc::make_mut(shared)
  }

  /// Edit the fetch metadata of the entry at `target`, creating it if needed.
  fn update<F>(&mut self, target: Target<'_>, edit: F)
  where
    F: FnOnce(&mut FetchTime, &mut Option<FetchError>),
  {
    match target {
      Target::Collection(entity_type, params) => {
        let entry = collection_mut(self.entity_mut(entity_type), params);
        edit(&mut entry.fetch_time, &mut entry.error);
      }
      Target::Record(entity_type, id) => {
        let entry = self
          .entity_mut(entity_type)
          .by_id
          .entry(id.clone())
          .or_default();
        edit(&mut entry.fetch_time, &mut entry.error);
      }
    }
  }
}

/// The page matching `params`, appended in fetch order when absent.
fn collection_mut<'a, R>(
  state: &'a mut EntityState<R>,
  params: &QueryParams,
) -> &'a mut CollectionEntry {
  let index = match state.collections.iter().position(|c| same_params(&c.params, params)) {
    Some(index) => index,
    None => {
      state.collections.push(CollectionEntry::new(params.clone()));
      state.collections.len() - 1
    }
  };
  &mut state.collections[index]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::query_params;
  use serde_json::json;

  fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
  }

  fn page(n: i64) -> FetchAction {
    FetchAction::collection("widgets", query_params([("page", json!(n))]))
  }

  #[test]
  fn test_started_marks_in_flight_without_touching_input() {
    let before: Store = Store::new();
    let after = before.apply(&FetchEvent::Started(page(1)));

    assert!(before.is_empty());
    let entry = after
      .entity("widgets")
      .unwrap()
      .collection(&query_params([("page", json!(1))]))
      .unwrap();
    assert_eq!(entry.fetch_time, FetchTime::InFlight);
  }

  #[test]
  fn test_collection_loaded_normalizes_records() {
    let store: Store = Store::new()
      .apply(&FetchEvent::Started(page(1)))
      .apply(&FetchEvent::CollectionLoaded {
        action: page(1),
        records: vec![
          (RecordId::from(1u64), json!({ "id": 1 })),
          (RecordId::from(2u64), json!({ "id": 2 })),
        ],
        other_info: json!({ "total": 2 }),
        at: at(1_000),
      });

    let widgets = store.entity("widgets").unwrap();
    assert_eq!(widgets.collections.len(), 1);
    let entry = &widgets.collections[0];
    assert_eq!(entry.ids, vec![RecordId::from(1u64), RecordId::from(2u64)]);
    assert_eq!(entry.other_info, json!({ "total": 2 }));
    assert_eq!(entry.fetch_time, FetchTime::At(at(1_000)));

    let second = widgets.record(&RecordId::from(2u64)).unwrap();
    assert_eq!(second.record, Some(json!({ "id": 2 })));
    assert_eq!(second.fetch_time, FetchTime::At(at(1_000)));
  }

  #[test]
  fn test_pages_keep_fetch_order() {
    let store: Store = Store::new()
      .apply(&FetchEvent::Started(page(2)))
      .apply(&FetchEvent::Started(page(1)))
      .apply(&FetchEvent::Started(page(2)));

    let params: Vec<_> = store
      .entity("widgets")
      .unwrap()
      .collections
      .iter()
      .map(|c| c.params["page"].clone())
      .collect();
    assert_eq!(params, vec![json!(2), json!(1)]);
  }

  #[test]
  fn test_failure_keeps_previous_record() {
    let action = FetchAction::record("widgets", 7u64);
    let loaded: Store = Store::new().apply(&FetchEvent::RecordLoaded {
      action: action.clone(),
      record: json!({ "id": 7 }),
      at: at(1_000),
    });
    let failed = loaded
      .apply(&FetchEvent::Started(action.clone()))
      .apply(&FetchEvent::Failed {
        action,
        error: FetchError::new("gateway timeout").with_status(504),
        at: at(2_000),
      });

    let entry = failed
      .entity("widgets")
      .unwrap()
      .record(&RecordId::from(7u64))
      .unwrap();
    assert_eq!(entry.fetch_time, FetchTime::At(at(2_000)));
    assert_eq!(entry.error.as_ref().and_then(|e| e.status), Some(504));
    assert_eq!(entry.record, Some(json!({ "id": 7 })));

    let original = loaded
      .entity("widgets")
      .unwrap()
      .record(&RecordId::from(7u64))
      .unwrap();
    assert_eq!(original.error, None);
  }

  #[test]
  fn test_restart_clears_error() {
    let action = page(1);
    let store: Store = Store::new()
      .apply(&FetchEvent::Failed {
        action: action.clone(),
        error: FetchError::new("nope"),
        at: at(1_000),
      })
      .apply(&FetchEvent::Started(action));

    let entry = &store.entity("widgets").unwrap().collections[0];
    assert_eq!(entry.error, None);
    assert_eq!(entry.fetch_time, FetchTime::InFlight);
  }

  #[test]
  fn test_every_event_names_its_action() {
    let action = FetchAction::record("widgets", 7u64);
    let events: Vec<FetchEvent<Value>> = vec![
      FetchEvent::Started(action.clone()),
      FetchEvent::RecordLoaded {
        action: action.clone(),
        record: json!({ "id": 7 }),
        at: at(1_000),
      },
      FetchEvent::Failed {
        action: action.clone(),
        error: FetchError::new("nope"),
        at: at(1_000),
      },
    ];
    for event in &events {
      assert_eq!(event.action(), &action);
    }
  }

  #[test]
  fn test_mismatched_loaded_event_is_ignored() {
    let store: Store = Store::new();
    let next = store.apply(&FetchEvent::RecordLoaded {
      action: page(1),
      record: json!({}),
      at: at(1_000),
    });
    assert_eq!(next, store);
  }

  #[test]
  fn test_untouched_entity_types_stay_shared() {
    let store: Store = Store::new()
      .apply(&FetchEvent::Started(page(1)))
      .apply(&FetchEvent::Started(FetchAction::record("gadgets", 1u64)));
    let next = store.apply(&FetchEvent::Started(page(2)));

    assert!(Arc::ptr_eq(
      &store.entities["gadgets"],
      &next.entities["gadgets"]
    ));
    assert!(!Arc::ptr_eq(
      &store.entities["widgets"],
      &next.entities["widgets"]
    ));
  }
}
