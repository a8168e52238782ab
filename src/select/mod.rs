//! Selector engine: derive view models from a cache snapshot.
//!
//! Selectors are pure functions of a [`Store`](crate::cache::Store), a lookup
//! target and the selector's clock. They never mutate the snapshot and, for
//! a fixed clock, return equal results for equal inputs.
//!
//! ```ignore
//! let selector = Selector::from_config(&config);
//! match selector.select_record(&store, "widgets", &RecordId::from(1u64)) {
//!     RecordView::Ready(widget) => render(widget),
//!     view if view.needs_fetch() => dispatch(FetchAction::record("widgets", 1u64)),
//!     _ => render_spinner(),
//! }
//! ```

mod collection;
mod dispatch;
mod record;
mod view;

use chrono::Duration;

use crate::cache::{
  stale_threshold, Clock, FetchError, FetchStatus, FetchTime, SystemClock,
  DEFAULT_STALE_THRESHOLD_MS,
};
use crate::config::Config;

pub use view::{CollectionView, RecordView, Selection, LOADING_MESSAGE};

/// Computes freshness verdicts against a clock and a stale threshold.
#[derive(Debug, Clone)]
pub struct Selector<C = SystemClock> {
  clock: C,
  /// How long before a completed fetch is considered stale
  stale_after: Duration,
}

impl Selector<SystemClock> {
  pub fn new(stale_after: Duration) -> Self {
    Self {
      clock: SystemClock,
      stale_after,
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.stale_threshold())
  }
}

impl Default for Selector<SystemClock> {
  fn default() -> Self {
    Self::new(stale_threshold(DEFAULT_STALE_THRESHOLD_MS))
  }
}

impl<C: Clock> Selector<C> {
  /// Use a different clock, e.g. [`FixedClock`](crate::cache::FixedClock)
  /// to evaluate a snapshot as of a given instant.
  pub fn with_clock<D: Clock>(self, clock: D) -> Selector<D> {
    Selector {
      clock,
      stale_after: self.stale_after,
    }
  }

  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.stale_after = stale_after;
    self
  }

  pub fn stale_after(&self) -> Duration {
    self.stale_after
  }

  fn status(&self, fetch_time: FetchTime, error: Option<&FetchError>) -> FetchStatus {
    FetchStatus::classify(fetch_time, error, self.clock.now(), self.stale_after)
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  //! Snapshots shared by the selector tests.

  use chrono::{DateTime, Duration, Utc};
  use serde_json::{json, Value};

  use crate::cache::{
    query_params, CollectionEntry, EntityState, FetchError, FetchTime, FixedClock, QueryParams,
    RecordEntry, RecordId, Store,
  };
  use crate::select::Selector;

  pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
  }

  pub fn selector() -> Selector<FixedClock> {
    Selector::default().with_clock(FixedClock(now()))
  }

  pub fn page(n: i64) -> QueryParams {
    query_params([("page", json!(n))])
  }

  pub fn widget(id: u64) -> Value {
    json!({ "id": id, "name": format!("widget {}", id) })
  }

  /// A store whose `widgets` page 1 was fetched at `fetch_time`.
  ///
  /// Records 1 and 2 are fresh; record 3 is stale, record 4 is in flight and
  /// record 5 failed.
  pub fn widgets(fetch_time: FetchTime, error: Option<FetchError>) -> Store {
    let mut state = EntityState::default();
    state.collections.push(CollectionEntry {
      params: page(1),
      other_info: json!({ "total": 2 }),
      ids: vec![RecordId::from(1u64), RecordId::from(2u64)],
      fetch_time,
      error,
    });
    for id in [1u64, 2] {
      state
        .by_id
        .insert(RecordId::from(id), RecordEntry::loaded(widget(id), now()));
    }
    state.by_id.insert(
      RecordId::from(3u64),
      RecordEntry::loaded(widget(3), now() - Duration::hours(25)),
    );
    state.by_id.insert(
      RecordId::from(4u64),
      RecordEntry {
        fetch_time: FetchTime::InFlight,
        error: None,
        record: None,
      },
    );
    state.by_id.insert(
      RecordId::from(5u64),
      RecordEntry {
        fetch_time: FetchTime::At(now()),
        error: Some(FetchError::new("not found").with_status(404)),
        record: Some(widget(5)),
      },
    );
    Store::new().with_entity("widgets", state)
  }

  pub fn fresh_widgets() -> Store {
    widgets(FetchTime::At(now()), None)
  }
}
