//! Normalized client-side cache for entities fetched from a remote API.
//!
//! This module holds the snapshot model the selectors read:
//! - One [`EntityState`] per entity type, with collection pages and records
//! - Fetch metadata per entry, using the `null` / `0` / timestamp tri-state
//! - Freshness classification against a configurable stale threshold
//! - Copy-on-write updates from fetch lifecycle events

mod freshness;
mod reducer;
mod store;

pub use freshness::{
  stale_threshold, Clock, FetchStatus, FixedClock, Freshness, SystemClock,
  DEFAULT_STALE_THRESHOLD_MS,
};
pub use reducer::FetchEvent;
pub use store::{
  query_params, CollectionEntry, EntityState, FetchError, FetchTime, QueryParams, RecordEntry,
  RecordId, Store,
};
