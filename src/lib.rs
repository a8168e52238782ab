//! Client-side cache freshness for entities fetched from a remote API.
//!
//! The dispatch layer keeps a normalized [`Store`] of collection pages and
//! records, each stamped with fetch metadata. A [`Selector`] reads one
//! snapshot and tells rendering code what it can show: the data, a loading
//! indicator, an error, and whether a fetch should be dispatched.

pub mod action;
pub mod cache;
pub mod config;
pub mod error;
pub mod select;

pub use action::{Endpoint, FetchAction};
pub use cache::{FetchError, FetchEvent, FetchTime, Freshness, QueryParams, RecordId, Store};
pub use config::Config;
pub use error::SelectError;
pub use select::{CollectionView, RecordView, Selection, Selector};
