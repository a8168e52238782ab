//! Freshness classification for cached entries.

use chrono::{DateTime, Duration, Utc};

use super::store::{FetchError, FetchTime};

/// Default age after which a completed fetch is stale (24 hours).
pub const DEFAULT_STALE_THRESHOLD_MS: u64 = 24 * 60 * 60 * 1000;

/// Convert a millisecond threshold into a [`Duration`], saturating at the
/// largest representable span.
pub fn stale_threshold(ms: u64) -> Duration {
  i64::try_from(ms)
    .ok()
    .and_then(Duration::try_milliseconds)
    .unwrap_or(Duration::MAX)
}

/// Source of "now" for staleness decisions.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock pinned to one instant, for evaluating a snapshot reproducibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}

/// Where an entry stands relative to its last fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
  /// There is no entry at all
  Missing,
  /// An entry exists but no fetch was ever started for it
  Unfetched,
  /// A fetch is outstanding
  InFlight,
  /// The last fetch is older than the stale threshold
  Stale,
  Fresh,
}

impl Freshness {
  /// Classify a fetch time as of `now`.
  ///
  /// Staleness is strictly `now - at > stale_after`; a timestamp in the
  /// future counts as fresh.
  pub fn classify(fetch_time: FetchTime, now: DateTime<Utc>, stale_after: Duration) -> Self {
    match fetch_time {
      FetchTime::Never => Self::Unfetched,
      FetchTime::InFlight => Self::InFlight,
      FetchTime::At(at) if now - at > stale_after => Self::Stale,
      FetchTime::At(_) => Self::Fresh,
    }
  }

  /// Whether a loading indicator should be shown.
  ///
  /// Stale entries count as loading because a re-fetch is about to start.
  pub fn is_loading(self) -> bool {
    matches!(self, Self::Missing | Self::InFlight | Self::Stale)
  }

  /// Whether a new fetch should be dispatched. Never true while one is in flight.
  pub fn needs_fetch(self) -> bool {
    matches!(self, Self::Missing | Self::Unfetched | Self::Stale)
  }

  pub fn is_fresh(self) -> bool {
    self == Self::Fresh
  }
}

/// Freshness verdict plus the error recorded for the entry, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStatus {
  pub freshness: Freshness,
  pub error: Option<FetchError>,
}

impl FetchStatus {
  /// Status of a lookup that found no entry.
  pub fn missing() -> Self {
    Self {
      freshness: Freshness::Missing,
      error: None,
    }
  }

  pub fn classify(
    fetch_time: FetchTime,
    error: Option<&FetchError>,
    now: DateTime<Utc>,
    stale_after: Duration,
  ) -> Self {
    Self {
      freshness: Freshness::classify(fetch_time, now, stale_after),
      error: error.cloned(),
    }
  }

  pub fn is_loading(&self) -> bool {
    self.freshness.is_loading()
  }

  pub fn needs_fetch(&self) -> bool {
    self.freshness.needs_fetch()
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_ref()
  }

  /// Fresh and error-free: the cached data can be rendered as is.
  pub fn is_ready(&self) -> bool {
    self.freshness.is_fresh() && self.error.is_none()
  }
}
