use thiserror::Error;

/// A fetch action that cannot be routed to a selector.
///
/// These indicate a bug in whatever built the descriptor, not a cache state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
  #[error("fetch action has an empty entity type")]
  EmptyEntityType,

  #[error("record fetch for {entity_type} has an empty id")]
  EmptyRecordId { entity_type: String },
}
