//! Fetch action descriptors produced by the dispatch layer.
//!
//! The dispatch layer builds one of these per network request and hands it
//! to [`Selector::select`](crate::select::Selector::select) to find out what
//! the cache currently holds for that request. The descriptor is returned
//! with the selection so the caller can dispatch it again when a fetch is
//! needed.

use serde::{Deserialize, Serialize};

use crate::cache::{QueryParams, RecordId};
use crate::error::SelectError;

/// Remote endpoint a fetch action targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
  #[serde(default = "default_method")]
  pub method: String,
  pub path: String,
}

fn default_method() -> String {
  "GET".to_string()
}

impl Endpoint {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: default_method(),
      path: path.into(),
    }
  }
}

/// A request to fetch either one page of a collection or one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FetchAction {
  #[serde(rename_all = "camelCase")]
  Collection {
    entity_type: String,
    #[serde(default)]
    params: QueryParams,
    endpoint: Endpoint,
  },
  #[serde(rename_all = "camelCase")]
  Record {
    entity_type: String,
    id: RecordId,
    endpoint: Endpoint,
  },
}

impl FetchAction {
  /// Fetch the page of `entity_type` matching `params` from `/{entity_type}`.
  pub fn collection(entity_type: impl Into<String>, params: QueryParams) -> Self {
    let entity_type = entity_type.into();
    let endpoint = Endpoint::get(format!("/{}", entity_type));
    Self::Collection {
      entity_type,
      params,
      endpoint,
    }
  }

  /// Fetch one record from `/{entity_type}/{id}`.
  pub fn record(entity_type: impl Into<String>, id: impl Into<RecordId>) -> Self {
    let entity_type = entity_type.into();
    let id = id.into();
    let endpoint = Endpoint::get(format!("/{}/{}", entity_type, id));
    Self::Record {
      entity_type,
      id,
      endpoint,
    }
  }

  /// Replace the default endpoint.
  pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
    match &mut self {
      Self::Collection { endpoint: e, .. } | Self::Record { endpoint: e, .. } => *e = endpoint,
    }
    self
  }

  pub fn entity_type(&self) -> &str {
    match self {
      Self::Collection { entity_type, .. } | Self::Record { entity_type, .. } => entity_type,
    }
  }

  pub fn endpoint(&self) -> &Endpoint {
    match self {
      Self::Collection { endpoint, .. } | Self::Record { endpoint, .. } => endpoint,
    }
  }

  /// Reject descriptors that cannot name a cache entry.
  pub fn validate(&self) -> Result<(), SelectError> {
    if self.entity_type().is_empty() {
      return Err(SelectError::EmptyEntityType);
    }
    if let Self::Record { entity_type, id, .. } = self {
      if id.is_empty() {
        return Err(SelectError::EmptyRecordId {
          entity_type: entity_type.clone(),
        });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::query_params;
  use serde_json::json;

  #[test]
  fn test_default_endpoints() {
    let page = FetchAction::collection("widgets", query_params([("page", json!(1))]));
    assert_eq!(page.endpoint(), &Endpoint::get("/widgets"));

    let one = FetchAction::record("widgets", 42u64);
    assert_eq!(one.endpoint().path, "/widgets/42");
    assert_eq!(one.entity_type(), "widgets");
  }

  #[test]
  fn test_descriptor_json_shape() {
    let action: FetchAction = serde_json::from_value(json!({
      "kind": "record",
      "entityType": "widgets",
      "id": 3,
      "endpoint": { "path": "/widgets/3" }
    }))
    .unwrap();

    assert_eq!(action, FetchAction::record("widgets", 3u64));
  }

  #[test]
  fn test_unknown_kind_is_rejected() {
    let parsed = serde_json::from_value::<FetchAction>(json!({
      "kind": "bulk",
      "entityType": "widgets",
      "endpoint": { "path": "/widgets" }
    }));
    assert!(parsed.is_err());
  }

  #[test]
  fn test_validate() {
    assert_eq!(
      FetchAction::collection("", QueryParams::new()).validate(),
      Err(SelectError::EmptyEntityType)
    );
    assert_eq!(
      FetchAction::record("widgets", "").validate(),
      Err(SelectError::EmptyRecordId {
        entity_type: "widgets".to_string()
      })
    );
    assert!(FetchAction::record("widgets", 1u64).validate().is_ok());
  }

  #[test]
  fn test_with_endpoint() {
    let action = FetchAction::collection("widgets", QueryParams::new())
      .with_endpoint(Endpoint::get("/api/v2/widgets"));
    assert_eq!(action.endpoint().path, "/api/v2/widgets");
  }
}
