use tracing::warn;

use super::{Selection, Selector};
use crate::action::FetchAction;
use crate::cache::{Clock, Store};
use crate::error::SelectError;

impl<C: Clock> Selector<C> {
  /// Select whatever `action` would fetch, and attach the action to the result.
  ///
  /// Fails only for descriptors that cannot name a cache entry (see
  /// [`FetchAction::validate`]).
  pub fn select<'s, R>(
    &self,
    store: &'s Store<R>,
    action: &'s FetchAction,
  ) -> Result<Selection<'s, R>, SelectError> {
    if let Err(e) = action.validate() {
      warn!(error = %e, ?action, "rejecting fetch action");
      return Err(e);
    }

    Ok(match action {
      FetchAction::Collection {
        entity_type,
        params,
        ..
      } => Selection::Collection {
        view: self.select_collection(store, entity_type, params),
        fetch: action,
      },
      FetchAction::Record {
        entity_type, id, ..
      } => Selection::Record {
        view: self.select_record(store, entity_type, id),
        fetch: action,
      },
    })
  }
}
