use std::borrow::Cow;
use tracing::debug;

use super::{CollectionView, Selector};
use crate::cache::{Clock, QueryParams, Store};

impl<C: Clock> Selector<C> {
  /// Look up the page of `entity_type` whose params equal `params`.
  ///
  /// Page members are projected straight from `byId`: a member record is
  /// included whenever it has a payload, whatever its own freshness. Ids with
  /// no payload are left out of `data` and reported in `unresolved`.
  pub fn select_collection<'s, R>(
    &self,
    store: &'s Store<R>,
    entity_type: &str,
    params: &QueryParams,
  ) -> CollectionView<'s, R> {
    let Some(state) = store.entity(entity_type) else {
      return CollectionView::missing();
    };
    let Some(entry) = state.collection(params) else {
      return CollectionView::missing();
    };

    let mut data = Vec::with_capacity(entry.ids.len());
    let mut unresolved = Vec::new();
    for id in &entry.ids {
      match state.record(id).and_then(|r| r.record.as_ref()) {
        Some(record) => data.push(record),
        None => unresolved.push(id),
      }
    }
    if !unresolved.is_empty() {
      debug!(
        entity_type,
        count = unresolved.len(),
        "collection members missing from byId"
      );
    }

    CollectionView {
      other_info: Cow::Borrowed(&entry.other_info),
      data,
      unresolved,
      status: self.status(entry.fetch_time, entry.error.as_ref()),
    }
  }
}
