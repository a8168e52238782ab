use super::{RecordView, Selector};
use crate::cache::{Clock, RecordId, Store};

impl<C: Clock> Selector<C> {
  /// Look up one record of `entity_type`.
  ///
  /// Returns [`RecordView::Ready`] only for a fresh, error-free entry that
  /// carries a payload. A missing entry is [`RecordView::Absent`]; every
  /// other case is [`RecordView::Pending`] with the entry's status.
  pub fn select_record<'s, R>(
    &self,
    store: &'s Store<R>,
    entity_type: &str,
    id: &RecordId,
  ) -> RecordView<'s, R> {
    let Some(entry) = store.entity(entity_type).and_then(|state| state.record(id)) else {
      return RecordView::Absent;
    };

    let status = self.status(entry.fetch_time, entry.error.as_ref());
    match &entry.record {
      Some(record) if status.is_ready() => RecordView::Ready(record),
      _ => RecordView::Pending(status),
    }
  }

  /// The record if it is ready to render, `None` for every other state.
  ///
  /// For callers that only care whether the data is there, not why it isn't.
  pub fn select_record_or_empty<'s, R>(
    &self,
    store: &'s Store<R>,
    entity_type: &str,
    id: &RecordId,
  ) -> Option<&'s R> {
    self.select_record(store, entity_type, id).record()
  }
}
