//! Requester-keyed store of the most recent search results.
//!
//! Holds each requester's last candidate list so a later "picked item N"
//! action can be mapped back to a concrete video id without re-searching.
//! Entries live until overwritten by a new search or cleared by the caller —
//! there is no expiry, a known limitation inherited on purpose (a requester
//! who never completes a selection keeps one small entry alive).
//!
//! Clearing is a caller obligation, owed once a selection has actually been
//! consumed (a fetch was attempted, win or lose). A rejected selection — no
//! session, index out of range — does not count as consumption: the store
//! keeps the entry so the requester can re-pick from the same list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use crate::error::SelectionError;
use crate::resolver::Candidate;

/// Identity of the requesting user, assigned by the front end.
pub type RequesterId = u64;

/// Shared handle to the session store. Cloning is cheap; all clones see the
/// same state. Keyed by requester, so different requesters never contend;
/// racing calls from the same requester are last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct SearchSessions {
  inner: Arc<StdMutex<HashMap<RequesterId, Vec<Candidate>>>>,
}

impl SearchSessions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `candidates` as the requester's current session, replacing any
  /// prior one outright (never merged).
  pub fn record(&self, requester: RequesterId, candidates: Vec<Candidate>) {
    self.inner.lock().unwrap().insert(requester, candidates);
  }

  /// The requester's current candidate list, if any.
  pub fn get(&self, requester: RequesterId) -> Option<Vec<Candidate>> {
    self.inner.lock().unwrap().get(&requester).cloned()
  }

  /// Map a selection index back to the stored candidate. Fails explicitly
  /// when the session is gone or the index is out of bounds — stale buttons
  /// must never crash the flow.
  pub fn resolve_selection(&self, requester: RequesterId, index: usize) -> Result<Candidate, SelectionError> {
    let sessions = self.inner.lock().unwrap();
    let candidates = sessions.get(&requester).ok_or(SelectionError::NoSession(requester))?;
    candidates
      .get(index)
      .cloned()
      .ok_or(SelectionError::OutOfRange { index, len: candidates.len() })
  }

  /// Drop the requester's session. Callers must do this once a selection has
  /// been consumed (successfully or not) so a stale list can't be reused.
  pub fn clear(&self, requester: RequesterId) {
    self.inner.lock().unwrap().remove(&requester);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn candidate(id: &str) -> Candidate {
    Candidate { id: id.to_string(), title: format!("title for {}", id), duration_secs: 100 }
  }

  #[test]
  fn record_then_get_round_trip() {
    let sessions = SearchSessions::new();
    sessions.record(1, vec![candidate("a"), candidate("b")]);
    let stored = sessions.get(1).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, "a");
    assert!(sessions.get(2).is_none());
  }

  #[test]
  fn resolve_selection_in_bounds() {
    let sessions = SearchSessions::new();
    sessions.record(7, vec![candidate("a"), candidate("b"), candidate("c")]);
    assert_eq!(sessions.resolve_selection(7, 2).unwrap().id, "c");
  }

  #[test]
  fn resolve_selection_without_session_is_invalid() {
    let sessions = SearchSessions::new();
    assert_eq!(sessions.resolve_selection(42, 0), Err(SelectionError::NoSession(42)));
  }

  #[test]
  fn resolve_selection_out_of_bounds_is_invalid() {
    let sessions = SearchSessions::new();
    sessions.record(7, vec![candidate("a")]);
    assert_eq!(sessions.resolve_selection(7, 1), Err(SelectionError::OutOfRange { index: 1, len: 1 }));
    assert_eq!(sessions.resolve_selection(7, 999), Err(SelectionError::OutOfRange { index: 999, len: 1 }));
  }

  #[test]
  fn rejected_selection_leaves_session_intact() {
    let sessions = SearchSessions::new();
    sessions.record(1, vec![candidate("a")]);
    assert!(sessions.resolve_selection(1, 5).is_err());
    // Rejection is not consumption; the same list is still pickable.
    assert_eq!(sessions.resolve_selection(1, 0).unwrap().id, "a");
  }

  #[test]
  fn second_record_replaces_first() {
    let sessions = SearchSessions::new();
    sessions.record(1, vec![candidate("old-1"), candidate("old-2")]);
    sessions.record(1, vec![candidate("new-1")]);
    let stored = sessions.get(1).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, "new-1");
    // The old second entry is gone, not merged in.
    assert!(sessions.resolve_selection(1, 1).is_err());
  }

  #[test]
  fn clear_then_resolve_is_invalid() {
    let sessions = SearchSessions::new();
    sessions.record(1, vec![candidate("a")]);
    sessions.clear(1);
    assert_eq!(sessions.resolve_selection(1, 0), Err(SelectionError::NoSession(1)));
  }

  #[test]
  fn requesters_are_isolated() {
    let sessions = SearchSessions::new();
    sessions.record(1, vec![candidate("one")]);
    sessions.record(2, vec![candidate("two")]);
    sessions.clear(1);
    assert!(sessions.get(1).is_none());
    assert_eq!(sessions.get(2).unwrap()[0].id, "two");
  }

  #[test]
  fn clones_share_state() {
    let sessions = SearchSessions::new();
    let other = sessions.clone();
    sessions.record(5, vec![candidate("shared")]);
    assert_eq!(other.resolve_selection(5, 0).unwrap().id, "shared");
  }
}
