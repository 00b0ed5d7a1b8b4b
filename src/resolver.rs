use tracing::{debug, warn};

use crate::constants::constants;
use crate::youtube::{self, RawEntry};

/// Title used when the provider did not report one.
pub const FALLBACK_TITLE: &str = "No Title";

/// A single track candidate from a search. Transient: lives in the session
/// store only until consumed or replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
  pub id: String,
  pub title: String,
  pub duration_secs: u64,
}

/// Resolve free text to up to `search_result_cap` candidates, in the
/// provider's ranking order.
///
/// An empty vec is a normal "no matches" outcome. Provider faults are logged
/// and also come back as an empty vec — a search never fails loudly.
pub async fn search(query: &str) -> Vec<Candidate> {
  match youtube::search_tracks(query).await {
    Ok(entries) => {
      let candidates = refine(entries);
      debug!(query, count = candidates.len(), "search resolved");
      candidates
    }
    Err(e) => {
      warn!(query, err = %format!("{e:#}"), "provider search failed, returning no results");
      Vec::new()
    }
  }
}

/// Turn raw provider entries into candidates: drop entries without an id,
/// default missing titles and durations, truncate to the cap. Provider order
/// is preserved.
fn refine(entries: Vec<RawEntry>) -> Vec<Candidate> {
  entries
    .into_iter()
    .filter_map(|entry| {
      let id = entry.id?;
      Some(Candidate {
        id,
        title: entry.title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        duration_secs: entry.duration_secs.unwrap_or(0),
      })
    })
    .take(constants().search_result_cap)
    .collect()
}
