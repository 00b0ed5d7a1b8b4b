//! Structured failure kinds for the resolution core.
//!
//! Everything the provider or the filesystem can throw at us is caught at the
//! Resolver/Fetcher boundary and converted into one of these; nothing below
//! the core is allowed to terminate the calling flow.

use std::path::PathBuf;

use crate::session::RequesterId;

/// Failures a `fetch` can produce.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  /// The download directory could not be created.
  #[error("cannot create download directory {dir}: {source}")]
  DownloadDir {
    dir: PathBuf,
    source: std::io::Error,
  },

  /// yt-dlp failed before a file could be produced (network, extraction,
  /// unavailable video, missing binary).
  #[error("provider failure: {0}")]
  Provider(String),

  /// yt-dlp reported success but none of the location strategies found a
  /// matching file on disk. Distinct from a provider fault, handled the same
  /// way by callers.
  #[error("no audio file found for '{0}' after download")]
  FileMissing(String),
}

/// An expired or out-of-range selection against the session store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
  #[error("no search session recorded for requester {0}")]
  NoSession(RequesterId),

  #[error("selection {index} out of bounds for {len} stored candidates")]
  OutOfRange { index: usize, len: usize },
}
