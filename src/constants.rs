//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available —
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Maximum number of candidates a search may return.
  pub search_result_cap: usize,

  // YouTube / yt-dlp
  pub audio_format: String,
  pub preferred_codec: String,
  /// Extension probe order when locating a downloaded file: preferred codec
  /// first, then the fallbacks yt-dlp is known to produce for "bestaudio".
  pub audio_extensions: Vec<String>,
  pub download_dir: String,
  pub cookie_file: String,
  pub listing_format: String,
  pub download_format: String,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
