use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::constants::constants;

/// A raw entry parsed from a yt-dlp listing line. Fields other than the
/// position in the line are optional: yt-dlp prints `NA` for anything it
/// could not extract.
#[derive(Debug, Clone)]
pub struct RawEntry {
  pub id: Option<String>,
  pub title: Option<String>,
  pub duration_secs: Option<u64>,
}

/// Metadata yt-dlp reports alongside a completed download.
#[derive(Debug, Clone)]
pub struct DownloadReport {
  pub title: Option<String>,
  pub duration_secs: Option<u64>,
  pub thumbnail_url: Option<String>,
  /// The final output path as yt-dlp itself reported it (`after_move`
  /// context), if any. The produced extension may differ from the preferred
  /// codec, so callers must verify this against the disk.
  pub reported_path: Option<PathBuf>,
}

/// Treat empty and `NA` fields as absent, the way yt-dlp prints them.
fn opt_field(s: Option<&str>) -> Option<String> {
  s.map(str::trim).filter(|s| !s.is_empty() && *s != "NA").map(|s| s.to_string())
}

/// yt-dlp prints durations as integer seconds, but some extractors emit a
/// float. Either way we only care about whole seconds.
fn parse_duration_secs(s: Option<&str>) -> Option<u64> {
  opt_field(s)?.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0).map(|d| d as u64)
}

/// Parse a single tab-separated yt-dlp listing line into a RawEntry.
/// Expected format: `id\ttitle\tduration`
fn parse_listing_line(line: &str) -> Option<RawEntry> {
  let parts: Vec<&str> = line.split('\t').collect();
  if parts.len() < 2 {
    return None;
  }
  Some(RawEntry {
    id: opt_field(parts.first().copied()),
    title: opt_field(parts.get(1).copied()),
    duration_secs: parse_duration_secs(parts.get(2).copied()),
  })
}

/// Parse yt-dlp stdout lines into a RawEntry vec, preserving output order.
fn parse_listing_output(stdout: &str) -> Vec<RawEntry> {
  stdout.lines().map(str::trim).filter(|l| !l.is_empty()).filter_map(parse_listing_line).collect()
}

fn ytdlp_spawn_error(e: std::io::Error, what: &str) -> anyhow::Error {
  if e.kind() == std::io::ErrorKind::NotFound {
    anyhow!("yt-dlp not found. Install it with: brew install yt-dlp (macOS) or pip install yt-dlp")
  } else {
    anyhow!(e).context(format!("Failed to execute yt-dlp {}", what))
  }
}

/// Run a provider search, metadata only, capped at `search_result_cap`
/// entries. No download happens here.
pub async fn search_tracks(query: &str) -> Result<Vec<RawEntry>> {
  let c = constants();
  let default_search = format!("ytsearch{}:", c.search_result_cap);
  let output = Command::new("yt-dlp")
    .args([
      "--print",
      &c.listing_format,
      "--default-search",
      &default_search,
      "--flat-playlist",
      "--skip-download",
      "--ignore-errors",
      "--no-warnings",
      "--",
      query,
    ])
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .output()
    .await
    .map_err(|e| ytdlp_spawn_error(e, "search command"))?;

  if !output.status.success() {
    return Err(anyhow!("yt-dlp search failed: {}", String::from_utf8_lossy(&output.stderr)));
  }

  let stdout_str = String::from_utf8(output.stdout).context("yt-dlp output non-UTF8")?;
  Ok(parse_listing_output(&stdout_str))
}

/// Download the best available audio stream for `video_id` into
/// `download_dir`, transcoding towards the preferred codec. yt-dlp may fall
/// back to another container, so the report's path is a hint, not a promise.
pub async fn download_audio(video_id: &str, download_dir: &Path, cookie_file: &Path) -> Result<DownloadReport> {
  let c = constants();
  let url = format!("https://www.youtube.com/watch?v={}", video_id);
  let out_template = download_dir.join("%(id)s.%(ext)s");
  let out_template = out_template.to_str().context("Download dir path is not valid UTF-8")?;

  let mut cmd = Command::new("yt-dlp");
  cmd.args([
    "-f",
    &c.audio_format,
    "--extract-audio",
    "--audio-format",
    &c.preferred_codec,
    "-o",
    out_template,
    "--no-playlist",
    "--no-warnings",
    "--no-simulate",
    "--print",
    &c.download_format,
  ]);
  // yt-dlp errors out on a --cookies path that doesn't exist, so only pass
  // the file when it's actually there.
  if cookie_file.exists() {
    cmd.arg("--cookies").arg(cookie_file);
  }
  cmd.args(["--", &url]);

  let output = cmd
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .output()
    .await
    .map_err(|e| ytdlp_spawn_error(e, "download command"))?;

  if !output.status.success() {
    return Err(anyhow!("yt-dlp download failed: {}", String::from_utf8_lossy(&output.stderr)));
  }

  let stdout_str = String::from_utf8(output.stdout).context("yt-dlp output non-UTF8")?;
  Ok(parse_download_report(&stdout_str))
}

/// Parse the single `after_move` print line a download emits.
/// Expected format: `title\tduration\tthumbnail\tfilepath`
fn parse_download_report(stdout: &str) -> DownloadReport {
  let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
  let parts: Vec<&str> = line.split('\t').collect();
  DownloadReport {
    title: opt_field(parts.first().copied()),
    duration_secs: parse_duration_secs(parts.get(1).copied()),
    thumbnail_url: opt_field(parts.get(2).copied()),
    reported_path: opt_field(parts.get(3).copied()).map(PathBuf::from),
  }
}

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

/// Whether `s` has the shape of a bare YouTube video id.
pub fn is_video_id(s: &str) -> bool {
  s.len() == VIDEO_ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Detect whether user input is a YouTube watch link and extract the
/// 11-character video id. Returns None for anything that doesn't match a
/// recognized link shape — those inputs are routed to search as plain text.
pub fn extract_video_id(input: &str) -> Option<String> {
  let trimmed = input.trim();
  if trimmed.contains(char::is_whitespace) {
    return None;
  }

  // Strip scheme and leading www.
  let rest = trimmed.strip_prefix("https://").or_else(|| trimmed.strip_prefix("http://")).unwrap_or(trimmed);
  let rest = rest.strip_prefix("www.").unwrap_or(rest);

  // Short links: youtu.be/<id>
  if let Some(path) = rest.strip_prefix("youtu.be/") {
    let id = path.split(['?', '&', '#']).next().unwrap_or("");
    return is_video_id(id).then(|| id.to_string());
  }

  let path = rest.strip_prefix("youtube.com/").or_else(|| rest.strip_prefix("m.youtube.com/"))?;

  // watch?v=<id> (possibly with extra query parameters, in any position)
  if let Some(query) = path.strip_prefix("watch?") {
    return query
      .split('&')
      .find_map(|pair| pair.strip_prefix("v="))
      .filter(|id| is_video_id(id))
      .map(|id| id.to_string());
  }

  // embed/<id>, shorts/<id>, v/<id>
  for prefix in ["embed/", "shorts/", "v/"] {
    if let Some(tail) = path.strip_prefix(prefix) {
      let id = tail.split(['?', '&', '#']).next().unwrap_or("");
      return is_video_id(id).then(|| id.to_string());
    }
  }

  None
}
