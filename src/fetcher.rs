use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::FetchError;
use crate::resolver::FALLBACK_TITLE;
use crate::youtube;

/// A completed download. The caller owns the file at `filepath` and is
/// responsible for deleting it after use — the fetcher never removes files
/// it produced.
#[derive(Debug, Clone)]
pub struct DownloadResult {
  pub filepath: PathBuf,
  pub title: String,
  pub duration_secs: Option<u64>,
  pub thumbnail_url: Option<String>,
}

/// Downloads audio for resolved video ids into a flat download directory.
#[derive(Debug, Clone)]
pub struct Fetcher {
  download_dir: PathBuf,
  cookie_file: PathBuf,
}

impl Fetcher {
  pub fn new(download_dir: PathBuf, cookie_file: PathBuf) -> Self {
    Self { download_dir, cookie_file }
  }

  pub fn download_dir(&self) -> &Path {
    &self.download_dir
  }

  /// Download the best available audio for `video_id` and locate the
  /// produced file.
  ///
  /// The output path is templated as `<download-dir>/<id>.<ext>`, but the
  /// extension yt-dlp actually produces may differ from the preferred codec,
  /// so the real file is found by `locate_audio_file` afterwards. Two fetches
  /// of the same id race on the same path; yt-dlp writes to a `.part` file
  /// and renames, so the loser simply overwrites and both see a whole file.
  pub async fn fetch(&self, video_id: &str) -> Result<DownloadResult, FetchError> {
    std::fs::create_dir_all(&self.download_dir)
      .map_err(|source| FetchError::DownloadDir { dir: self.download_dir.clone(), source })?;

    info!(video_id, "starting audio download");
    let report = youtube::download_audio(video_id, &self.download_dir, &self.cookie_file)
      .await
      .map_err(|e| {
        warn!(video_id, err = %format!("{e:#}"), "provider download failed");
        FetchError::Provider(format!("{e:#}"))
      })?;

    let filepath = locate_audio_file(&self.download_dir, video_id, report.reported_path.as_deref())
      .ok_or_else(|| {
        warn!(video_id, "download reported success but no file was found");
        FetchError::FileMissing(video_id.to_string())
      })?;

    debug!(video_id, path = %filepath.display(), "located downloaded file");
    Ok(DownloadResult {
      filepath,
      title: report.title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
      duration_secs: report.duration_secs,
      thumbnail_url: report.thumbnail_url,
    })
  }
}

/// Find the file a download actually produced. Three strategies, in order,
/// each an explicit fallback for the previous one:
///
/// 1. Probe `<dir>/<id>.<ext>` for each known extension, preferred codec
///    first — the common case when transcoding went as asked.
/// 2. The path yt-dlp reported in its result line, if it exists — covers
///    output templates resolving somewhere unexpected.
/// 3. Scan the directory for any filename starting with the id and bearing a
///    known audio extension — covers double extensions and the like.
///
/// None means the download left nothing discoverable behind.
fn locate_audio_file(dir: &Path, video_id: &str, reported: Option<&Path>) -> Option<PathBuf> {
  let exts = &constants().audio_extensions;

  for ext in exts {
    let path = dir.join(format!("{}.{}", video_id, ext));
    if path.is_file() {
      return Some(path);
    }
  }

  if let Some(path) = reported
    && path.is_file()
  {
    return Some(path.to_path_buf());
  }

  let entries = std::fs::read_dir(dir).ok()?;
  for entry in entries.flatten() {
    let path = entry.path();
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else { continue };
    if name.starts_with(video_id) && exts.iter().any(|known| known == ext) && path.is_file() {
      return Some(path);
    }
  }

  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::tempdir;

  const ID: &str = "dQw4w9WgXcQ";

  fn touch(path: &Path) {
    fs::write(path, b"audio").unwrap();
  }

  #[test]
  fn probe_prefers_m4a_over_alternates() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join(format!("{}.opus", ID)));
    touch(&dir.path().join(format!("{}.m4a", ID)));
    let found = locate_audio_file(dir.path(), ID, None).unwrap();
    assert_eq!(found, dir.path().join(format!("{}.m4a", ID)));
  }

  #[test]
  fn probe_falls_through_extension_order() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join(format!("{}.webm", ID)));
    let found = locate_audio_file(dir.path(), ID, None).unwrap();
    assert_eq!(found, dir.path().join(format!("{}.webm", ID)));
  }

  #[test]
  fn reported_path_used_when_probe_misses() {
    let dir = tempdir().unwrap();
    // A path the template would never produce, but the provider reported it.
    let odd = dir.path().join("elsewhere.aac");
    touch(&odd);
    let found = locate_audio_file(dir.path(), ID, Some(&odd)).unwrap();
    assert_eq!(found, odd);
  }

  #[test]
  fn reported_path_ignored_when_nonexistent() {
    let dir = tempdir().unwrap();
    let ghost = dir.path().join("ghost.m4a");
    assert!(locate_audio_file(dir.path(), ID, Some(&ghost)).is_none());
  }

  #[test]
  fn directory_scan_catches_mangled_names() {
    let dir = tempdir().unwrap();
    // Double extension: the deterministic probe misses it, the scan doesn't.
    touch(&dir.path().join(format!("{}.f140.m4a", ID)));
    let found = locate_audio_file(dir.path(), ID, None).unwrap();
    assert!(found.file_name().unwrap().to_str().unwrap().starts_with(ID));
  }

  #[test]
  fn scan_ignores_other_ids_and_non_audio() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("otherVideo1.m4a"));
    touch(&dir.path().join(format!("{}.json", ID)));
    assert!(locate_audio_file(dir.path(), ID, None).is_none());
  }

  #[test]
  fn located_path_stays_inside_download_dir() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join(format!("{}.m4a", ID)));
    let found = locate_audio_file(dir.path(), ID, None).unwrap();
    assert!(found.starts_with(dir.path()));
    assert!(found.file_name().unwrap().to_str().unwrap().starts_with(ID));
  }

  #[tokio::test]
  async fn fetch_fails_structured_when_provider_missing_or_faulting() {
    // Point yt-dlp at an id that cannot resolve without network access; the
    // call must come back as a structured Provider error (or FileMissing if a
    // stray binary "succeeds" without output), never a panic.
    let dir = tempdir().unwrap();
    let fetcher = Fetcher::new(dir.path().to_path_buf(), dir.path().join("cookie.txt"));
    match fetcher.fetch("!!invalid!!").await {
      Err(FetchError::Provider(_)) | Err(FetchError::FileMissing(_)) => {}
      Ok(r) => panic!("unexpected success: {:?}", r),
      Err(other) => panic!("unexpected error kind: {:?}", other),
    }
  }
}
