use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::constants;

/// User preferences, stored as `prefs.toml` under the platform config dir.
/// Everything is optional; unset fields fall back to the built-in constants.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct Config {
  pub download_dir: Option<PathBuf>,
  pub cookie_file: Option<PathBuf>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "tunefetch") {
      return Self::load_from(&proj_dirs.config_dir().join("prefs.toml"));
    }
    Self::default()
  }

  fn load_from(path: &Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "tunefetch") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        self.save_to(&config_dir.join("prefs.toml"));
      }
    }
  }

  fn save_to(&self, path: &Path) {
    if let Ok(content) = toml::to_string(self) {
      let _ = std::fs::write(path, content);
    }
  }

  /// Where downloaded audio lands. A flat directory; files are named
  /// `<video-id>.<extension>`, no manifest.
  pub fn download_dir(&self) -> PathBuf {
    self.download_dir.clone().unwrap_or_else(|| PathBuf::from(&constants().download_dir))
  }

  /// The yt-dlp cookie file, passed through when it exists on disk.
  pub fn cookie_file(&self) -> PathBuf {
    self.cookie_file.clone().unwrap_or_else(|| PathBuf::from(&constants().cookie_file))
  }
}

/// The chat-transport credential. Required at startup — the process refuses
/// to run without it, even though the resolution core itself never reads it.
pub fn bot_token() -> Result<String> {
  std::env::var("BOT_TOKEN").context("BOT_TOKEN environment variable not set")
}
