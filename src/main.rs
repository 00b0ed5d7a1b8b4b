mod config;
mod constants;
mod error;
mod fetcher;
mod resolver;
mod session;
mod youtube;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::FetchError;
use fetcher::{DownloadResult, Fetcher};
use resolver::Candidate;
use session::{RequesterId, SearchSessions};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Override the download directory.
  #[arg(long)]
  download_dir: Option<PathBuf>,

  /// Run a single search, print the candidates, and exit.
  #[arg(short, long, conflicts_with = "fetch")]
  query: Option<String>,

  /// Fetch audio for a YouTube link or bare 11-character video id, and exit.
  #[arg(short, long)]
  fetch: Option<String>,
}

/// The interactive loop is single-user; the session store is still keyed so
/// a multi-user front end can drop in without changes.
const REQUESTER: RequesterId = 0;

// --- Logging ---

/// Log to a daily-rolled file in the platform data dir, never to the
/// terminal — log lines must not interleave with the prompt. The guard must
/// stay alive for the whole run or buffered lines are lost.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let proj_dirs = directories::ProjectDirs::from("", "", "tunefetch")?;
  let log_dir = proj_dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let file_appender = tracing_appender::rolling::daily(log_dir, "tunefetch.log");
  let (writer, guard) = tracing_appender::non_blocking(file_appender);
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Some(guard)
}

// --- Task dispatch ---
//
// Each core operation runs on its own task, the way a chat front end would
// dispatch blocking work off its responsiveness path. The calls are atomic
// from here: a full result or a structured failure, nothing partial.

async fn dispatch_search(query: String) -> Result<Vec<Candidate>> {
  tokio::spawn(async move { resolver::search(&query).await }).await.context("search task panicked")
}

async fn dispatch_fetch(fetcher: Fetcher, video_id: String) -> Result<Result<DownloadResult, FetchError>> {
  tokio::spawn(async move { fetcher.fetch(&video_id).await }).await.context("fetch task panicked")
}

// --- Formatting ---

fn format_duration(secs: u64) -> String {
  format!("{}:{:02}", secs / 60, secs % 60)
}

/// One numbered result line: `3. Some Title... (3:33)`. Titles are truncated
/// the way a chat button label would be.
fn format_candidate_line(index: usize, candidate: &Candidate) -> String {
  let title = if candidate.title.chars().count() <= 30 {
    candidate.title.clone()
  } else {
    let short: String = candidate.title.chars().take(27).collect();
    format!("{}...", short)
  };
  format!("{}. {} ({})", index + 1, title, format_duration(candidate.duration_secs))
}

fn report_fetch(outcome: Result<DownloadResult, FetchError>) {
  match outcome {
    Ok(result) => {
      println!("Saved '{}' to {}", result.title, result.filepath.display());
      if let Some(duration) = result.duration_secs {
        println!("Duration: {}", format_duration(duration));
      }
      println!("The file is yours now — delete it when you're done.");
    }
    Err(e) => {
      warn!(err = %e, "fetch failed");
      println!("Failed to download the song. Please try another one.");
    }
  }
}

// --- Request handling ---

/// What an input line means to the front end.
#[derive(Debug, PartialEq, Eq)]
enum Request {
  /// A recognized video link: fetch directly, bypassing search.
  Fetch(String),
  /// A result number picked from the last recorded search.
  Select(usize),
  /// Anything else is a free-text search.
  Search(String),
}

/// A link always wins, and a bare number is a selection only while a
/// recorded session exists — otherwise it's an ordinary search term
/// (someone may well search for "1999").
fn route_input(input: &str, has_session: bool) -> Request {
  if let Some(video_id) = youtube::extract_video_id(input) {
    Request::Fetch(video_id)
  } else if has_session && let Ok(number) = input.parse::<usize>() {
    Request::Select(number)
  } else {
    Request::Search(input.to_string())
  }
}

async fn handle_search(sessions: &SearchSessions, query: &str) -> Result<()> {
  println!("Searching for '{}'…", query);
  let candidates = dispatch_search(query.to_string()).await?;
  if candidates.is_empty() {
    println!("No results found. Please try another search term.");
    return Ok(());
  }
  for (i, candidate) in candidates.iter().enumerate() {
    println!("{}", format_candidate_line(i, candidate));
  }
  sessions.record(REQUESTER, candidates);
  println!("Type a result number to download that track.");
  Ok(())
}

async fn handle_selection(fetcher: &Fetcher, sessions: &SearchSessions, number: usize) -> Result<()> {
  // Results are displayed 1-based.
  let resolved = match number.checked_sub(1) {
    Some(index) => sessions.resolve_selection(REQUESTER, index),
    None => Err(error::SelectionError::OutOfRange { index: 0, len: 0 }),
  };
  match resolved {
    Ok(candidate) => {
      println!("Downloading '{}'…", candidate.title);
      let outcome = dispatch_fetch(fetcher.clone(), candidate.id).await?;
      // The selection is consumed either way; a stale list must not be reusable.
      sessions.clear(REQUESTER);
      report_fetch(outcome);
    }
    Err(e) => {
      info!(err = %e, "rejected selection");
      println!("Search results have expired or the number is invalid. Please search again.");
    }
  }
  Ok(())
}

async fn handle_link(fetcher: &Fetcher, video_id: &str) -> Result<()> {
  println!("Processing link…");
  let outcome = dispatch_fetch(fetcher.clone(), video_id.to_string()).await?;
  report_fetch(outcome);
  Ok(())
}

// --- Entry points ---

async fn run_interactive(fetcher: Fetcher) -> Result<()> {
  let sessions = SearchSessions::new();
  println!("Send a song name to search, a YouTube link to fetch directly,");
  println!("a result number to pick from the last search, or 'quit' to exit.");

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    print!("> ");
    std::io::stdout().flush()?;
    let Some(line) = lines.next_line().await? else { break };
    let input = line.trim();
    if input.is_empty() {
      continue;
    }
    if input == "quit" || input == "exit" {
      break;
    }

    match route_input(input, sessions.get(REQUESTER).is_some()) {
      Request::Fetch(video_id) => handle_link(&fetcher, &video_id).await?,
      Request::Select(number) => handle_selection(&fetcher, &sessions, number).await?,
      Request::Search(query) => handle_search(&sessions, &query).await?,
    }
  }
  Ok(())
}

async fn run_search_once(query: &str) -> Result<()> {
  let candidates = dispatch_search(query.to_string()).await?;
  if candidates.is_empty() {
    println!("No results found.");
    return Ok(());
  }
  for (i, candidate) in candidates.iter().enumerate() {
    println!("{}", format_candidate_line(i, candidate));
  }
  Ok(())
}

async fn run_fetch_once(fetcher: &Fetcher, input: &str) -> Result<()> {
  let trimmed = input.trim();
  let video_id = youtube::extract_video_id(trimmed)
    .or_else(|| youtube::is_video_id(trimmed).then(|| trimmed.to_string()))
    .with_context(|| format!("'{}' is not a recognized YouTube link or video id", trimmed))?;
  let outcome = dispatch_fetch(fetcher.clone(), video_id).await?;
  match outcome {
    Ok(result) => {
      println!("{}", result.filepath.display());
      Ok(())
    }
    Err(e) => Err(anyhow::Error::new(e).context("fetch failed")),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging();

  // The chat-transport credential is required before anything else runs.
  let _bot_token = config::bot_token()?;

  let mut config = Config::load();
  if let Some(dir) = args.download_dir {
    // Remember the override so later runs keep using the same directory.
    config.download_dir = Some(dir);
    config.save();
  }
  let fetcher = Fetcher::new(config.download_dir(), config.cookie_file());
  info!(download_dir = %fetcher.download_dir().display(), "starting");

  if let Some(query) = args.query {
    return run_search_once(&query).await;
  }
  if let Some(input) = args.fetch {
    return run_fetch_once(&fetcher, &input).await;
  }
  run_interactive(fetcher).await
}

#[cfg(test)]
mod tests {
  use super::*;

  fn candidate(title: &str, duration_secs: u64) -> Candidate {
    Candidate { id: "dQw4w9WgXcQ".to_string(), title: title.to_string(), duration_secs }
  }

  // --- route_input ---

  #[test]
  fn numeric_input_without_session_is_a_search() {
    assert_eq!(route_input("1999", false), Request::Search("1999".to_string()));
  }

  #[test]
  fn numeric_input_with_session_is_a_selection() {
    assert_eq!(route_input("2", true), Request::Select(2));
    assert_eq!(route_input("1999", true), Request::Select(1999));
  }

  #[test]
  fn links_bypass_search_and_selection() {
    let link = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    assert_eq!(route_input(link, false), Request::Fetch("dQw4w9WgXcQ".to_string()));
    assert_eq!(route_input(link, true), Request::Fetch("dQw4w9WgXcQ".to_string()));
  }

  #[test]
  fn malformed_links_fall_through_to_search() {
    let not_a_link = "https://youtu.be/short";
    assert_eq!(route_input(not_a_link, false), Request::Search(not_a_link.to_string()));
  }

  // --- format_duration ---

  #[test]
  fn duration_formats_minutes_and_seconds() {
    assert_eq!(format_duration(0), "0:00");
    assert_eq!(format_duration(59), "0:59");
    assert_eq!(format_duration(213), "3:33");
    assert_eq!(format_duration(3600), "60:00");
  }

  // --- format_candidate_line ---

  #[test]
  fn candidate_line_is_one_based() {
    assert_eq!(format_candidate_line(0, &candidate("Song", 61)), "1. Song (1:01)");
    assert_eq!(format_candidate_line(4, &candidate("Song", 61)), "5. Song (1:01)");
  }

  #[test]
  fn candidate_line_truncates_long_titles() {
    let long = "a".repeat(40);
    let line = format_candidate_line(0, &candidate(&long, 0));
    assert_eq!(line, format!("1. {}... (0:00)", "a".repeat(27)));
  }

  #[test]
  fn candidate_line_keeps_thirty_char_titles() {
    let exact = "b".repeat(30);
    let line = format_candidate_line(0, &candidate(&exact, 0));
    assert!(line.contains(&exact));
    assert!(!line.contains("..."));
  }
}
