//! yt-dlp extraction adapter.
//!
//! Runs the `yt-dlp` executable as an async child process, so probing and
//! downloading never block a runtime worker. Format selection and
//! transcoding are left entirely to yt-dlp (and the ffmpeg it drives); this
//! module only supplies the options and reads back the JSON metadata.

use super::link::is_url;
use super::{ExtractionResult, FetchedMedia, MediaError, MediaKind};
use crate::config::Settings;
use crate::utils::truncate_str;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Patterns indicating fatal, unrecoverable yt-dlp errors
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "This video is private",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "copyright",
    "terminated account",
    "This video has been removed",
    "Unsupported URL",
    "is not a valid URL",
    "Unable to extract video data",
    "Premieres in",
    "This live event will begin",
    "Join this channel to get access",
    "HTTP Error 403",
    "HTTP Error 404",
    "Sign in to view this video",
];

/// Patterns indicating transient errors that might succeed on a later attempt
const RETRYABLE_ERROR_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection timed out",
    "Unable to download webpage",
    "HTTP Error 429",
    "HTTP Error 503",
    "Read timed out",
    "network is unreachable",
    "Temporary failure in name resolution",
];

/// Output file name template, relative to the workspace
const OUTPUT_TEMPLATE: &str = "%(title).100s.%(ext)s";

/// Search prefix used when the locator is not a URL
const DEFAULT_SEARCH: &str = "ytsearch1";

/// Maximum length of an error message surfaced to the user
const MAX_ERROR_LENGTH: usize = 300;

/// Extensions of intermediate files yt-dlp may leave behind
const PARTIAL_EXTENSIONS: &[&str] = &["part", "ytdl", "temp"];

/// Broad category of a yt-dlp failure.
///
/// Only reported as a log field. No retry decision depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The media cannot be fetched no matter how often we try
    Fatal,
    /// Network hiccup or throttling
    Retryable,
    /// Anything else (format not available, ffmpeg failure, ...)
    Other,
}

/// Classify yt-dlp stderr output for the failure log line.
#[must_use]
pub fn classify_failure(stderr: &str) -> FailureClass {
    if FATAL_ERROR_PATTERNS.iter().any(|p| stderr.contains(p)) {
        FailureClass::Fatal
    } else if RETRYABLE_ERROR_PATTERNS.iter().any(|p| stderr.contains(p)) {
        FailureClass::Retryable
    } else {
        FailureClass::Other
    }
}

/// Pick the most useful line of yt-dlp stderr for the user.
///
/// Prefers the last `ERROR:` line, falls back to the last non-empty line.
#[must_use]
pub fn summarize_error(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let line = lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())?;

    let message = line.trim_start_matches("ERROR:").trim();
    Some(truncate_str(message, MAX_ERROR_LENGTH))
}

/// Interface to the media extraction tool
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Fetch metadata only.
    async fn probe(&self, locator: &str) -> Result<ExtractionResult, MediaError>;

    /// Download one media file of the given kind into `destination`.
    ///
    /// Returns the metadata together with the path of the produced file.
    async fn fetch(
        &self,
        locator: &str,
        kind: MediaKind,
        destination: &Path,
    ) -> Result<FetchedMedia, MediaError>;
}

/// [`MediaExtractor`] backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtdlpExtractor {
    binary: PathBuf,
    cookies_file: Option<PathBuf>,
}

impl YtdlpExtractor {
    /// Create an extractor for the given yt-dlp binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cookies_file: None,
        }
    }

    /// Pass `--cookies <file>` whenever that file exists at call time.
    #[must_use]
    pub fn with_cookies_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies_file = Some(path.into());
        self
    }

    /// Build an extractor from application settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.ytdlp_path).with_cookies_file(&settings.cookies_file)
    }

    fn cookies(&self) -> Option<&Path> {
        self.cookies_file.as_deref().filter(|p| p.is_file())
    }

    /// Arguments shared by probe and fetch, without the locator.
    fn base_args(&self, locator: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
        ];
        if !is_url(locator) {
            args.push("--default-search".to_string());
            args.push(DEFAULT_SEARCH.to_string());
        }
        if let Some(cookies) = self.cookies() {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }
        args
    }

    /// Full argument list for a metadata-only probe.
    #[must_use]
    pub fn probe_args(&self, locator: &str) -> Vec<String> {
        let mut args = self.base_args(locator);
        args.push("--skip-download".to_string());
        args.push("--".to_string());
        args.push(locator.to_string());
        args
    }

    /// Full argument list for a download into `destination`.
    #[must_use]
    pub fn fetch_args(&self, locator: &str, kind: MediaKind, destination: &Path) -> Vec<String> {
        let mut args = self.base_args(locator);
        args.extend([
            "--no-simulate".to_string(),
            "-f".to_string(),
            kind.format_selector().to_string(),
            "-o".to_string(),
            destination.join(OUTPUT_TEMPLATE).display().to_string(),
        ]);
        match kind {
            MediaKind::Audio => args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
                "--audio-quality".to_string(),
                "192K".to_string(),
            ]),
            MediaKind::Video => args.extend([
                "--merge-output-format".to_string(),
                "mp4".to_string(),
            ]),
        }
        args.push("--".to_string());
        args.push(locator.to_string());
        args
    }

    /// Run yt-dlp and parse the JSON it prints.
    async fn run(&self, args: Vec<String>, locator: &str) -> Result<ExtractionResult, MediaError> {
        debug!(binary = %self.binary.display(), ?args, "Executing yt-dlp");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                MediaError::Extraction(format!(
                    "failed to start {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let class = classify_failure(&stderr);
            let message = summarize_error(&stderr)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            warn!(?class, locator = %locator, error = %message, "yt-dlp failed");
            return Err(MediaError::Extraction(message));
        }

        parse_info(&String::from_utf8_lossy(&output.stdout), locator)
    }
}

/// Parse the `--dump-single-json` output, unwrapping single-entry search playlists.
///
/// # Errors
///
/// `MediaError::NoResult` for an empty search, `MediaError::Json` for malformed output.
pub fn parse_info(stdout: &str, locator: &str) -> Result<ExtractionResult, MediaError> {
    let Some(json_line) = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
    else {
        return Err(MediaError::NoResult(locator.to_string()));
    };

    let mut value: Value = serde_json::from_str(json_line)?;

    if value.get("_type").and_then(Value::as_str) == Some("playlist") {
        let first = value
            .get_mut("entries")
            .and_then(Value::as_array_mut)
            .and_then(|entries| entries.drain(..).find(|e| !e.is_null()));
        match first {
            Some(entry) => value = entry,
            None => return Err(MediaError::NoResult(locator.to_string())),
        }
    }

    Ok(serde_json::from_value(value)?)
}

fn is_partial(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PARTIAL_EXTENSIONS.contains(&e))
}

/// Locate the file produced by a download.
///
/// Uses the path yt-dlp reported when it exists inside `destination`,
/// otherwise the first complete file found by walking `destination`.
///
/// # Errors
///
/// `MediaError::NoOutput` when no file was produced.
pub fn locate_output(info: &ExtractionResult, destination: &Path) -> Result<PathBuf, MediaError> {
    let reported = info
        .requested_downloads
        .iter()
        .filter_map(|d| d.filepath.as_deref())
        .find(|p| p.starts_with(destination) && p.is_file());
    if let Some(path) = reported {
        return Ok(path.to_path_buf());
    }

    WalkDir::new(destination)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && !is_partial(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .ok_or(MediaError::NoOutput)
}

#[async_trait]
impl MediaExtractor for YtdlpExtractor {
    async fn probe(&self, locator: &str) -> Result<ExtractionResult, MediaError> {
        let info = self.run(self.probe_args(locator), locator).await?;
        debug!(title = ?info.title, "Probe complete");
        Ok(info)
    }

    async fn fetch(
        &self,
        locator: &str,
        kind: MediaKind,
        destination: &Path,
    ) -> Result<FetchedMedia, MediaError> {
        let info = self
            .run(self.fetch_args(locator, kind, destination), locator)
            .await?;
        let file = locate_output(&info, destination)?;
        let size = tokio::fs::metadata(&file).await?.len();
        info!(
            kind = kind.label(),
            file = %file.display(),
            size,
            "Download complete"
        );
        Ok(FetchedMedia { info, file, size })
    }
}
