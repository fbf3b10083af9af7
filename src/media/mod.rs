//! Media domain: link detection, extraction, captions and the download workflow.
//!
//! Nothing in here depends on Telegram. The chat platform is reached through
//! [`workflow::MediaTransport`], the extraction tool through
//! [`extractor::MediaExtractor`].

/// Metadata caption formatting
pub mod caption;
/// yt-dlp extraction adapter
pub mod extractor;
/// Link detection in free text
pub mod link;
/// Request-scoped download-and-deliver workflow
pub mod workflow;
/// Per-request scratch directories
pub mod workspace;

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub use extractor::{MediaExtractor, YtdlpExtractor};
pub use workflow::{DownloadWorkflow, MediaTransport, RequestState, WorkflowOutcome};
pub use workspace::Workspace;

/// Errors that can occur while serving a single download request
#[derive(Error, Debug)]
pub enum MediaError {
    /// Network or upstream failure reported by the extraction tool
    #[error("Extraction failed: {0}")]
    Extraction(String),
    /// A free-text search produced no results
    #[error("Nothing found for '{0}'")]
    NoResult(String),
    /// The extraction tool reported success but no file was produced
    #[error("Download failed or produced no files")]
    NoOutput,
    /// The chat platform rejected the upload
    #[error("Upload failed: {0}")]
    Upload(String),
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed metadata from the extraction tool
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MediaError {
    /// Short text for the status message shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoOutput => "❌ Download failed or produced no files.".to_string(),
            Self::NoResult(query) => format!(
                "❌ Nothing found for <code>{}</code>.",
                html_escape::encode_text(query)
            ),
            Self::Upload(e) => format!("📤 Upload failed: {}", html_escape::encode_text(e)),
            other => format!("⚠️ Error: {}", html_escape::encode_text(&other.to_string())),
        }
    }
}

/// What the requester wants out of the media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Audio track transcoded to mp3
    Audio,
    /// Best video and audio merged into mp4
    Video,
}

impl MediaKind {
    /// Format selection expression handed to yt-dlp.
    #[must_use]
    pub const fn format_selector(self) -> &'static str {
        match self {
            Self::Audio => "bestaudio/best",
            Self::Video => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4/best",
        }
    }

    /// Human label used in logs and prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// How a request was started. Decides status-message policy and acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Tap on an inline "Download Audio/Video" button
    Button,
    /// `/song` or `/video` command with a search query
    Command,
}

impl Trigger {
    /// Prefix of the scratch directory created for this trigger.
    #[must_use]
    pub const fn workspace_prefix(self) -> &'static str {
        match self {
            Self::Button => "yt_dl_",
            Self::Command => "song_dl_",
        }
    }
}

/// A single download-and-deliver request
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// URL or free-text search query
    pub locator: String,
    /// Audio or video
    pub kind: MediaKind,
    /// HTML label of the requesting user, used in captions
    pub requester: String,
    /// Origin of the request
    pub trigger: Trigger,
}

/// Entry of the `thumbnails` list in yt-dlp metadata
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Thumbnail {
    /// Thumbnail URL
    pub url: Option<String>,
}

/// Entry of `requested_downloads` in yt-dlp metadata
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RequestedDownload {
    /// Final path of the produced file
    pub filepath: Option<PathBuf>,
}

/// Descriptive metadata returned by the extraction tool.
///
/// Every field is optional; yt-dlp omits what the site does not expose.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractionResult {
    /// Media id on the source site
    pub id: Option<String>,
    /// Media title
    pub title: Option<String>,
    /// Uploader name
    pub uploader: Option<String>,
    /// Channel name
    pub channel: Option<String>,
    /// Upload date, usually `YYYYMMDD`
    pub upload_date: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// View count
    pub view_count: Option<u64>,
    /// Like count
    pub like_count: Option<u64>,
    /// Comment count
    pub comment_count: Option<u64>,
    /// Primary thumbnail URL
    pub thumbnail: Option<String>,
    /// All thumbnails, worst to best
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    /// Canonical page URL
    pub webpage_url: Option<String>,
    /// Files produced by a download run
    #[serde(default)]
    pub requested_downloads: Vec<RequestedDownload>,
}

impl ExtractionResult {
    /// Uploader, falling back to the channel name.
    #[must_use]
    pub fn uploader_or_channel(&self) -> Option<&str> {
        let present = |s: &&str| !s.trim().is_empty();
        self.uploader
            .as_deref()
            .filter(present)
            .or_else(|| self.channel.as_deref().filter(present))
    }

    /// Best available thumbnail URL.
    #[must_use]
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnails
            .iter()
            .rev()
            .find_map(|t| t.url.as_deref())
            .or(self.thumbnail.as_deref())
    }
}

/// Result of a successful fetch: metadata plus the produced file
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Metadata of the downloaded media
    pub info: ExtractionResult,
    /// Path of the produced file inside the workspace
    pub file: PathBuf,
    /// Size of the produced file in bytes
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_uploader_falls_back_to_channel() {
        let info = ExtractionResult {
            uploader: Some(String::new()),
            channel: Some("Rick Astley".to_string()),
            ..ExtractionResult::default()
        };
        assert_eq!(info.uploader_or_channel(), Some("Rick Astley"));
        assert!(super::caption::format_caption(&info, "x").contains("Channel: Rick Astley"));

        let info = ExtractionResult {
            uploader: Some("  ".to_string()),
            channel: None,
            ..ExtractionResult::default()
        };
        assert_eq!(info.uploader_or_channel(), None);
    }

    #[test]
    fn test_best_thumbnail_prefers_last_entry() {
        let info: ExtractionResult = serde_json::from_str(
            r#"{
                "thumbnail": "https://i.ytimg.com/default.jpg",
                "thumbnails": [
                    {"url": "https://i.ytimg.com/small.jpg"},
                    {"url": "https://i.ytimg.com/maxres.jpg"}
                ]
            }"#,
        )
        .expect("valid json");
        assert_eq!(
            info.best_thumbnail(),
            Some("https://i.ytimg.com/maxres.jpg")
        );
    }

    #[test]
    fn test_best_thumbnail_falls_back_to_primary() {
        let info = ExtractionResult {
            thumbnail: Some("https://i.ytimg.com/default.jpg".to_string()),
            ..ExtractionResult::default()
        };
        assert_eq!(info.best_thumbnail(), Some("https://i.ytimg.com/default.jpg"));
    }

    #[test]
    fn test_uploader_or_channel() {
        let mut info = ExtractionResult {
            channel: Some("Channel".to_string()),
            ..ExtractionResult::default()
        };
        assert_eq!(info.uploader_or_channel(), Some("Channel"));

        info.uploader = Some("Uploader".to_string());
        assert_eq!(info.uploader_or_channel(), Some("Uploader"));
    }

    #[test]
    fn test_user_message_escapes_html() {
        let err = MediaError::Extraction("<script>".to_string());
        assert_eq!(
            err.user_message(),
            "⚠️ Error: Extraction failed: &lt;script&gt;"
        );
        assert!(MediaError::NoOutput.user_message().contains("no files"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let info: ExtractionResult =
            serde_json::from_str(r#"{"title": "T", "formats": [], "duration": 212.5}"#)
                .expect("valid json");
        assert_eq!(info.title.as_deref(), Some("T"));
        assert_eq!(info.duration, Some(212.5));
    }
}
