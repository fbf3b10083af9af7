//! Caption formatting for delivered media and choice prompts.
//!
//! Output is Telegram HTML. Every line except the title is optional and only
//! rendered when the metadata carries the field.

use super::ExtractionResult;
use crate::utils::{humanize_duration, truncate_str};
use chrono::NaiveDate;
use std::fmt::Write;

/// Placeholder used when the metadata has no title
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Titles longer than this are cut to keep the caption under Telegram's limit
const MAX_TITLE_CHARS: usize = 200;

fn title_line(info: &ExtractionResult) -> String {
    let title = info
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(UNKNOWN_TITLE);
    format!(
        "<b>{}</b>",
        html_escape::encode_text(&truncate_str(title, MAX_TITLE_CHARS))
    )
}

/// Reformats a compact `YYYYMMDD` date as `YYYY/MM/DD`; other input is returned unchanged.
///
/// # Examples
///
/// ```
/// use oxide_media_bot::media::caption::format_upload_date;
/// assert_eq!(format_upload_date("20091025"), "2009/10/25");
/// assert_eq!(format_upload_date("last week"), "last week");
/// ```
#[must_use]
pub fn format_upload_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_or_else(|_| raw.to_string(), |d| d.format("%Y/%m/%d").to_string())
}

/// Full caption attached to the uploaded file.
///
/// `requester` is inserted as-is (it is already HTML, usually a mention link).
#[must_use]
pub fn format_caption(info: &ExtractionResult, requester: &str) -> String {
    let mut text = title_line(info);
    text.push('\n');

    if let Some(channel) = info.uploader_or_channel() {
        let _ = writeln!(text, "Channel: {}", html_escape::encode_text(channel));
    }
    if let Some(date) = info.upload_date.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(
            text,
            "Uploaded: {}",
            html_escape::encode_text(&format_upload_date(date))
        );
    }
    if let Some(duration) = info.duration.filter(|d| *d > 0.0) {
        let _ = writeln!(
            text,
            "Duration: {} ({}s)",
            humanize_duration(duration),
            duration.round()
        );
    }
    if let Some(views) = info.view_count {
        let _ = writeln!(text, "Views: {views}");
    }
    if let Some(likes) = info.like_count {
        let _ = writeln!(text, "Likes: {likes}");
    }
    if let Some(comments) = info.comment_count {
        let _ = writeln!(text, "Comments: {comments}");
    }

    let _ = write!(text, "\nRequested by: {requester}");
    text
}

/// Short caption for the audio/video choice prompt.
#[must_use]
pub fn format_preview(info: &ExtractionResult, requester: &str) -> String {
    let mut text = title_line(info);
    text.push('\n');
    if let Some(channel) = info.uploader_or_channel() {
        let _ = writeln!(text, "Channel: {}", html_escape::encode_text(channel));
    }
    let _ = write!(text, "Requested by: {requester}");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_info() -> ExtractionResult {
        ExtractionResult {
            title: Some("Never Gonna Give You Up".to_string()),
            uploader: Some("Rick Astley".to_string()),
            upload_date: Some("20091025".to_string()),
            duration: Some(212.0),
            view_count: Some(1_500_000_000),
            like_count: Some(17_000_000),
            comment_count: Some(2_300_000),
            ..ExtractionResult::default()
        }
    }

    #[test]
    fn test_full_caption() {
        let caption = format_caption(&full_info(), "@alice");
        assert_eq!(
            caption,
            "<b>Never Gonna Give You Up</b>\n\
             Channel: Rick Astley\n\
             Uploaded: 2009/10/25\n\
             Duration: 3 minutes (212s)\n\
             Views: 1500000000\n\
             Likes: 17000000\n\
             Comments: 2300000\n\
             \n\
             Requested by: @alice"
        );
    }

    #[test]
    fn test_empty_metadata_only_has_title_and_requester() {
        let caption = format_caption(&ExtractionResult::default(), "Unknown");
        assert_eq!(caption, "<b>Unknown title</b>\n\nRequested by: Unknown");
        for label in ["Channel:", "Uploaded:", "Duration:", "Views:", "Likes:", "Comments:"] {
            assert!(!caption.contains(label), "unexpected {label}");
        }
    }

    #[test]
    fn test_each_missing_field_drops_its_line() {
        let mut info = full_info();
        info.like_count = None;
        info.upload_date = None;
        let caption = format_caption(&info, "x");
        assert!(!caption.contains("Likes:"));
        assert!(!caption.contains("Uploaded:"));
        assert!(caption.contains("Views: 1500000000"));
        assert!(caption.contains("Comments: 2300000"));
    }

    #[test]
    fn test_zero_counts_are_still_shown() {
        let info = ExtractionResult {
            view_count: Some(0),
            ..ExtractionResult::default()
        };
        assert!(format_caption(&info, "x").contains("Views: 0"));
    }

    #[test]
    fn test_zero_duration_is_skipped() {
        let info = ExtractionResult {
            duration: Some(0.0),
            ..ExtractionResult::default()
        };
        assert!(!format_caption(&info, "x").contains("Duration:"));
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        let info = ExtractionResult {
            upload_date: Some("2009-10-25".to_string()),
            ..ExtractionResult::default()
        };
        assert!(format_caption(&info, "x").contains("Uploaded: 2009-10-25"));
        assert_eq!(format_upload_date("20091345"), "20091345");
    }

    #[test]
    fn test_title_and_channel_are_escaped() {
        let info = ExtractionResult {
            title: Some("<b>Loud</b> & clear".to_string()),
            channel: Some("A<B".to_string()),
            ..ExtractionResult::default()
        };
        let caption = format_caption(&info, "x");
        assert!(caption.starts_with("<b>&lt;b&gt;Loud&lt;/b&gt; &amp; clear</b>\n"));
        assert!(caption.contains("Channel: A&lt;B"));
    }

    #[test]
    fn test_long_title_is_truncated() {
        let info = ExtractionResult {
            title: Some("x".repeat(1000)),
            ..ExtractionResult::default()
        };
        let caption = format_caption(&info, "x");
        assert!(caption.chars().count() < 300);
    }

    #[test]
    fn test_preview() {
        let preview = format_preview(&full_info(), "@bob");
        assert_eq!(
            preview,
            "<b>Never Gonna Give You Up</b>\nChannel: Rick Astley\nRequested by: @bob"
        );
    }
}
