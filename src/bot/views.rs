//! User-facing texts and keyboards.

use super::callback::CallbackLinks;
use crate::media::MediaKind;
use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Label of the developer contact button
pub const DEVELOPER_BUTTON: &str = "Developer @DEWENI2";

/// Trait for media bot view rendering
pub trait MediaView {
    /// Reply to `/start`
    fn welcome_message() -> &'static str;

    /// Reply to `/help`
    fn help_message() -> &'static str;

    /// Status posted as soon as a link is spotted
    fn link_found() -> &'static str;

    /// Usage hint for a search command sent without a query
    fn usage(kind: MediaKind) -> &'static str;

    /// Status text when probing a detected link fails
    fn probe_failed(error: &str) -> String;

    /// Alert shown for a button whose link is gone
    fn button_expired() -> &'static str;
}

/// Default English implementation of `MediaView`
pub struct DefaultMediaView;

impl MediaView for DefaultMediaView {
    fn welcome_message() -> &'static str {
        "👋 <b>Hi!</b>\n\n\
         Send me a YouTube link and pick audio or video.\n\
         Or search directly:\n\
         • <code>/song shape of you</code>\n\
         • <code>/video never gonna give you up</code>"
    }

    fn help_message() -> &'static str {
        "<b>Commands</b>\n\
         /song &lt;query&gt; — download audio (mp3)\n\
         /video &lt;query&gt; — download video (mp4)\n\n\
         <code>!song</code> and <code>!video</code> work too.\n\
         Any message with a YouTube link gets Download Audio / Download Video buttons."
    }

    fn link_found() -> &'static str {
        "🔎 Found YouTube link — fetching info..."
    }

    fn usage(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Audio => {
                "❌ Please provide a song name.\nUsage: <code>/song shape of you</code>"
            }
            MediaKind::Video => {
                "❌ Please provide a video name.\nUsage: <code>/video &lt;name&gt;</code>"
            }
        }
    }

    fn probe_failed(error: &str) -> String {
        format!(
            "⚠️ Failed to fetch info: {}",
            html_escape::encode_text(error)
        )
    }

    fn button_expired() -> &'static str {
        "This button has expired, please send the link again."
    }
}

fn developer_row(developer_url: &str) -> Option<Vec<InlineKeyboardButton>> {
    Url::parse(developer_url)
        .ok()
        .map(|url| vec![InlineKeyboardButton::url(DEVELOPER_BUTTON, url)])
}

/// Keyboard with only the developer contact button.
///
/// `None` when the configured URL does not parse.
#[must_use]
pub fn developer_keyboard(developer_url: &str) -> Option<InlineKeyboardMarkup> {
    developer_row(developer_url).map(|row| InlineKeyboardMarkup::new(vec![row]))
}

/// Audio/video choice keyboard for a detected link.
pub async fn action_keyboard(
    links: &CallbackLinks,
    link: &str,
    developer_url: &str,
) -> InlineKeyboardMarkup {
    let audio = links.encode(MediaKind::Audio, link).await;
    let video = links.encode(MediaKind::Video, link).await;

    let mut rows = vec![vec![
        InlineKeyboardButton::callback("📥 Download Audio", audio),
        InlineKeyboardButton::callback("🎬 Download Video", video),
    ]];
    rows.extend(developer_row(developer_url));
    InlineKeyboardMarkup::new(rows)
}
