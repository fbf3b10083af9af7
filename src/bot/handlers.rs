use super::callback::{CallbackError, CallbackLinks};
use super::preview::LinkPreview;
use super::resilient::send_message_resilient;
use super::transport::TelegramMediaTransport;
use super::views::{developer_keyboard, DefaultMediaView, MediaView};
use crate::config::Settings;
use crate::media::link::{detect_link, normalize_link};
use crate::media::{DownloadRequest, DownloadWorkflow, MediaExtractor, MediaKind, Trigger};
use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ParseMode, ReplyParameters, User},
    utils::command::BotCommands,
};
use tracing::{debug, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage help
    #[command(description = "Show help.")]
    Help,
    /// Search and download audio
    #[command(description = "Search and download a song as mp3.")]
    Song(String),
    /// Search and download video
    #[command(description = "Search and download a video as mp4.")]
    Video(String),
}

impl Command {
    /// Media kind and query of a search command.
    #[must_use]
    pub fn media_request(&self) -> Option<(MediaKind, &str)> {
        match self {
            Self::Song(query) => Some((MediaKind::Audio, query.trim())),
            Self::Video(query) => Some((MediaKind::Video, query.trim())),
            Self::Start | Self::Help => None,
        }
    }
}

/// Parse a command written with either the `/` or the `!` prefix.
///
/// # Examples
///
/// ```
/// use oxide_media_bot::bot::handlers::{parse_command, Command};
/// assert_eq!(
///     parse_command("!song shape of you", "media_bot"),
///     Some(Command::Song("shape of you".to_string()))
/// );
/// assert_eq!(parse_command("hello", "media_bot"), None);
/// ```
#[must_use]
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let text = text.trim_start();
    let normalized = text
        .strip_prefix('!')
        .map_or_else(|| text.to_string(), |rest| format!("/{rest}"));
    Command::parse(&normalized, bot_username).ok()
}

/// HTML mention link for a user id.
#[must_use]
pub fn mention_html(user_id: u64, name: &str) -> String {
    format!(
        r#"<a href="tg://user?id={user_id}">{}</a>"#,
        html_escape::encode_text(name)
    )
}

/// HTML mention of the requesting user, or "Unknown".
#[must_use]
pub fn requester_label(user: Option<&User>) -> String {
    user.map_or_else(
        || "Unknown".to_string(),
        |u| mention_html(u.id.0, &u.full_name()),
    )
}

/// Run a download in the background so the dispatcher keeps serving updates.
fn spawn_download(
    extractor: Arc<dyn MediaExtractor>,
    request: DownloadRequest,
    transport: TelegramMediaTransport,
) {
    tokio::spawn(async move {
        let outcome = DownloadWorkflow::new(extractor)
            .run(&request, &transport)
            .await;
        info!(
            kind = request.kind.label(),
            state = ?outcome.state,
            failed_in = ?outcome.failed_in,
            "Download request finished"
        );
    });
}

/// Handle `/start` and `/help`, and dispatch `/song` / `/video` searches.
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    settings: Arc<Settings>,
    extractor: Arc<dyn MediaExtractor>,
) -> Result<()> {
    let text = match &cmd {
        Command::Start => Some(DefaultMediaView::welcome_message()),
        Command::Help => Some(DefaultMediaView::help_message()),
        Command::Song(_) | Command::Video(_) => None,
    };
    if let Some(text) = text {
        send_message_resilient(&bot, msg.chat.id, Some(msg.id), text).await?;
        return Ok(());
    }

    let Some((kind, query)) = cmd.media_request() else {
        return Ok(());
    };
    if query.is_empty() {
        bot.send_message(msg.chat.id, DefaultMediaView::usage(kind))
            .parse_mode(ParseMode::Html)
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    info!(kind = kind.label(), %query, chat_id = msg.chat.id.0, "Search command received");
    let request = DownloadRequest {
        locator: query.to_string(),
        kind,
        requester: requester_label(msg.from.as_ref()),
        trigger: Trigger::Command,
    };
    let transport = TelegramMediaTransport::new(bot, msg.chat.id, msg.id)
        .with_keyboard(developer_keyboard(&settings.developer_url));
    spawn_download(extractor, request, transport);
    Ok(())
}

/// Detect a video link in a text message and offer the audio/video choice.
///
/// The lookup and the prompt run in a spawned task.
///
/// # Errors
///
/// Never fails; errors of the spawned task are logged.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
    extractor: Arc<dyn MediaExtractor>,
    links: Arc<CallbackLinks>,
) -> Result<()> {
    let Some(link) = msg.text().and_then(detect_link) else {
        return Ok(());
    };
    let link = normalize_link(&link);
    info!(%link, chat_id = msg.chat.id.0, "Link detected");

    let requester = requester_label(msg.from.as_ref());
    let preview = LinkPreview::new(extractor, links, settings.developer_url.clone());
    let transport = TelegramMediaTransport::new(bot, msg.chat.id, msg.id);
    tokio::spawn(async move {
        match preview.run(&link, &requester, &transport).await {
            Ok(state) => debug!(%link, ?state, "Link preview finished"),
            Err(e) => warn!(%link, error = %e, "Link preview failed"),
        }
    });
    Ok(())
}

/// Handle a tap on "Download Audio" / "Download Video".
///
/// # Errors
///
/// Returns an error if an expired button cannot be answered.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    settings: Arc<Settings>,
    extractor: Arc<dyn MediaExtractor>,
    links: Arc<CallbackLinks>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let (kind, link) = match links.resolve(data).await {
        Ok(resolved) => resolved,
        Err(CallbackError::Expired) => {
            bot.answer_callback_query(q.id.clone())
                .text(DefaultMediaView::button_expired())
                .show_alert(true)
                .await?;
            return Ok(());
        }
        Err(CallbackError::Malformed) => {
            debug!(%data, "Ignoring foreign callback data");
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    let Some(message) = q.message.as_ref() else {
        warn!("Callback without an accessible message, ignoring");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    info!(kind = kind.label(), %link, chat_id = chat_id.0, "Download button pressed");
    let request = DownloadRequest {
        locator: link,
        kind,
        requester: requester_label(Some(&q.from)),
        trigger: Trigger::Button,
    };
    let transport = TelegramMediaTransport::new(bot, chat_id, message_id)
        .with_keyboard(developer_keyboard(&settings.developer_url))
        .with_callback(q.clone());
    spawn_download(extractor, request, transport);
    Ok(())
}
