//! Status message operations with automatic retry.
//!
//! Sends and edits go through [`crate::utils::retry_telegram_operation`],
//! which retries transient failures with exponential backoff and jitter.
//! Uploads deliberately do not use these helpers.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId, ParseMode, ReplyParameters};
use tracing::{debug, warn};

const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_NOT_FOUND: &str = "message to edit not found";

/// Telegram's message text limit, with some headroom
const MAX_STATUS_CHARS: usize = 4000;

/// Whether an edit error means there is simply nothing to do.
#[must_use]
pub fn is_benign_edit_error(error: &str) -> bool {
    error.contains(ERROR_NOT_MODIFIED) || error.contains(ERROR_NOT_FOUND)
}

fn clamp(text: &str) -> String {
    if text.chars().count() > MAX_STATUS_CHARS {
        format!("{}...", crate::utils::truncate_str(text, MAX_STATUS_CHARS))
    } else {
        text.to_string()
    }
}

/// Send an HTML message, optionally as a reply, retrying on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
    text: &str,
) -> Result<Message> {
    let text = clamp(text);
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(id).allow_sending_without_reply());
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit an HTML message, retrying on network failures.
///
/// "Not modified" and "not found" responses count as success.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
) -> Result<()> {
    let text = clamp(text);
    let result = crate::utils::retry_telegram_operation(|| async {
        bot.edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await;

    match result {
        Err(e) if is_benign_edit_error(&e.to_string()) => {
            debug!("Message update skipped: {e}");
            Ok(())
        }
        Err(e) => {
            warn!("Failed to edit message after retries: {e}");
            Err(e)
        }
        Ok(()) => Ok(()),
    }
}
