//! Telegram implementation of [`MediaTransport`] and [`PreviewTransport`].

use super::preview::PreviewTransport;
use super::resilient::{edit_message_resilient, send_message_resilient};
use crate::media::workflow::StatusId;
use crate::media::MediaTransport;
use anyhow::Result;
use reqwest::Url;
use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode, ReplyParameters,
};
use tracing::debug;

/// Transport bound to one chat and the message that triggered the request
#[derive(Clone)]
pub struct TelegramMediaTransport {
    bot: Bot,
    chat_id: ChatId,
    reply_to: MessageId,
    keyboard: Option<InlineKeyboardMarkup>,
    callback: Option<CallbackQuery>,
}

impl TelegramMediaTransport {
    /// Create a transport replying to `reply_to` in `chat_id`.
    #[must_use]
    pub fn new(bot: Bot, chat_id: ChatId, reply_to: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            reply_to,
            keyboard: None,
            callback: None,
        }
    }

    /// Attach a keyboard to every uploaded file.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Option<InlineKeyboardMarkup>) -> Self {
        self.keyboard = keyboard;
        self
    }

    /// Answer this callback query when the request starts.
    #[must_use]
    pub fn with_callback(mut self, query: CallbackQuery) -> Self {
        self.callback = Some(query);
        self
    }

    fn reply_parameters(&self) -> ReplyParameters {
        ReplyParameters::new(self.reply_to).allow_sending_without_reply()
    }
}

#[async_trait]
impl MediaTransport for TelegramMediaTransport {
    async fn post_status(&self, text: &str) -> Result<StatusId> {
        let msg = send_message_resilient(&self.bot, self.chat_id, Some(self.reply_to), text).await?;
        Ok(StatusId(msg.id.0))
    }

    async fn edit_status(&self, id: StatusId, text: &str) -> Result<()> {
        edit_message_resilient(&self.bot, self.chat_id, MessageId(id.0), text).await
    }

    async fn delete_status(&self, id: StatusId) -> Result<()> {
        self.bot.delete_message(self.chat_id, MessageId(id.0)).await?;
        Ok(())
    }

    async fn send_audio(&self, file: &Path, caption: &str) -> Result<()> {
        let mut req = self
            .bot
            .send_audio(self.chat_id, InputFile::file(file))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_parameters(self.reply_parameters());
        if let Some(keyboard) = self.keyboard.clone() {
            req = req.reply_markup(keyboard);
        }
        req.await?;
        debug!(file = %file.display(), "Audio uploaded");
        Ok(())
    }

    async fn send_video(&self, file: &Path, caption: &str) -> Result<()> {
        let mut req = self
            .bot
            .send_video(self.chat_id, InputFile::file(file))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .supports_streaming(true)
            .reply_parameters(self.reply_parameters());
        if let Some(keyboard) = self.keyboard.clone() {
            req = req.reply_markup(keyboard);
        }
        req.await?;
        debug!(file = %file.display(), "Video uploaded");
        Ok(())
    }

    async fn send_document(&self, file: &Path, caption: &str) -> Result<()> {
        let mut req = self
            .bot
            .send_document(self.chat_id, InputFile::file(file))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_parameters(self.reply_parameters());
        if let Some(keyboard) = self.keyboard.clone() {
            req = req.reply_markup(keyboard);
        }
        req.await?;
        debug!(file = %file.display(), "Document uploaded");
        Ok(())
    }

    async fn acknowledge(&self) -> Result<()> {
        if let Some(query) = &self.callback {
            self.bot.answer_callback_query(query.id.clone()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PreviewTransport for TelegramMediaTransport {
    async fn post_status(&self, text: &str) -> Result<StatusId> {
        let msg = send_message_resilient(&self.bot, self.chat_id, Some(self.reply_to), text).await?;
        Ok(StatusId(msg.id.0))
    }

    async fn edit_status(&self, id: StatusId, text: &str) -> Result<()> {
        edit_message_resilient(&self.bot, self.chat_id, MessageId(id.0), text).await
    }

    async fn delete_status(&self, id: StatusId) -> Result<()> {
        self.bot.delete_message(self.chat_id, MessageId(id.0)).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        url: Url,
        caption: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        self.bot
            .send_photo(self.chat_id, InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_parameters(self.reply_parameters())
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }

    async fn send_text(&self, caption: &str, keyboard: InlineKeyboardMarkup) -> Result<()> {
        self.bot
            .send_message(self.chat_id, caption)
            .parse_mode(ParseMode::Html)
            .reply_parameters(self.reply_parameters())
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }
}
