//! Link preview: look up metadata and offer the audio/video choice.

use super::callback::CallbackLinks;
use super::views::{action_keyboard, DefaultMediaView, MediaView};
use crate::media::caption::format_preview;
use crate::media::workflow::StatusId;
use crate::media::{MediaExtractor, RequestState};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use teloxide::types::InlineKeyboardMarkup;
use tracing::{debug, info, warn};

/// Chat operations needed to preview a link.
///
/// Bound to one chat and the message containing the link.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreviewTransport: Send + Sync {
    /// Post the "link found" status replying to the message.
    async fn post_status(&self, text: &str) -> Result<StatusId>;

    /// Replace the text of the status message.
    async fn edit_status(&self, id: StatusId, text: &str) -> Result<()>;

    /// Delete the status message.
    async fn delete_status(&self, id: StatusId) -> Result<()>;

    /// Reply with a thumbnail photo, caption and keyboard.
    async fn send_photo(&self, url: Url, caption: &str, keyboard: InlineKeyboardMarkup)
        -> Result<()>;

    /// Reply with a text caption and keyboard.
    async fn send_text(&self, caption: &str, keyboard: InlineKeyboardMarkup) -> Result<()>;
}

/// Preview flow for a detected link
pub struct LinkPreview {
    extractor: Arc<dyn MediaExtractor>,
    links: Arc<CallbackLinks>,
    developer_url: String,
}

impl LinkPreview {
    /// Create a preview flow using `extractor` for the metadata lookup.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        links: Arc<CallbackLinks>,
        developer_url: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            links,
            developer_url: developer_url.into(),
        }
    }

    /// Post a status, probe the link, then reply with the choice prompt.
    ///
    /// A failed lookup is shown in the status message and ends in
    /// `RequestState::Failed`. A posted prompt ends in `RequestState::Detected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the status or the text prompt cannot be sent.
    pub async fn run(
        &self,
        link: &str,
        requester: &str,
        transport: &dyn PreviewTransport,
    ) -> Result<RequestState> {
        let status_id = transport.post_status(DefaultMediaView::link_found()).await?;

        let info = match self.extractor.probe(link).await {
            Ok(info) => info,
            Err(e) => {
                warn!(%link, error = %e, "Failed to fetch link info");
                transport
                    .edit_status(status_id, &DefaultMediaView::probe_failed(&e.to_string()))
                    .await?;
                return Ok(RequestState::Failed);
            }
        };

        let caption = format_preview(&info, requester);
        let keyboard = action_keyboard(&self.links, link, &self.developer_url).await;

        let photo_sent = match info.best_thumbnail().and_then(|t| Url::parse(t).ok()) {
            Some(url) => transport
                .send_photo(url, &caption, keyboard.clone())
                .await
                .map_err(|e| warn!(error = %e, "Failed to send thumbnail, falling back to text"))
                .is_ok(),
            None => false,
        };
        if !photo_sent {
            transport.send_text(&caption, keyboard).await?;
        }

        if let Err(e) = transport.delete_status(status_id).await {
            debug!(error = %e, "Failed to delete link status message, ignoring");
        }
        info!(%link, "Choice prompt posted");
        Ok(RequestState::Detected)
    }
}
