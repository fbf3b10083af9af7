//! Inline button payloads.
//!
//! Telegram caps callback data at 64 bytes. Short links travel inline as
//! `yt_audio|<link>`; longer ones are parked in a TTL cache and the button
//! carries `yt_audio#<token>` instead.

use crate::config::{CALLBACK_LINK_CAPACITY, CALLBACK_LINK_TTL_SECS, TELEGRAM_CALLBACK_DATA_LIMIT};
use crate::media::MediaKind;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Callback prefix of the "Download Audio" button
pub const CB_AUDIO: &str = "yt_audio";
/// Callback prefix of the "Download Video" button
pub const CB_VIDEO: &str = "yt_video";

const INLINE_SEPARATOR: char = '|';
const TOKEN_SEPARATOR: char = '#';

/// Callback prefix for a media kind.
#[must_use]
pub const fn prefix_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => CB_AUDIO,
        MediaKind::Video => CB_VIDEO,
    }
}

fn kind_for(prefix: &str) -> Option<MediaKind> {
    match prefix {
        CB_AUDIO => Some(MediaKind::Audio),
        CB_VIDEO => Some(MediaKind::Video),
        _ => None,
    }
}

/// Why a button payload could not be turned back into a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// Payload is not one of ours
    Malformed,
    /// Token expired or the bot restarted since the prompt was sent
    Expired,
}

/// Encodes and resolves the links attached to the audio/video buttons
#[derive(Clone)]
pub struct CallbackLinks {
    links: Cache<String, String>,
}

impl Default for CallbackLinks {
    fn default() -> Self {
        Self::new(CALLBACK_LINK_TTL_SECS, CALLBACK_LINK_CAPACITY)
    }
}

impl CallbackLinks {
    /// Create a store keeping long links for `ttl_secs`.
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let links = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { links }
    }

    /// Build the callback data for a button. Always fits Telegram's limit.
    pub async fn encode(&self, kind: MediaKind, link: &str) -> String {
        let prefix = prefix_for(kind);
        let inline = format!("{prefix}{INLINE_SEPARATOR}{link}");
        if inline.len() <= TELEGRAM_CALLBACK_DATA_LIMIT {
            return inline;
        }

        let token = Uuid::new_v4().simple().to_string();
        self.links.insert(token.clone(), link.to_string()).await;
        debug!(%token, "Long link stored for callback");
        format!("{prefix}{TOKEN_SEPARATOR}{token}")
    }

    /// Recover the media kind and link from callback data.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::Malformed`] for foreign payloads and
    /// [`CallbackError::Expired`] for tokens no longer in the cache.
    pub async fn resolve(&self, data: &str) -> Result<(MediaKind, String), CallbackError> {
        if let Some((prefix, link)) = data.split_once(INLINE_SEPARATOR) {
            let kind = kind_for(prefix).ok_or(CallbackError::Malformed)?;
            if link.trim().is_empty() {
                return Err(CallbackError::Malformed);
            }
            return Ok((kind, link.to_string()));
        }

        if let Some((prefix, token)) = data.split_once(TOKEN_SEPARATOR) {
            let kind = kind_for(prefix).ok_or(CallbackError::Malformed)?;
            return self
                .links
                .get(token)
                .await
                .map(|link| (kind, link))
                .ok_or(CallbackError::Expired);
        }

        Err(CallbackError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_short_link_travels_inline() {
        let links = CallbackLinks::default();
        let data = links.encode(MediaKind::Audio, "https://youtu.be/dQw4w9WgXcQ").await;
        assert_eq!(data, "yt_audio|https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            links.resolve(&data).await,
            Ok((MediaKind::Audio, "https://youtu.be/dQw4w9WgXcQ".to_string()))
        );
    }

    #[tokio::test]
    async fn test_long_link_uses_token() {
        let links = CallbackLinks::default();
        let long = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI";
        let data = links.encode(MediaKind::Video, long).await;

        assert!(data.len() <= TELEGRAM_CALLBACK_DATA_LIMIT);
        assert!(data.starts_with("yt_video#"));
        assert_eq!(
            links.resolve(&data).await,
            Ok((MediaKind::Video, long.to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_token_is_expired() {
        let links = CallbackLinks::default();
        assert_eq!(
            links.resolve("yt_audio#0123456789abcdef").await,
            Err(CallbackError::Expired)
        );
    }

    #[tokio::test]
    async fn test_foreign_payloads_are_malformed() {
        let links = CallbackLinks::default();
        for data in ["", "yt_audio", "other|https://youtu.be/x", "yt_video|  ", "loop_retry"] {
            assert_eq!(
                links.resolve(data).await,
                Err(CallbackError::Malformed),
                "payload {data:?}"
            );
        }
    }
}
