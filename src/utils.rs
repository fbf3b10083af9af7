//! Utility functions for text truncation, human-readable formatting and
//! Telegram API retries.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use oxide_media_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

fn plural(count: u64, singular: &'static str, one: &'static str) -> String {
    if count == 1 {
        one.to_string()
    } else {
        format!("{count} {singular}s")
    }
}

/// Renders a duration in seconds as a relative phrase ("3 minutes", "an hour").
///
/// Units are floored, so 150 seconds reads as "2 minutes".
///
/// # Examples
///
/// ```
/// use oxide_media_bot::utils::humanize_duration;
/// assert_eq!(humanize_duration(212.0), "3 minutes");
/// assert_eq!(humanize_duration(3600.0), "an hour");
/// ```
#[must_use]
pub fn humanize_duration(seconds: f64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const YEAR: u64 = 365 * DAY;

    if !seconds.is_finite() || seconds < 1.0 {
        return "a moment".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = seconds.floor() as u64;

    match secs {
        s if s < MINUTE => plural(s, "second", "a second"),
        s if s < HOUR => plural(s / MINUTE, "minute", "a minute"),
        s if s < DAY => plural(s / HOUR, "hour", "an hour"),
        s if s < YEAR => plural(s / DAY, "day", "a day"),
        s => plural(s / YEAR, "year", "a year"),
    }
}

/// Renders a byte count with decimal units ("4.2 MB").
///
/// # Examples
///
/// ```
/// use oxide_media_bot::utils::humanize_size;
/// assert_eq!(humanize_size(1), "1 Byte");
/// assert_eq!(humanize_size(4_200_000), "4.2 MB");
/// ```
#[must_use]
pub fn humanize_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["kB", "MB", "GB", "TB", "PB"];

    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1000 {
        return format!("{bytes} Bytes");
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1000.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Used for status-message sends and edits, which may fail on transient
/// network errors. File uploads are not retried here.
///
/// The retry strategy uses exponential backoff with jitter:
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 (see constants in `config.rs`)
///
/// # Errors
///
/// Returns the last error if all attempts fail.
///
/// # Examples
///
/// ```no_run
/// use oxide_media_bot::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn edit_status() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { edit_status().await }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[test]
    fn test_humanize_duration_units() {
        assert_eq!(humanize_duration(0.4), "a moment");
        assert_eq!(humanize_duration(1.0), "a second");
        assert_eq!(humanize_duration(45.0), "45 seconds");
        assert_eq!(humanize_duration(60.0), "a minute");
        assert_eq!(humanize_duration(119.0), "a minute");
        assert_eq!(humanize_duration(150.0), "2 minutes");
        assert_eq!(humanize_duration(7199.0), "an hour");
        assert_eq!(humanize_duration(7200.0), "2 hours");
        assert_eq!(humanize_duration(86_400.0), "a day");
        assert_eq!(humanize_duration(5.0 * 86_400.0), "5 days");
        assert_eq!(humanize_duration(365.0 * 86_400.0), "a year");
    }

    #[test]
    fn test_humanize_duration_rejects_garbage() {
        assert_eq!(humanize_duration(f64::NAN), "a moment");
        assert_eq!(humanize_duration(-5.0), "a moment");
    }

    #[test]
    fn test_humanize_size_units() {
        assert_eq!(humanize_size(0), "0 Bytes");
        assert_eq!(humanize_size(999), "999 Bytes");
        assert_eq!(humanize_size(1000), "1.0 kB");
        assert_eq!(humanize_size(3_500_000), "3.5 MB");
        assert_eq!(humanize_size(2_000_000_000), "2.0 GB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = retry_telegram_operation(|| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("connection reset")
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
