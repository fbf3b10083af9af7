use crate::bot::callback::CallbackLinks;
use crate::bot::handlers::{self, parse_command, Command};
use crate::config::{Settings, CONNECT_MAX_ATTEMPTS, CONNECT_RETRY_DELAY_SECS};
use crate::media::{MediaExtractor, YtdlpExtractor};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Me};
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use tracing::{error, info, warn};

/// Run the bot until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error when the initial connection fails with a non-retryable error.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let bot = build_bot(&settings);

    let me = connect_with_backoff(|| {
        let bot = bot.clone();
        async move { bot.get_me().await }
    })
    .await?;
    info!(username = %me.username(), "Connected to Telegram");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let extractor: Arc<dyn MediaExtractor> = Arc::new(YtdlpExtractor::from_settings(&settings));
    let links = Arc::new(CallbackLinks::default());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, extractor, links])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped.");
    Ok(())
}

/// Create the bot client, pointing it at a self-hosted Bot API server if configured.
#[must_use]
pub fn build_bot(settings: &Settings) -> Bot {
    let bot = Bot::new(settings.telegram_token.clone());
    match settings.api_url() {
        Some(url) => {
            info!(
                api_url = %url,
                api_id = ?settings.api_id(),
                "Using custom Bot API server"
            );
            bot.set_api_url(url)
        }
        None => bot,
    }
}

/// Delay before the next connection attempt, or `None` if the error is final.
#[must_use]
pub fn connect_retry_delay(error: &RequestError, attempt: usize) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(secs) => Some(secs.duration()),
        RequestError::Network(_) | RequestError::Io(_) if attempt < CONNECT_MAX_ATTEMPTS => {
            Some(Duration::from_secs(CONNECT_RETRY_DELAY_SECS))
        }
        _ => None,
    }
}

/// Run the connect step, sleeping through rate limits and transient network errors.
///
/// Rate limits are waited out for as long as Telegram asks, indefinitely.
///
/// # Errors
///
/// Returns the last error once it is not retryable.
pub async fn connect_with_backoff<F, Fut, T>(mut operation: F) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => match connect_retry_delay(&e, attempt) {
                Some(delay) => {
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Connection to Telegram failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(attempt, error = %e, "Connection to Telegram failed");
                    return Err(e);
                }
            },
        }
    }
}

fn setup_handler() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    // `/song` and `!song` alike
                    dptree::filter_map(|msg: Message, me: Me| {
                        msg.text().and_then(|text| parse_command(text, me.username()))
                    })
                    .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    settings: Arc<Settings>,
    extractor: Arc<dyn MediaExtractor>,
) -> Result<(), RequestError> {
    if let Err(e) = handlers::handle_command(bot, msg, cmd, settings, extractor).await {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
    extractor: Arc<dyn MediaExtractor>,
    links: Arc<CallbackLinks>,
) -> Result<(), RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, settings, extractor, links).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    settings: Arc<Settings>,
    extractor: Arc<dyn MediaExtractor>,
    links: Arc<CallbackLinks>,
) -> Result<(), RequestError> {
    if let Err(e) = handlers::handle_callback(bot, q, settings, extractor, links).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
