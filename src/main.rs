use dotenvy::dotenv;
use oxide_media_bot::config::Settings;
use oxide_media_bot::logging::{init_logging, RedactionPatterns};
use oxide_media_bot::runner::run_bot;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Settings before logging, so their secrets are masked from the first line
    let loaded = Settings::new();
    let secrets = loaded.as_ref().map(Settings::secrets).unwrap_or_default();

    let patterns = Arc::new(
        RedactionPatterns::new()
            .and_then(|p| p.with_secrets(secrets))
            .map_err(|e| {
                eprintln!("Failed to compile regex patterns: {e}");
                e
            })?,
    );
    init_logging(patterns);

    info!("Starting media downloader bot...");

    let settings = init_settings(loaded);

    if let Err(e) = run_bot(settings).await {
        error!("Bot terminated: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_settings(loaded: Result<Settings, config::ConfigError>) -> Arc<Settings> {
    match loaded {
        Ok(s) => {
            info!(
                ytdlp = %s.ytdlp_path,
                cookies = %s.cookies_file,
                "Configuration loaded successfully."
            );
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}
