//! Telegram bot that downloads audio and video with yt-dlp and uploads the
//! result back to the chat.

/// Telegram handlers, views and transport
pub mod bot;
/// Configuration and settings
pub mod config;
/// Log output setup
pub mod logging;
/// Media domain: links, extraction, captions, workflow
pub mod media;
/// Bot startup and update dispatching
pub mod runner;
/// Text and retry helpers
pub mod utils;
