/// Inline button payloads and the long-link cache
pub mod callback;
/// Command, text and callback handlers
pub mod handlers;
/// Metadata preview and choice prompt for a detected link
pub mod preview;
/// Status message helpers with retry
pub mod resilient;
/// Telegram implementation of the media transport
pub mod transport;
/// Texts and keyboards
pub mod views;

pub use callback::CallbackLinks;
pub use preview::{LinkPreview, PreviewTransport};
pub use transport::TelegramMediaTransport;
