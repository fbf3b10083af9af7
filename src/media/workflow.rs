//! Request-scoped download-and-deliver workflow.
//!
//! One parameterized flow serves both button taps and search commands:
//!
//! ```text
//! Idle -> Detected -> Preparing -> Downloading -> Uploading -> Done
//!                          \             \             \
//!                           `-------------`-------------`---> Failed
//! ```
//!
//! The workflow never propagates errors. Whatever happens, the workspace is
//! closed exactly once and a button trigger is acknowledged. The button is
//! answered as soon as the request starts, and once more on exit only if that
//! first answer failed.

use super::caption::format_caption;
use super::{DownloadRequest, MediaError, MediaExtractor, MediaKind, Trigger, Workspace};
use crate::utils::humanize_size;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Platform-side id of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusId(pub i32);

/// Chat platform operations needed by the workflow.
///
/// An implementation is bound to one chat and one triggering message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Post a new status message replying to the trigger.
    async fn post_status(&self, text: &str) -> Result<StatusId>;

    /// Replace the text of a status message.
    async fn edit_status(&self, id: StatusId, text: &str) -> Result<()>;

    /// Delete a status message.
    async fn delete_status(&self, id: StatusId) -> Result<()>;

    /// Upload a file as playable audio.
    async fn send_audio(&self, file: &Path, caption: &str) -> Result<()>;

    /// Upload a file as playable video.
    async fn send_video(&self, file: &Path, caption: &str) -> Result<()>;

    /// Upload a file as a generic document.
    async fn send_document(&self, file: &Path, caption: &str) -> Result<()>;

    /// Clear the client-side "pending" indicator of a button tap.
    async fn acknowledge(&self) -> Result<()>;
}

/// Lifecycle of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing happened yet
    Idle,
    /// A link was found and the choice prompt is shown (reported by `LinkPreview`)
    Detected,
    /// Workspace allocated, status posted, metadata being probed
    Preparing,
    /// Extraction tool is downloading
    Downloading,
    /// File is being uploaded to the chat
    Uploading,
    /// File delivered
    Done,
    /// Request ended with an error
    Failed,
}

/// Terminal result of a workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    /// `Done` or `Failed`
    pub state: RequestState,
    /// State in which the failure happened, if any
    pub failed_in: Option<RequestState>,
    /// Final status text shown to the user
    pub message: String,
}

impl WorkflowOutcome {
    /// Whether the file was delivered.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == RequestState::Done
    }
}

/// Status texts narrating a request
mod status {
    use super::{DownloadRequest, MediaKind, Trigger};

    pub fn initial(request: &DownloadRequest) -> String {
        match (request.trigger, request.kind) {
            (Trigger::Button, _) => "⏳ Preparing download...".to_string(),
            (Trigger::Command, MediaKind::Audio) => format!(
                "🎶 Searching <code>{}</code> ...",
                html_escape::encode_text(&request.locator)
            ),
            (Trigger::Command, MediaKind::Video) => format!(
                "🎬 Searching <code>{}</code> ...",
                html_escape::encode_text(&request.locator)
            ),
        }
    }

    pub const DOWNLOADING: &str = "⬇️ Download started... this may take a while";
    pub const DONE: &str = "✅ Done — file uploaded.";
    pub const EMPTY_LOCATOR: &str = "❌ Nothing to download.";

    pub fn uploading(size: &str) -> String {
        format!("✅ Downloaded ({size}). Uploading to Telegram...")
    }
}

/// Drives one [`DownloadRequest`] from `Preparing` to a terminal state
pub struct DownloadWorkflow {
    extractor: Arc<dyn MediaExtractor>,
    error_linger: Duration,
}

impl DownloadWorkflow {
    /// Create a workflow around an extractor.
    #[must_use]
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            extractor,
            error_linger: Duration::from_secs(crate::config::COMMAND_ERROR_LINGER_SECS),
        }
    }

    /// How long a command's error status stays visible before it is deleted.
    #[must_use]
    pub const fn with_error_linger(mut self, linger: Duration) -> Self {
        self.error_linger = linger;
        self
    }

    /// Run the request to completion. Never fails; the outcome says how it ended.
    pub async fn run(
        &self,
        request: &DownloadRequest,
        transport: &dyn MediaTransport,
    ) -> WorkflowOutcome {
        // Answer the tap before any slow work
        let acknowledged = request.trigger == Trigger::Button && acknowledge(transport).await;

        let outcome = if request.locator.trim().is_empty() {
            WorkflowOutcome {
                state: RequestState::Failed,
                failed_in: Some(RequestState::Idle),
                message: status::EMPTY_LOCATOR.to_string(),
            }
        } else {
            self.run_prepared(request, transport).await
        };

        if request.trigger == Trigger::Button && !acknowledged {
            acknowledge(transport).await;
        }

        outcome
    }

    async fn run_prepared(
        &self,
        request: &DownloadRequest,
        transport: &dyn MediaTransport,
    ) -> WorkflowOutcome {
        let mut state = RequestState::Preparing;
        info!(
            kind = request.kind.label(),
            trigger = ?request.trigger,
            locator = %request.locator,
            "Download request started"
        );

        let status_id = match transport.post_status(&status::initial(request)).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Failed to post status message, continuing without it");
                None
            }
        };

        let mut workspace = match Workspace::open(request.trigger.workspace_prefix()) {
            Ok(ws) => ws,
            Err(e) => return self.fail(request, transport, status_id, state, &e).await,
        };

        let result = self
            .deliver(request, transport, status_id, &workspace, &mut state)
            .await;
        workspace.close();

        match result {
            Ok(()) => self.succeed(request, transport, status_id).await,
            Err(e) => self.fail(request, transport, status_id, state, &e).await,
        }
    }

    async fn deliver(
        &self,
        request: &DownloadRequest,
        transport: &dyn MediaTransport,
        status_id: Option<StatusId>,
        workspace: &Workspace,
        state: &mut RequestState,
    ) -> Result<(), MediaError> {
        // Button taps refresh metadata first; commands take it from the download.
        let probed = match request.trigger {
            Trigger::Button => Some(self.extractor.probe(&request.locator).await?),
            Trigger::Command => None,
        };

        *state = RequestState::Downloading;
        set_status(transport, status_id, status::DOWNLOADING).await;
        let fetched = self
            .extractor
            .fetch(&request.locator, request.kind, workspace.path())
            .await?;

        *state = RequestState::Uploading;
        let info = probed.as_ref().unwrap_or(&fetched.info);
        let caption = format_caption(info, &request.requester);
        set_status(
            transport,
            status_id,
            &status::uploading(&humanize_size(fetched.size)),
        )
        .await;

        upload(request.kind, transport, &fetched.file, &caption).await
    }

    async fn succeed(
        &self,
        request: &DownloadRequest,
        transport: &dyn MediaTransport,
        status_id: Option<StatusId>,
    ) -> WorkflowOutcome {
        info!(kind = request.kind.label(), locator = %request.locator, "Download request done");
        match (request.trigger, status_id) {
            (Trigger::Button, Some(id)) => {
                if let Err(e) = transport.edit_status(id, status::DONE).await {
                    debug!(error = %e, "Failed to mark status as done");
                }
            }
            (Trigger::Command, Some(id)) => delete_status(transport, id).await,
            (_, None) => {}
        }
        WorkflowOutcome {
            state: RequestState::Done,
            failed_in: None,
            message: status::DONE.to_string(),
        }
    }

    async fn fail(
        &self,
        request: &DownloadRequest,
        transport: &dyn MediaTransport,
        status_id: Option<StatusId>,
        state: RequestState,
        error: &MediaError,
    ) -> WorkflowOutcome {
        warn!(
            kind = request.kind.label(),
            locator = %request.locator,
            failed_in = ?state,
            error = %error,
            "Download request failed"
        );
        let message = error.user_message();
        if let Some(id) = status_id {
            set_status(transport, Some(id), &message).await;
            if request.trigger == Trigger::Command {
                tokio::time::sleep(self.error_linger).await;
                delete_status(transport, id).await;
            }
        }
        WorkflowOutcome {
            state: RequestState::Failed,
            failed_in: Some(state),
            message,
        }
    }
}

/// Upload with the primary method for the kind; videos get one document fallback.
async fn upload(
    kind: MediaKind,
    transport: &dyn MediaTransport,
    file: &Path,
    caption: &str,
) -> Result<(), MediaError> {
    match kind {
        MediaKind::Audio => transport
            .send_audio(file, caption)
            .await
            .map_err(|e| MediaError::Upload(e.to_string())),
        MediaKind::Video => match transport.send_video(file, caption).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    file = %file.display(),
                    error = %e,
                    "Failed to send video as native media; falling back to document"
                );
                transport
                    .send_document(file, caption)
                    .await
                    .map_err(|e| MediaError::Upload(e.to_string()))
            }
        },
    }
}

async fn set_status(transport: &dyn MediaTransport, status_id: Option<StatusId>, text: &str) {
    let Some(id) = status_id else {
        return;
    };
    if let Err(e) = transport.edit_status(id, text).await {
        debug!(error = %e, "Status update skipped");
    }
}

async fn delete_status(transport: &dyn MediaTransport, id: StatusId) {
    if let Err(e) = transport.delete_status(id).await {
        debug!(error = %e, "Failed to delete status message, ignoring");
    }
}

/// Best-effort callback answer. Returns whether it went through.
async fn acknowledge(transport: &dyn MediaTransport) -> bool {
    match transport.acknowledge().await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Failed to acknowledge callback, ignoring");
            false
        }
    }
}
