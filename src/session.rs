//! The edit session: form state plus the generation state machine.
//!
//! ```text
//! Idle ──begin──▶ Requesting ──complete(Ok)──▶ Succeeded
//!   ▲                  │                           │
//!   │                  └──complete(Err)──▶ Failed  │
//!   └──────── new input clears result ◀────────────┘
//! ```
//!
//! `begin` refuses to start while a request is in flight, and drops any
//! previous result the moment it succeeds.

use crate::error::{MirageError, Result};
use crate::image::prompt::effective_prompt;
use crate::image::upload::{SourceFile, UploadSlot};
use crate::image::{AspectRatio, GeneratedResult, GenerationMode, GenerationRequest, ImageEditor};
use std::sync::Arc;

/// Shown when generation is attempted without a source image.
pub const MISSING_PRIMARY_MESSAGE: &str = "Please upload a source image first.";

/// Shown when gesture mode is missing its subject image.
pub const MISSING_SUBJECT_MESSAGE: &str =
    "Please upload the subject photo (who performs the gesture).";

/// Where the session is in its generate cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationState {
    /// Nothing requested, or the last result was cleared.
    #[default]
    Idle,
    /// A request is in flight.
    Requesting,
    /// The last request returned this result.
    Succeeded(GeneratedResult),
    /// The last request failed with this message.
    Failed(String),
}

/// A started generation, handed back to [`EditSession::complete`].
#[derive(Debug)]
#[must_use = "a pending generation must be completed"]
pub struct PendingGeneration {
    id: u64,
    revision: u64,
    request: GenerationRequest,
}

impl PendingGeneration {
    /// The request to send.
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

/// Form state and generation lifecycle for one user.
pub struct EditSession {
    editor: Arc<dyn ImageEditor>,
    primary: UploadSlot,
    secondary: UploadSlot,
    prompt: String,
    aspect_ratio: AspectRatio,
    mode: GenerationMode,
    state: GenerationState,
    error: Option<String>,
    // Bumped on every input change; a completion carrying an older value
    // no longer matches what's on screen.
    revision: u64,
    next_id: u64,
    in_flight: Option<u64>,
}

impl EditSession {
    /// Creates an idle session that sends requests through `editor`.
    pub fn new(editor: Arc<dyn ImageEditor>) -> Self {
        Self {
            editor,
            primary: UploadSlot::new(),
            secondary: UploadSlot::new(),
            prompt: String::new(),
            aspect_ratio: AspectRatio::default(),
            mode: GenerationMode::default(),
            state: GenerationState::Idle,
            error: None,
            revision: 0,
            next_id: 0,
            in_flight: None,
        }
    }

    /// The editor requests go to.
    pub fn editor(&self) -> &dyn ImageEditor {
        self.editor.as_ref()
    }

    /// The user's free-text instruction.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Replaces the user's free-text instruction.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.revision += 1;
    }

    /// Output aspect ratio.
    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// Selects the output aspect ratio.
    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
        self.revision += 1;
    }

    /// Current generation mode.
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Switches mode. Uploaded images are kept.
    pub fn set_mode(&mut self, mode: GenerationMode) {
        self.mode = mode;
        self.revision += 1;
    }

    /// The source (standard) or pose (gesture) slot.
    pub fn primary(&self) -> &UploadSlot {
        &self.primary
    }

    /// The subject slot used in gesture mode.
    pub fn secondary(&self) -> &UploadSlot {
        &self.secondary
    }

    /// Loads `file` into the primary slot.
    ///
    /// On success the displayed result and error are cleared. On failure
    /// nothing in the session changes.
    pub async fn upload_primary(&mut self, file: SourceFile) -> Result<()> {
        self.primary.accept_file(file).await?;
        self.on_upload();
        Ok(())
    }

    /// Loads `file` into the secondary slot. Same rules as the primary slot.
    pub async fn upload_secondary(&mut self, file: SourceFile) -> Result<()> {
        self.secondary.accept_file(file).await?;
        self.on_upload();
        Ok(())
    }

    /// Empties the primary slot and drops the displayed result.
    pub fn clear_primary(&mut self) {
        self.primary.clear();
        self.revision += 1;
        self.clear_result();
    }

    /// Empties the secondary slot and drops the displayed result.
    pub fn clear_secondary(&mut self) {
        self.secondary.clear();
        self.revision += 1;
        self.clear_result();
    }

    fn on_upload(&mut self) {
        self.revision += 1;
        self.clear_result();
        self.dismiss_error();
    }

    fn clear_result(&mut self) {
        if matches!(self.state, GenerationState::Succeeded(_)) {
            self.state = GenerationState::Idle;
        }
    }

    /// Current generation state.
    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// True while a request is in flight.
    pub fn is_generating(&self) -> bool {
        self.state == GenerationState::Requesting
    }

    /// The result currently on display, if any.
    pub fn result(&self) -> Option<&GeneratedResult> {
        match &self.state {
            GenerationState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    /// The error banner text, if shown.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Hides the error banner.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Whether the images the current mode needs are loaded and nothing is
    /// in flight.
    pub fn can_generate(&self) -> bool {
        !self.is_generating() && self.validate().is_ok()
    }

    fn validate(&self) -> Result<()> {
        if !self.primary.is_ready() {
            return Err(MirageError::MissingImage(MISSING_PRIMARY_MESSAGE.into()));
        }
        if self.mode.requires_secondary() && !self.secondary.is_ready() {
            return Err(MirageError::MissingImage(MISSING_SUBJECT_MESSAGE.into()));
        }
        Ok(())
    }

    fn build_request(&self) -> Result<GenerationRequest> {
        let primary = self
            .primary
            .image()
            .inline()
            .ok_or_else(|| MirageError::MissingImage(MISSING_PRIMARY_MESSAGE.into()))?;
        let secondary = if self.mode.requires_secondary() {
            Some(
                self.secondary
                    .image()
                    .inline()
                    .ok_or_else(|| MirageError::MissingImage(MISSING_SUBJECT_MESSAGE.into()))?,
            )
        } else {
            None
        };

        Ok(GenerationRequest {
            prompt: effective_prompt(self.mode, &self.prompt),
            primary,
            secondary,
            aspect_ratio: self.aspect_ratio,
        })
    }

    /// Moves to `Requesting` and returns the request to send.
    ///
    /// Refused with [`MirageError::Busy`] while a request is in flight, and
    /// with [`MirageError::MissingImage`] when the mode's images are not
    /// loaded; a refusal leaves the state where it was.
    pub fn begin(&mut self) -> Result<PendingGeneration> {
        if self.in_flight.is_some() {
            return Err(MirageError::Busy);
        }

        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                self.error = Some(e.user_message());
                return Err(e);
            }
        };

        self.next_id += 1;
        let id = self.next_id;
        self.in_flight = Some(id);
        self.state = GenerationState::Requesting;
        self.error = None;

        tracing::debug!(
            id,
            mode = %self.mode,
            aspect_ratio = %self.aspect_ratio,
            images = request.image_count(),
            "generation started"
        );

        Ok(PendingGeneration {
            id,
            revision: self.revision,
            request,
        })
    }

    /// Records the outcome of a request started by [`Self::begin`].
    ///
    /// Remote failures become a `Failed` state carrying one display
    /// message; the full error goes to the log.
    pub fn complete(
        &mut self,
        pending: PendingGeneration,
        outcome: Result<GeneratedResult>,
    ) -> &GenerationState {
        if self.in_flight != Some(pending.id) {
            tracing::warn!(id = pending.id, "ignoring completion for unknown generation");
            return &self.state;
        }
        self.in_flight = None;

        if pending.revision != self.revision {
            tracing::warn!(
                id = pending.id,
                "inputs changed while generation was in flight; result may not match them"
            );
        }

        self.state = match outcome {
            Ok(result) => {
                tracing::debug!(
                    id = pending.id,
                    has_image = result.image_url.is_some(),
                    has_text = result.text.is_some(),
                    "generation succeeded"
                );
                GenerationState::Succeeded(result)
            }
            Err(e) => {
                tracing::error!(id = pending.id, error = ?e, "error generating image");
                let message = e.user_message();
                self.error = Some(message.clone());
                GenerationState::Failed(message)
            }
        };
        &self.state
    }

    /// Gives up on a generation started by [`Self::begin`] without
    /// recording an outcome. The session returns to `Idle`.
    pub fn abandon(&mut self, pending: PendingGeneration) {
        self.release(pending.id);
    }

    fn release(&mut self, id: u64) {
        if self.in_flight != Some(id) {
            return;
        }
        tracing::warn!(id, "generation abandoned before it completed");
        self.in_flight = None;
        self.state = GenerationState::Idle;
    }

    /// Validates, sends one request through the editor, and records the
    /// outcome. Only refusals from [`Self::begin`] are returned as errors.
    ///
    /// Dropping the returned future mid-request (a timeout, `select!`)
    /// puts the session back to `Idle`.
    pub async fn generate(&mut self) -> Result<&GenerationState> {
        let pending = self.begin()?;
        let editor = Arc::clone(&self.editor);
        {
            let guard = InFlightGuard {
                id: pending.id,
                session: &mut *self,
            };
            let outcome = editor.edit(pending.request()).await;
            guard.session.complete(pending, outcome);
        }
        Ok(&self.state)
    }
}

/// Releases the in-flight slot if a generation never reached `complete`.
struct InFlightGuard<'a> {
    id: u64,
    session: &'a mut EditSession,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.session.release(self.id);
    }
}
