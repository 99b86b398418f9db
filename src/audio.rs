//! Single-flight audio generation.
//!
//! Each pipeline renders one audio element, so each owns one
//! [`AudioRequestController`]. While a synthesis request is outstanding the
//! controller rejects every further request, for the same identifier or any
//! other. Rejected calls are dropped, not queued; the user re-invokes.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::Backend;
use crate::models::{AudioPlaybackState, AudioStatus, Identifier};
use crate::stamp::next_stamp;

/// What a call to [`AudioRequestController::request_audio`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutcome {
    Ready { url: String },
    Failed(String),
    /// A request was already in flight; nothing was sent.
    Suppressed,
}

pub struct AudioRequestController {
    backend: Arc<dyn Backend>,
    busy: AtomicBool,
    state: Mutex<AudioPlaybackState>,
}

/// Clears the busy latch on every exit path, including cancellation of the
/// request future.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AudioRequestController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            busy: AtomicBool::new(false),
            state: Mutex::new(AudioPlaybackState::default()),
        }
    }

    pub fn state(&self) -> AudioPlaybackState {
        self.state.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Forget the current playback state. Ignored while a request is in flight.
    pub fn reset(&self) {
        if self.is_busy() {
            return;
        }
        *self.state.lock() = AudioPlaybackState::default();
    }

    /// Claim the single-flight latch for `identifier` and mark the state
    /// `Requesting`.
    ///
    /// Returns `None` while another request holds the latch. The latch is
    /// released when the returned [`AudioRequest`] is sent or dropped.
    pub fn try_begin(&self, identifier: Identifier) -> Option<AudioRequest<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(%identifier, "audio request already in flight, ignoring");
            return None;
        }
        let guard = BusyGuard(&self.busy);

        {
            let mut state = self.state.lock();
            state.status = AudioStatus::Requesting;
            state.url = None;
            state.error = None;
            state.for_identifier = Some(identifier.clone());
        }

        Some(AudioRequest {
            controller: self,
            identifier,
            _guard: guard,
        })
    }

    /// Ask the backend to synthesize audio for `identifier`.
    ///
    /// On success the state becomes `Ready` with a playback URL carrying a
    /// fresh `t=` cache-buster, so a regenerated clip is never served from a
    /// stale cache. On failure the decoded backend message is recorded and
    /// returned.
    pub async fn request_audio(&self, identifier: Identifier) -> AudioOutcome {
        match self.try_begin(identifier) {
            Some(request) => request.send().await,
            None => AudioOutcome::Suppressed,
        }
    }
}

/// A claimed audio request. Holds the controller's busy latch until sent or
/// dropped.
pub struct AudioRequest<'a> {
    controller: &'a AudioRequestController,
    identifier: Identifier,
    _guard: BusyGuard<'a>,
}

impl AudioRequest<'_> {
    /// Send the synthesis request and record the result.
    pub async fn send(self) -> AudioOutcome {
        let controller = self.controller;
        let identifier = &self.identifier;
        match controller
            .backend
            .generate_audio(identifier, next_stamp())
            .await
        {
            Ok(()) => {
                let url = controller.backend.audio_url(identifier, next_stamp());
                tracing::info!(%identifier, %url, "audio ready");
                let mut state = controller.state.lock();
                state.status = AudioStatus::Ready;
                state.url = Some(url.clone());
                AudioOutcome::Ready { url }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(%identifier, error = %message, "audio generation failed");
                let mut state = controller.state.lock();
                state.status = AudioStatus::Failed;
                state.error = Some(message.clone());
                AudioOutcome::Failed(message)
            }
        }
    }
}
