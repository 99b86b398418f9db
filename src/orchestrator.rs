//! Workflow orchestration: search → select → summarize → audio.
//!
//! The [`WorkflowOrchestrator`] owns two disjoint pipelines:
//!
//! ```text
//!  search pipeline:  Empty ─search─▶ Listed ─select─▶ Selected ─summarize─▶ Summarized ─audio─▶ AudioReady
//!  upload pipeline:  Empty ─upload / paper ref──────────────────────────────▶ Summarized ─audio─▶ AudioReady
//! ```
//!
//! Actions on one pipeline never touch the other. A failed action records a
//! user-visible message and leaves the pipeline at its last successful stage,
//! so the user can retry without losing earlier results.
//!
//! # Stale responses
//!
//! Every request captures a [`RequestToken`]: the pipeline generation (bumped
//! whenever the active identifier changes) plus a per-kind sequence number.
//! When `workflow.discard_stale_responses` is on, a response whose token no
//! longer matches is dropped and the action reports
//! [`ActionOutcome::Discarded`]. With it off, responses are applied in arrival
//! order; a summary is still attributed to the identifier it was requested
//! for.
//!
//! # Fallback identifier registration
//!
//! When an upload response carries no identifier, one is synthesized and
//! registered with the backend by a detached task. The summary is shown
//! without waiting for it; registration failures are only logged. An audio
//! request on the upload pipeline waits for pending registrations first, so
//! the backend can resolve the identifier.

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::audio::{AudioOutcome, AudioRequestController};
use crate::backend::{Backend, BackendError};
use crate::config::WorkflowConfig;
use crate::models::{
    ActionOutcome, Identifier, IdentifierOrigin, PipelineKind, PipelineView, SearchResultRecord,
    Stage, SummaryRecord,
};
use crate::payload::unwrap_text;
use crate::results::parse_results;
use crate::summary::normalize_summary;
use crate::upload::parse_upload_response;

/// Appended to the displayed summary while audio is being generated.
pub const AUDIO_PENDING_NOTICE: &str = "\n\n(Generating audio, please wait...)";

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Search,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequestToken {
    generation: u64,
    seq: u64,
}

#[derive(Debug, Default)]
struct PipelineState {
    stage: Stage,
    results: Vec<SearchResultRecord>,
    selected_index: usize,
    summary: Option<SummaryRecord>,
    display_text: Option<String>,
    error: Option<String>,
    generation: u64,
    search_seq: u64,
    summary_seq: u64,
}

impl PipelineState {
    fn issue(&mut self, kind: RequestKind) -> RequestToken {
        let seq = match kind {
            RequestKind::Search => {
                self.search_seq += 1;
                self.search_seq
            }
            RequestKind::Summary => {
                self.summary_seq += 1;
                self.summary_seq
            }
        };
        RequestToken {
            generation: self.generation,
            seq,
        }
    }

    /// Whether a response issued with `token` still belongs to this state.
    ///
    /// Search responses only race other searches: a newer search supersedes
    /// them, a selection change does not.
    fn is_current(&self, kind: RequestKind, token: RequestToken) -> bool {
        match kind {
            RequestKind::Search => token.seq == self.search_seq,
            RequestKind::Summary => {
                token.seq == self.summary_seq && token.generation == self.generation
            }
        }
    }

    fn clear_pending_notice(&mut self) {
        if let Some(text) = self.display_text.as_mut() {
            if let Some(stripped) = text.strip_suffix(AUDIO_PENDING_NOTICE) {
                *text = stripped.to_string();
            }
        }
    }
}

pub struct WorkflowOrchestrator {
    backend: Arc<dyn Backend>,
    settings: WorkflowConfig,
    search: Mutex<PipelineState>,
    upload: Mutex<PipelineState>,
    search_audio: AudioRequestController,
    upload_audio: AudioRequestController,
    registrations: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkflowOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, settings: WorkflowConfig) -> Self {
        Self {
            search_audio: AudioRequestController::new(Arc::clone(&backend)),
            upload_audio: AudioRequestController::new(Arc::clone(&backend)),
            backend,
            settings,
            search: Mutex::new(PipelineState::default()),
            upload: Mutex::new(PipelineState::default()),
            registrations: Mutex::new(Vec::new()),
        }
    }

    fn pipeline(&self, kind: PipelineKind) -> &Mutex<PipelineState> {
        match kind {
            PipelineKind::Search => &self.search,
            PipelineKind::Upload => &self.upload,
        }
    }

    fn audio(&self, kind: PipelineKind) -> &AudioRequestController {
        match kind {
            PipelineKind::Search => &self.search_audio,
            PipelineKind::Upload => &self.upload_audio,
        }
    }

    fn accepts(&self, state: &PipelineState, kind: RequestKind, token: RequestToken) -> bool {
        !self.settings.discard_stale_responses || state.is_current(kind, token)
    }

    /// Snapshot of a pipeline for the presentation layer.
    pub fn view(&self, kind: PipelineKind) -> PipelineView {
        let state = self.pipeline(kind).lock();
        PipelineView {
            kind,
            stage: state.stage,
            results: state.results.clone(),
            selected_index: state.selected_index,
            summary: state.summary.clone(),
            display_text: state.display_text.clone(),
            error: state.error.clone(),
            audio: self.audio(kind).state(),
        }
    }

    pub fn search_view(&self) -> PipelineView {
        self.view(PipelineKind::Search)
    }

    pub fn upload_view(&self) -> PipelineView {
        self.view(PipelineKind::Upload)
    }

    // ============ Search pipeline ============

    /// Run a search and replace the result set.
    ///
    /// Zero parsed results is a valid `Listed` state. On failure the previous
    /// result set is kept.
    pub async fn search(&self, query: &str) -> ActionOutcome {
        let query = query.trim();
        if query.is_empty() {
            return self.reject(PipelineKind::Search, "Please enter a search query");
        }

        let token = self.search.lock().issue(RequestKind::Search);
        let response = self.backend.search(query).await;

        let mut state = self.search.lock();
        if !self.accepts(&state, RequestKind::Search, token) {
            tracing::debug!(query, "discarding superseded search response");
            return ActionOutcome::Discarded;
        }

        match response {
            Ok(body) => {
                let results = parse_results(&unwrap_text(&body));
                tracing::info!(query, count = results.len(), "search results");
                state.results = results;
                state.selected_index = 0;
                state.stage = Stage::Listed;
                state.summary = None;
                state.display_text = None;
                state.error = None;
                state.generation += 1;
                drop(state);
                self.search_audio.reset();
                ActionOutcome::Applied
            }
            Err(e) => {
                let message = format!("Search failed: {}", e);
                tracing::warn!(query, error = %e, "search failed");
                state.error = Some(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Select the result at `index` of the current result set.
    pub fn select(&self, index: usize) -> ActionOutcome {
        let mut state = self.search.lock();
        if index >= state.results.len() {
            let message = format!(
                "No result at index {} ({} results listed)",
                index,
                state.results.len()
            );
            state.error = Some(message.clone());
            return ActionOutcome::Rejected(message);
        }

        if index != state.selected_index {
            state.selected_index = index;
            state.generation += 1;
            state.stage = Stage::Selected;
            state.summary = None;
            state.display_text = None;
            state.error = None;
            drop(state);
            self.search_audio.reset();
            return ActionOutcome::Applied;
        }
        if state.stage == Stage::Listed {
            state.stage = Stage::Selected;
        }
        state.error = None;
        ActionOutcome::Applied
    }

    /// Summarize the currently selected result.
    pub async fn summarize_selected(&self) -> ActionOutcome {
        let (identifier, token) = {
            let mut state = self.search.lock();
            let Some(record) = state.results.get(state.selected_index) else {
                let message = "No paper selected".to_string();
                state.error = Some(message.clone());
                return ActionOutcome::Rejected(message);
            };
            let identifier = Identifier::from(record.id);
            (identifier, state.issue(RequestKind::Summary))
        };

        let response = self.backend.summarize(&identifier).await;

        let mut state = self.search.lock();
        if !self.accepts(&state, RequestKind::Summary, token) {
            tracing::debug!(%identifier, "discarding stale summary response");
            return ActionOutcome::Discarded;
        }

        match response {
            Ok(body) => {
                let text = normalize_summary(&unwrap_text(&body));
                tracing::info!(%identifier, chars = text.len(), "summary received");
                state.summary = Some(SummaryRecord {
                    for_id: identifier,
                    text: text.clone(),
                });
                state.display_text = Some(text);
                state.stage = Stage::Summarized;
                state.error = None;
                drop(state);
                self.search_audio.reset();
                ActionOutcome::Applied
            }
            Err(e) => {
                let message = format!("Failed to fetch summary: {}", e);
                tracing::warn!(%identifier, error = %e, "summary failed");
                state.summary = None;
                state.display_text = Some(message.clone());
                state.error = Some(message.clone());
                if matches!(state.stage, Stage::Summarized | Stage::AudioReady) {
                    state.stage = Stage::Selected;
                }
                ActionOutcome::Failed(message)
            }
        }
    }

    // ============ Upload pipeline ============

    /// Upload a PDF and summarize it.
    pub async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> ActionOutcome {
        if bytes.is_empty() || !looks_like_pdf(file_name, &bytes) {
            return self.reject(PipelineKind::Upload, "Only PDF files are accepted");
        }

        let token = self.upload.lock().issue(RequestKind::Summary);
        let response = self.backend.upload_pdf(file_name, bytes).await;
        self.apply_upload(token, response, file_name)
    }

    /// Summarize a paper given by URL or arXiv id.
    pub async fn summarize_paper(&self, paper_ref: &str) -> ActionOutcome {
        let paper_ref = paper_ref.trim();
        if paper_ref.is_empty() {
            return self.reject(PipelineKind::Upload, "Please enter a paper URL or ID");
        }

        let token = self.upload.lock().issue(RequestKind::Summary);
        let response = self.backend.summarize_direct(paper_ref).await;
        self.apply_upload(token, response, paper_ref)
    }

    /// Read a PDF from disk and upload it.
    pub async fn upload_pdf_file(&self, path: &Path) -> ActionOutcome {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "paper.pdf".to_string());
        match tokio::fs::read(path).await {
            Ok(bytes) => self.upload_pdf(&file_name, bytes).await,
            Err(e) => self.reject(
                PipelineKind::Upload,
                &format!("Could not read {}: {}", path.display(), e),
            ),
        }
    }

    fn apply_upload(
        &self,
        token: RequestToken,
        response: Result<String, BackendError>,
        source: &str,
    ) -> ActionOutcome {
        let mut state = self.upload.lock();
        if !self.accepts(&state, RequestKind::Summary, token) {
            tracing::debug!(source, "discarding stale upload response");
            return ActionOutcome::Discarded;
        }

        match response {
            Ok(body) => {
                let parsed =
                    parse_upload_response(&unwrap_text(&body), &self.settings.fallback_id_prefix);
                tracing::info!(
                    source,
                    identifier = %parsed.identifier,
                    origin = ?parsed.origin,
                    "upload summary received"
                );
                if parsed.origin == IdentifierOrigin::Fallback {
                    self.register_fallback(parsed.identifier.clone(), parsed.summary.clone());
                }
                state.summary = Some(SummaryRecord {
                    for_id: parsed.identifier,
                    text: parsed.summary.clone(),
                });
                state.display_text = Some(parsed.summary);
                state.stage = Stage::Summarized;
                state.error = None;
                state.generation += 1;
                drop(state);
                self.upload_audio.reset();
                ActionOutcome::Applied
            }
            Err(e) => {
                let message = format!("Failed to process: {}", e);
                tracing::warn!(source, error = %e, "upload failed");
                state.error = Some(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    fn register_fallback(&self, identifier: Identifier, summary: String) {
        let backend = Arc::clone(&self.backend);
        let handle = tokio::spawn(async move {
            match backend.store_summary(&identifier, &summary).await {
                Ok(()) => tracing::debug!(%identifier, "registered fallback identifier"),
                Err(e) => {
                    tracing::warn!(%identifier, error = %e, "failed to register fallback identifier")
                }
            }
        });

        let mut registrations = self.registrations.lock();
        registrations.retain(|h| !h.is_finished());
        registrations.push(handle);
    }

    /// Wait for every detached registration task to finish.
    pub async fn wait_for_registrations(&self) {
        let handles = std::mem::take(&mut *self.registrations.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "registration task did not complete");
            }
        }
    }

    // ============ Audio ============

    /// Generate audio for the pipeline's current summary.
    ///
    /// The audio latch is claimed before anything is awaited, so a second
    /// call is suppressed even while the first is still waiting for fallback
    /// registrations.
    pub async fn request_audio(&self, kind: PipelineKind) -> ActionOutcome {
        let controller = self.audio(kind);
        if controller.is_busy() {
            tracing::debug!(pipeline = %kind, "audio already being generated");
            return ActionOutcome::Suppressed;
        }

        let (request, identifier, generation) = {
            let mut state = self.pipeline(kind).lock();
            let identifier = match (&state.summary, state.stage) {
                (Some(summary), Stage::Summarized | Stage::AudioReady) => summary.for_id.clone(),
                _ => {
                    let message = "Summarize a paper before requesting audio".to_string();
                    state.error = Some(message.clone());
                    return ActionOutcome::Rejected(message);
                }
            };
            let Some(request) = controller.try_begin(identifier.clone()) else {
                return ActionOutcome::Suppressed;
            };
            if let Some(text) = state.display_text.as_mut() {
                if !text.ends_with(AUDIO_PENDING_NOTICE) {
                    text.push_str(AUDIO_PENDING_NOTICE);
                }
            }
            (request, identifier, state.generation)
        };

        if kind == PipelineKind::Upload {
            self.wait_for_registrations().await;
        }

        let outcome = request.send().await;

        let mut state = self.pipeline(kind).lock();
        state.clear_pending_notice();
        if state.generation != generation && self.settings.discard_stale_responses {
            tracing::debug!(%identifier, "discarding stale audio response");
            drop(state);
            controller.reset();
            return ActionOutcome::Discarded;
        }

        // Late responses in naive mode only move the stage while the summary
        // they were requested for is still the one shown.
        let still_shown = state.summary.as_ref().map(|s| &s.for_id) == Some(&identifier)
            && matches!(state.stage, Stage::Summarized | Stage::AudioReady);

        match outcome {
            AudioOutcome::Suppressed => ActionOutcome::Suppressed,
            AudioOutcome::Ready { .. } => {
                if still_shown {
                    state.stage = Stage::AudioReady;
                    state.error = None;
                }
                ActionOutcome::Applied
            }
            AudioOutcome::Failed(message) => {
                if still_shown && state.stage == Stage::AudioReady {
                    state.stage = Stage::Summarized;
                }
                let message = format!("Audio generation failed: {}", message);
                state.error = Some(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    fn reject(&self, kind: PipelineKind, message: &str) -> ActionOutcome {
        self.pipeline(kind).lock().error = Some(message.to_string());
        ActionOutcome::Rejected(message.to_string())
    }
}

fn looks_like_pdf(file_name: &str, bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_SIGNATURE) || file_name.to_ascii_lowercase().ends_with(".pdf")
}
