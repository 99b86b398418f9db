//! Core data models used throughout Paper Cast.
//!
//! These types represent the search results, summaries, identifiers, and
//! playback state that flow through the search → summarize → audio pipeline.

use serde::Serialize;
use std::fmt;

/// One candidate paper parsed from a search response.
///
/// `id` is the position the backend assigned in its response ordering. It is
/// only meaningful for the result set it came from and is the key used to
/// request a summary or audio clip for that result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultRecord {
    pub id: u64,
    pub title: String,
    /// Paper link, empty when the backend line carried none.
    pub link: String,
}

/// Key used to request a summary or audio clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A display-ready summary, tied to the identifier it was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    pub for_id: Identifier,
    pub text: String,
}

/// Where an upload-flow identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdentifierOrigin {
    /// Embedded by the backend in its response.
    Backend,
    /// Synthesized locally because the response carried none. The backend
    /// does not know it until it is registered via `/store-summary`.
    Fallback,
}

/// Parsed upload / summarize-direct response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub identifier: Identifier,
    pub summary: String,
    pub origin: IdentifierOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AudioStatus {
    #[default]
    Idle,
    Requesting,
    Ready,
    Failed,
}

/// Playback state of one pipeline's audio element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AudioPlaybackState {
    pub status: AudioStatus,
    /// Playable URL; always carries a `t=` cache-buster when set.
    pub url: Option<String>,
    pub for_identifier: Option<Identifier>,
    /// Decoded failure message when `status` is `Failed`.
    pub error: Option<String>,
}

/// Pipeline stage.
///
/// Errors are never a stage of their own: a failed action leaves the
/// pipeline at the last stage that succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Stage {
    #[default]
    Empty,
    Listed,
    Selected,
    Summarized,
    AudioReady,
}

/// Which of the two independent pipelines an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineKind {
    Search,
    Upload,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Search => f.write_str("search"),
            PipelineKind::Upload => f.write_str("upload"),
        }
    }
}

/// Snapshot of a pipeline handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineView {
    pub kind: PipelineKind,
    pub stage: Stage,
    /// Search results; always empty for the upload pipeline.
    pub results: Vec<SearchResultRecord>,
    pub selected_index: usize,
    pub summary: Option<SummaryRecord>,
    /// Text to display in the summary slot: the summary, possibly with a
    /// pending-audio notice appended, or a failure message.
    pub display_text: Option<String>,
    /// Last user-visible failure, cleared by the next successful action.
    pub error: Option<String>,
    pub audio: AudioPlaybackState,
}

impl PipelineView {
    pub fn selected(&self) -> Option<&SearchResultRecord> {
        self.results.get(self.selected_index)
    }
}

/// Result of an orchestrator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The response was applied to the pipeline.
    Applied,
    /// The backend call failed; the message is also recorded in the view.
    Failed(String),
    /// The response arrived after the pipeline moved on and was dropped.
    Discarded,
    /// Another request of the same kind was already in flight.
    Suppressed,
    /// The action was refused before any backend call (bad input or stage).
    Rejected(String),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}
