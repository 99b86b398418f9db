//! # Paper Cast
//!
//! Search research papers, summarize one, and listen to the summary.
//!
//! Search, summarization, and speech synthesis run on a remote backend that
//! answers in a loose plain-text protocol. Paper Cast turns those responses
//! into typed records and drives the multi-stage workflow around them,
//! guarding against duplicate audio requests, stale responses, and stale
//! cached audio.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────┐   ┌─────────────┐
//! │   CLI    │──▶│ WorkflowOrchestrator │──▶│   Backend   │──▶ HTTP service
//! │ (pcast)  │   │ search / upload      │   │ (trait)     │
//! └──────────┘   └──────────┬───────────┘   └─────────────┘
//!                           │
//!          ┌────────────────┼─────────────────┐
//!          ▼                ▼                 ▼
//!    ┌──────────┐    ┌────────────┐    ┌──────────────┐
//!    │ parsers  │    │   audio    │    │   payload    │
//!    │ results/ │    │ single-    │    │ JSON-wrapped │
//!    │ summary/ │    │ flight     │    │ text         │
//!    │ upload   │    └────────────┘    └──────────────┘
//!    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pcast health
//! pcast search "diffusion models"
//! pcast run "attention transformers" --select 1 --audio --output bert.mp3
//! pcast upload --paper 2106.09685 --audio
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment override |
//! | [`models`] | Core data types |
//! | [`results`] | Search response parsing |
//! | [`summary`] | Summary marker stripping |
//! | [`upload`] | Upload response parsing and fallback identifiers |
//! | [`payload`] | JSON-wrapped text unwrapping |
//! | [`stamp`] | Monotonic millisecond stamps |
//! | [`backend`] | Backend trait and HTTP client |
//! | [`audio`] | Single-flight audio generation |
//! | [`orchestrator`] | Pipeline state machine |

pub mod audio;
pub mod backend;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod payload;
pub mod results;
pub mod stamp;
pub mod summary;
pub mod upload;
