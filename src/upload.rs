//! Upload / summarize-direct response parsing.
//!
//! Both `POST /upload-pdf` and `POST /summarize-direct` answer with
//! `"<identifier>:<summary>"`, or with the bare summary when the backend did
//! not cache it under an identifier. In the bare case a fallback identifier
//! is synthesized here; the orchestrator then registers it with the backend
//! so a later audio request can resolve it.

use crate::models::{Identifier, IdentifierOrigin, UploadSummary};
use crate::stamp::next_stamp;

/// Parse an upload response, synthesizing an identifier from `fallback_prefix`
/// and the current time when the response carries none.
///
/// Everything before the first `:` is the identifier, everything after is the
/// summary. An empty identifier (response starting with `:`) is treated as
/// missing.
pub fn parse_upload_response(raw: &str, fallback_prefix: &str) -> UploadSummary {
    if let Some((id, summary)) = raw.split_once(':') {
        let id = id.trim();
        if !id.is_empty() {
            return UploadSummary {
                identifier: Identifier::new(id),
                summary: summary.trim().to_string(),
                origin: IdentifierOrigin::Backend,
            };
        }
        tracing::debug!("upload response has an empty identifier, synthesizing one");
        return fallback(summary, fallback_prefix);
    }

    fallback(raw, fallback_prefix)
}

fn fallback(summary: &str, prefix: &str) -> UploadSummary {
    let identifier = fallback_identifier(prefix);
    tracing::debug!(%identifier, "synthesized fallback identifier");
    UploadSummary {
        identifier,
        summary: summary.trim().to_string(),
        origin: IdentifierOrigin::Fallback,
    }
}

/// `prefix` followed by a millisecond timestamp, unique within the process.
pub fn fallback_identifier(prefix: &str) -> Identifier {
    Identifier::new(format!("{}{}", prefix, next_stamp()))
}
