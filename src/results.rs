//! Search response parsing.
//!
//! The backend answers `POST /search` with free text, one candidate per line:
//!
//! ```text
//! 0: Attention Is All You Need - https://arxiv.org/abs/1706.03762
//! 1: BERT - https://arxiv.org/abs/1810.04805
//! ```
//!
//! Lines that do not look like `<digits>:<rest>` are chatter from the model
//! and are dropped without error. An empty result is a valid answer.

use crate::models::SearchResultRecord;

const LINK_SEPARATOR: &str = " - http";

/// Parse a raw search response into records, preserving line order.
///
/// Ids are taken verbatim from the response. A line whose id is not greater
/// than the previous accepted id (duplicate or out of order) is dropped, so
/// ids stay unique and in emission order. Gaps are kept as gaps.
pub fn parse_results(raw: &str) -> Vec<SearchResultRecord> {
    let mut records: Vec<SearchResultRecord> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(record) = parse_line(line) else {
            continue;
        };

        if let Some(last) = records.last() {
            if record.id <= last.id {
                tracing::debug!(id = record.id, previous = last.id, "dropping out-of-order result line");
                continue;
            }
        }

        tracing::debug!(id = record.id, title = %record.title, "parsed result line");
        records.push(record);
    }

    records
}

fn parse_line(line: &str) -> Option<SearchResultRecord> {
    let (digits, rest) = line.split_once(':')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: u64 = digits.parse().ok()?;

    let (title, link) = match rest.rfind(LINK_SEPARATOR) {
        // Keep "http" in the link: skip only " - ".
        Some(pos) => (&rest[..pos], rest[pos + 3..].trim()),
        None => (rest, ""),
    };

    Some(SearchResultRecord {
        id,
        title: title.trim().to_string(),
        link: link.to_string(),
    })
}
