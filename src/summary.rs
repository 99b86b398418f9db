//! Summary response normalization.
//!
//! `GET /summarize/{index}` returns free text in which the lines that belong
//! to the summary may be tagged with a `[SUMMARY]` marker. Normalization
//! strips the markers and blank lines so the text can be displayed as-is.

/// Marker token the backend puts in front of summary lines.
pub const SUMMARY_MARKER: &str = "[SUMMARY]";

/// Strip protocol markers from a raw summary response.
///
/// When at least one line starts with [`SUMMARY_MARKER`], every line is
/// trimmed, leading markers are removed, and lines left empty are dropped.
/// Without any marker the trimmed text is returned unchanged, paragraph
/// breaks included.
///
/// The output never starts a line with the marker, so normalizing twice
/// gives the same result as normalizing once.
pub fn normalize_summary(raw: &str) -> String {
    let has_marker = raw
        .lines()
        .any(|line| line.trim_start().starts_with(SUMMARY_MARKER));

    if !has_marker {
        return raw.trim().to_string();
    }

    raw.lines()
        .map(strip_markers)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_markers(line: &str) -> &str {
    let mut line = line.trim();
    while let Some(rest) = line.strip_prefix(SUMMARY_MARKER) {
        line = rest.trim_start();
    }
    line
}
