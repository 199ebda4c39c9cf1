//! Recipient line parsing and the address grammar
//!
//! The recipient line is a `;`-delimited string typed by the user. Each
//! edit rebuilds the committed set from scratch, and validation is
//! all-or-nothing: a single bad segment blanks the whole set, which is
//! what keeps the send gate closed until the line is fixed.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Segment separator in the recipient line
pub const RECIPIENT_DELIMITER: char = ';';

static ADDRESS_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w.\-]+)@([\w\-]+)((\.(\w){2,3})+)$").expect("address grammar compiles")
});

/// Check a single candidate against the address grammar.
///
/// Beyond the regex, a trailing `.` on the whole input or on the local
/// part is rejected explicitly, so `a.@b.com` and `a@b.com.` never pass.
pub fn is_valid_address(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.ends_with('.') {
        return false;
    }
    if let Some((local, _)) = candidate.split_once('@') {
        if local.ends_with('.') {
            return false;
        }
    }
    ADDRESS_GRAMMAR.is_match(candidate)
}

/// Rebuild the committed recipient set from a raw recipient line.
///
/// Splits on [`RECIPIENT_DELIMITER`] and trims each segment. If any
/// segment fails the grammar (an empty segment counts as a failure, so a
/// trailing `;` blanks the set) the whole set is empty. Duplicates are
/// dropped, keeping the first occurrence.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    let mut committed: Vec<String> = Vec::new();
    for segment in raw.split(RECIPIENT_DELIMITER) {
        let candidate = segment.trim();
        if !is_valid_address(candidate) {
            debug!(segment = candidate, "invalid recipient segment, clearing the set");
            return Vec::new();
        }
        if committed.iter().any(|existing| existing == candidate) {
            debug!(address = candidate, "duplicate recipient ignored");
            continue;
        }
        committed.push(candidate.to_string());
    }
    committed
}
