//! Keyword classification of candidate elements.

use tracing::trace;

use crate::action::{patterns, ActionType};
use crate::element::CandidateElement;

/// Map a candidate element to an action type, or `None` when it matches no
/// known pattern.
///
/// Patterns are tested in ascending priority order so that ordering acts as
/// the tie-break: "accept all" is claimed before the broader "accept" ever
/// runs. A miss is a normal outcome and is not logged as an error.
pub fn classify(element: &CandidateElement) -> Option<ActionType> {
    let search_text = element.search_text();
    if search_text.is_empty() {
        return None;
    }
    classify_text(&search_text)
}

/// Classify pre-assembled lowercase search text. Split out so rule-table
/// tests can run without constructing elements.
pub fn classify_text(search_text: &str) -> Option<ActionType> {
    for pattern in patterns() {
        if pattern.keywords.iter().any(|kw| search_text.contains(kw)) {
            trace!(action = %pattern.action, "classified candidate");
            return Some(pattern.action);
        }
    }
    None
}
