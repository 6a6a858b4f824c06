//! Action types and their prioritized keyword patterns.
//!
//! The pattern table is data, not code: classification and ROI defaults both
//! read from it, and tests can exercise the rules without any live UI.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The fixed set of recognized automatable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    AcceptAll,
    Accept,
    RunCommand,
    Run,
    Apply,
    Execute,
    Resume,
}

impl ActionType {
    /// All action types, in ascending priority order (lower priority wins
    /// classification ties).
    pub const ALL: [ActionType; 7] = [
        ActionType::AcceptAll,
        ActionType::Accept,
        ActionType::RunCommand,
        ActionType::Run,
        ActionType::Apply,
        ActionType::Execute,
        ActionType::Resume,
    ];

    /// The pattern entry for this action type.
    pub fn pattern(&self) -> &'static ActionPattern {
        &PATTERNS[self.index()]
    }

    fn index(&self) -> usize {
        ActionType::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    /// camelCase wire name, matching the persisted layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AcceptAll => "acceptAll",
            ActionType::Accept => "accept",
            ActionType::RunCommand => "runCommand",
            ActionType::Run => "run",
            ActionType::Apply => "apply",
            ActionType::Execute => "execute",
            ActionType::Resume => "resume",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown action type: {s:?}"))
    }
}

/// Classification and cost profile for one action type.
#[derive(Debug, Clone)]
pub struct ActionPattern {
    pub action: ActionType,
    /// Substrings matched against the lowercased search text. Order within a
    /// pattern does not matter; ordering *between* patterns does — "accept"
    /// must only be tested after "accept all" has had its chance.
    pub keywords: &'static [&'static str],
    /// Tie-break rank; lower wins.
    pub priority: u8,
    /// Milliseconds an equivalent manual interaction is assumed to cost
    /// before any samples exist.
    pub base_manual_cost_ms: f64,
    /// Relative interaction complexity weight.
    pub complexity: f64,
}

static PATTERNS: Lazy<[ActionPattern; 7]> = Lazy::new(|| {
    let table = [
        ActionPattern {
            action: ActionType::AcceptAll,
            keywords: &["accept all", "accept-all", "acceptall"],
            priority: 1,
            base_manual_cost_ms: 45_000.0,
            complexity: 2.5,
        },
        ActionPattern {
            action: ActionType::Accept,
            keywords: &["accept"],
            priority: 2,
            base_manual_cost_ms: 15_000.0,
            complexity: 1.0,
        },
        ActionPattern {
            action: ActionType::RunCommand,
            keywords: &["run command", "run-command"],
            priority: 3,
            base_manual_cost_ms: 25_000.0,
            complexity: 1.8,
        },
        ActionPattern {
            action: ActionType::Run,
            keywords: &["run"],
            priority: 4,
            base_manual_cost_ms: 20_000.0,
            complexity: 1.5,
        },
        ActionPattern {
            action: ActionType::Apply,
            keywords: &["apply"],
            priority: 5,
            base_manual_cost_ms: 12_000.0,
            complexity: 1.0,
        },
        ActionPattern {
            action: ActionType::Execute,
            keywords: &["execute"],
            priority: 6,
            base_manual_cost_ms: 18_000.0,
            complexity: 1.3,
        },
        ActionPattern {
            action: ActionType::Resume,
            keywords: &["resume", "continue"],
            priority: 7,
            base_manual_cost_ms: 8_000.0,
            complexity: 0.8,
        },
    ];
    debug_assert!(table.windows(2).all(|w| w[0].priority < w[1].priority));
    table
});

/// The full pattern table in ascending priority order.
pub fn patterns() -> &'static [ActionPattern] {
    &PATTERNS[..]
}

/// Every keyword across all patterns, for mutation-relevance filtering.
pub fn all_keywords() -> impl Iterator<Item = &'static str> {
    PATTERNS.iter().flat_map(|p| p.keywords.iter().copied())
}
