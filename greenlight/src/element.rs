//! Candidate elements and the locator capability boundary.
//!
//! The engine never walks a UI tree itself. A host-specific [`ElementLocator`]
//! resolves search descriptors into [`CandidateElement`] metadata snapshots
//! and performs the actual trigger; the core only reads the snapshots.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classifier;
use crate::descriptor::Descriptor;
use crate::errors::AutomationError;
use crate::ActionType;

/// Screen-space position of an element's bounding box origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Metadata snapshot of one observed UI node.
///
/// Owned by the locator; the core reads it and asks the locator to trigger
/// it, but never mutates it. All text fields are captured at observation
/// time — a re-render produces a new candidate, not an update to this one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateElement {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_names: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub title: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_interactable: bool,
}

impl CandidateElement {
    /// Minimal constructor used by locators and tests.
    pub fn new(tag: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            display_text: display_text.into(),
            is_visible: true,
            is_interactable: true,
            ..Default::default()
        }
    }

    pub fn with_classes(mut self, class_names: impl Into<String>) -> Self {
        self.class_names = class_names.into();
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn with_aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The lowercased text the classifier searches: visible text, accessible
    /// label, and title attribute concatenated.
    pub fn search_text(&self) -> String {
        let mut s = self.display_text.trim().to_lowercase();
        if let Some(label) = &self.aria_label {
            s.push(' ');
            s.push_str(&label.to_lowercase());
        }
        if let Some(title) = &self.title {
            s.push(' ');
            s.push_str(&title.to_lowercase());
        }
        s
    }
}

fn is_empty_string(opt: &Option<String>) -> bool {
    match opt {
        Some(s) => s.is_empty(),
        None => true,
    }
}

/// Logical target metadata the locator derived for an element, typically the
/// file a pending change applies to plus its diff statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub name: String,
    #[serde(default)]
    pub added_lines: u64,
    #[serde(default)]
    pub deleted_lines: u64,
}

/// Host-side capability for resolving descriptors to live elements and
/// performing trigger actions on them.
///
/// Implementations are expected to be cheap to clone behind an `Arc` and to
/// tolerate individual descriptors failing — a failed strategy means "try
/// the next one", not an aborted search.
#[async_trait]
pub trait ElementLocator: Send + Sync {
    /// First visible, interactable element matching any of the descriptors,
    /// in descriptor order.
    async fn find_first_visible_match(
        &self,
        descriptors: &[Descriptor],
    ) -> Result<Option<CandidateElement>, AutomationError>;

    /// All visible matches across the descriptor set.
    async fn find_all_matches(
        &self,
        descriptors: &[Descriptor],
    ) -> Result<Vec<CandidateElement>, AutomationError>;

    /// Target metadata for an element, when the host can derive it.
    /// `None` is a normal outcome, not an error.
    async fn find_target_context(
        &self,
        element: &CandidateElement,
    ) -> Result<Option<TargetInfo>, AutomationError>;

    /// Perform the trigger action on the element. This is the only
    /// externally-latent operation in the engine; callers time it.
    async fn trigger(&self, element: &CandidateElement) -> Result<(), AutomationError>;

    /// Classify an element into an action type via the shared rule table.
    fn classify(&self, element: &CandidateElement) -> Option<ActionType> {
        classifier::classify(element)
    }
}
