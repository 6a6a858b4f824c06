//! Search descriptors handed to the Element Locator.
//!
//! A descriptor names one strategy for finding elements; searches carry an
//! ordered set of them so that a host UI restructuring only invalidates the
//! most specific entries. The default sets below mirror the container shapes
//! this engine is typically pointed at.

/// One way to locate UI elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// Elements whose class list contains the given fragment.
    ClassContains(String),
    /// Elements with the given role attribute (e.g. "button").
    Role(String),
    /// Elements whose visible text contains the given fragment.
    Text(String),
    /// Elements carrying the given test id attribute.
    TestId(String),
    /// A raw host-specific query the locator passes through verbatim.
    Query(String),
    /// An unparseable descriptor string, with the reason.
    Invalid(String),
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::ClassContains(c) => write!(f, "class:{c}"),
            Descriptor::Role(r) => write!(f, "role:{r}"),
            Descriptor::Text(t) => write!(f, "text:{t}"),
            Descriptor::TestId(id) => write!(f, "testid:{id}"),
            Descriptor::Query(q) => write!(f, "query:{q}"),
            Descriptor::Invalid(reason) => write!(f, "invalid({reason})"),
        }
    }
}

impl From<&str> for Descriptor {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s {
            _ if s.to_lowercase().starts_with("class:") => {
                Descriptor::ClassContains(s["class:".len()..].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("role:") => {
                Descriptor::Role(s["role:".len()..].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("text:") => {
                Descriptor::Text(s["text:".len()..].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("testid:") => {
                Descriptor::TestId(s["testid:".len()..].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("query:") => {
                Descriptor::Query(s["query:".len()..].trim().to_string())
            }
            "" => Descriptor::Invalid("empty descriptor".to_string()),
            _ => Descriptor::Invalid(format!(
                "unknown descriptor format: {s:?}. Use prefixes 'class:', 'role:', 'text:', 'testid:', or 'query:'"
            )),
        }
    }
}

/// Descriptors for the containers that hold actionable affordances.
pub fn actionable_containers() -> Vec<Descriptor> {
    [
        "class:code-block",
        "class:tool-former",
        "class:diff",
        "role:button",
        "class:button",
    ]
    .into_iter()
    .map(Descriptor::from)
    .collect()
}

/// Descriptors for resume/continue links, which render outside the normal
/// button containers.
pub fn resume_links() -> Vec<Descriptor> {
    ["class:markdown-link", "text:resume", "text:continue"]
        .into_iter()
        .map(Descriptor::from)
        .collect()
}
