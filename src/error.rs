use std::fmt;

use serde::Serialize;

/// Structured error type for show-graph construction. These are
/// configuration mistakes: they surface once, at startup, and are never
/// produced during per-tick evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum ShowError {
    /// Two lights, types, or parameters share a name.
    DuplicateName { what: String, name: String },
    /// A transition's start and end specs are identical, so it could
    /// never produce a visible change.
    IndistinguishableEndpoints { parameter: String },
    /// `ValueSpec::Start` is only meaningful as an end value.
    StartUsedAsStartValue { parameter: String },
    /// A sweep path needs two distinct endpoints.
    DegenerateSweep,
    /// A point path needs at least one point.
    EmptyPath,
}

impl fmt::Display for ShowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowError::DuplicateName { what, name } => {
                write!(f, "Duplicate {what} name: {name:?}")
            }
            ShowError::IndistinguishableEndpoints { parameter } => {
                write!(f, "Transition on {parameter:?} has identical start and end values")
            }
            ShowError::StartUsedAsStartValue { parameter } => {
                write!(f, "Transition on {parameter:?} uses START as its start value")
            }
            ShowError::DegenerateSweep => write!(f, "Sweep endpoints are identical"),
            ShowError::EmptyPath => write!(f, "Movement path has no points"),
        }
    }
}

impl std::error::Error for ShowError {}
