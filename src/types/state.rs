// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{BootstrapError, ErrorCategory};
use std::fmt;

/// Result of probing one resource, recomputed on every pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Absent,
    Present,
    /// The probe itself failed
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ActionError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl From<&BootstrapError> for ActionError {
    fn from(err: &BootstrapError) -> Self {
        ActionError::new(err.category(), err.to_string())
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub applied: bool,
    pub error: Option<ActionError>,
}

impl ActionResult {
    pub fn skipped() -> Self {
        Self {
            applied: false,
            error: None,
        }
    }

    pub fn applied() -> Self {
        Self {
            applied: true,
            error: None,
        }
    }

    pub fn failed(error: ActionError) -> Self {
        Self {
            applied: false,
            error: Some(error),
        }
    }
}

/// Per-resource outcome collected for the run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Applied,
    Unknown(String),
    Blocked { dependency: String },
    Failed(ActionError),
    NotAttempted,
}

impl Outcome {
    /// Only satisfied resources unblock their dependents
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::Skipped | Outcome::Applied)
    }
}

impl From<ActionResult> for Outcome {
    fn from(result: ActionResult) -> Self {
        match result {
            ActionResult {
                error: Some(err), ..
            } => Outcome::Failed(err),
            ActionResult { applied: true, .. } => Outcome::Applied,
            ActionResult { applied: false, .. } => Outcome::Skipped,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped => f.write_str("skipped"),
            Outcome::Applied => f.write_str("applied"),
            Outcome::Unknown(reason) => write!(f, "unknown ({})", reason),
            Outcome::Blocked { dependency } => write!(f, "blocked by {}", dependency),
            Outcome::Failed(err) => write!(f, "failed ({})", err),
            Outcome::NotAttempted => f.write_str("not attempted"),
        }
    }
}

/// Argo CD initial admin password; never printed through `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential(String);

impl AdminCredential {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).trim_end().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminCredential(<redacted>)")
    }
}
