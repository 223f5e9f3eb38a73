// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::ActionError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure categories shared by probes, actions and the exposure step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    PermissionDenied,
    Timeout,
    Conflict,
    ServiceNotFound,
    InvalidInput,
    Unknown,
}

impl ErrorCategory {
    /// Fatal categories abort the remaining reconciliation queue
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCategory::PermissionDenied)
    }

    /// Map a Kubernetes API status code onto a category
    pub fn from_status_code(code: u16) -> Self {
        match code {
            401 | 403 => ErrorCategory::PermissionDenied,
            404 => ErrorCategory::NotFound,
            408 | 504 => ErrorCategory::Timeout,
            409 => ErrorCategory::Conflict,
            _ => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::PermissionDenied => "permission-denied",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::ServiceNotFound => "service-not-found",
            ErrorCategory::InvalidInput => "invalid-input",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("helm {command} failed ({category}): {message}")]
    HelmError {
        command: String,
        category: ErrorCategory,
        message: String,
    },

    #[error("Failed to run {tool}: {source}")]
    CommandError {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid resource registry: {0}")]
    InvalidRegistry(String),

    #[error("Failed to read secret source {}: {source}", path.display())]
    SecretSourceError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("None of the services {candidates:?} exist in namespace {namespace}")]
    ServiceNotFound {
        namespace: String,
        candidates: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prompt failed: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error("Exposing Argo CD failed: {0}")]
    ExposureFailed(ActionError),

    #[error("Fatal error while reconciling {resource}: {message}")]
    Fatal { resource: String, message: String },

    #[error("Watch failed: {0}")]
    WatchError(String),

    #[error("Infrastructure not ready: {0:?}")]
    InfrastructureNotReady(Vec<String>),
}

impl BootstrapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BootstrapError::KubeError(kube::Error::Api(resp)) => {
                ErrorCategory::from_status_code(resp.code)
            }
            BootstrapError::HelmError { category, .. } => *category,
            BootstrapError::ToolNotFound(_) => ErrorCategory::NotFound,
            BootstrapError::SecretSourceError { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => ErrorCategory::NotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCategory::PermissionDenied,
                _ => ErrorCategory::Unknown,
            },
            BootstrapError::ServiceNotFound { .. } => ErrorCategory::ServiceNotFound,
            BootstrapError::InvalidInput(_) | BootstrapError::InvalidRegistry(_) => {
                ErrorCategory::InvalidInput
            }
            BootstrapError::ExposureFailed(err) => err.category,
            BootstrapError::Fatal { .. } => ErrorCategory::PermissionDenied,
            _ => ErrorCategory::Unknown,
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
