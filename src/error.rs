//! Hub error types.
//!
//! [`HubError`] is the central error type for the crate. Most failures it
//! describes never reach the host: the registry logs a failed integration
//! start and moves on, and an ad slot logs its load failures until the
//! retry budget runs out.

use crate::ads::AdKind;

/// Errors produced by integrations, vendor seams and configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// An integration's `start` failed.
    #[error("integration {integration} failed to start: {reason}")]
    StartFailed {
        /// Name of the integration.
        integration: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// An ad unit failed to load.
    #[error("{kind} load failed: {reason}")]
    LoadFailed {
        /// Ad kind whose load failed.
        kind: AdKind,
        /// Vendor-reported reason.
        reason: String,
    },

    /// An ad unit failed to render.
    #[error("presentation failed: {0}")]
    PresentationFailed(String),

    /// No tokio runtime is available to spawn background work on.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Opaque failure reported by a vendor SDK.
    #[error("vendor error: {0}")]
    Vendor(String),
}

impl HubError {
    /// Returns a short, stable identifier for this variant, used as a
    /// structured logging field.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::StartFailed { .. } => "start_failed",
            Self::LoadFailed { .. } => "load_failed",
            Self::PresentationFailed(_) => "presentation_failed",
            Self::NoRuntime => "no_runtime",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Vendor(_) => "vendor",
        }
    }
}
