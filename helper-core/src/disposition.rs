//! How each failure is absorbed at the boundary where it originates.
//!
//! No failure is fatal to a context: every error either becomes a log line,
//! a silent abort, a synthetic summary shown to the user, or a degraded but
//! still renderable outcome.

use crate::error::HelperError;

/// Disposition of an error within one analysis invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log the error and abort the invocation without touching the page
    LogOnly,
    /// Abort quietly; there is nothing to show
    SilentAbort,
    /// Replace the summary text with a description of the failure
    SurfaceAsSummary,
    /// Carry on with reduced functionality and log a notice
    Degrade,
    /// Not recoverable at runtime; needs operator action
    Fail,
}

impl Disposition {
    /// Determine the disposition for a given error
    pub fn for_error(error: &HelperError) -> Self {
        match error {
            HelperError::ExtractionUnavailable { .. }
            | HelperError::TabClosed { .. }
            | HelperError::BackgroundUnavailable => Disposition::LogOnly,

            HelperError::EmptyContent { .. } | HelperError::AlreadyRunning { .. } => {
                Disposition::SilentAbort
            }

            HelperError::Backend(_) => Disposition::SurfaceAsSummary,

            HelperError::InjectionTargetMissing { .. } => Disposition::Degrade,

            HelperError::Config(_) | HelperError::Io(_) | HelperError::Serialization(_) => {
                Disposition::Fail
            }
        }
    }

    /// Returns true if the user sees something on the page for this error
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Disposition::SurfaceAsSummary | Disposition::Degrade)
    }

    /// Returns true if the invocation stops without injecting anything
    pub fn aborts_invocation(&self) -> bool {
        matches!(self, Disposition::LogOnly | Disposition::SilentAbort)
    }
}
