//! Errors raised to the host.

use offload_work::WorkError;

/// Result type for native entry points.
pub type Result<T> = std::result::Result<T, AddonError>;

/// Host exception class an [`AddonError`] maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Generic `Error`
    Error,
    /// `TypeError`
    TypeError,
}

/// Errors reported synchronously to the caller of a native function.
#[derive(Debug, thiserror::Error)]
pub enum AddonError {
    /// Too few arguments
    #[error("{message}")]
    InvalidArgumentCount {
        /// Minimum number of arguments
        expected: usize,
        /// Number received
        actual: usize,
        /// Message shown to the script
        message: &'static str,
    },

    /// An argument has the wrong type
    #[error("{message}")]
    InvalidArgumentType {
        /// Zero-based index of the first offending argument
        position: usize,
        /// Expected host type
        expected: &'static str,
        /// Received host type
        actual: &'static str,
        /// Message shown to the script
        message: &'static str,
    },

    /// The work could not be scheduled
    #[error("failed to schedule work: {0}")]
    Dispatch(#[from] WorkError),
}

impl AddonError {
    /// Host exception class to throw.
    pub fn exception_kind(&self) -> ExceptionKind {
        match self {
            AddonError::InvalidArgumentType { .. } => ExceptionKind::TypeError,
            AddonError::InvalidArgumentCount { .. } | AddonError::Dispatch(_) => ExceptionKind::Error,
        }
    }
}
