//! Error types.
//!
//! Two layers:
//!
//! - [`TitrationError`] is returned by the pure core (simulation, transforms,
//!   derivatives, curve construction). It never carries I/O concerns.
//! - [`AppError`] is the binary boundary: a message plus a process exit code.
//!
//! Exit codes:
//! - `2` invalid input (parameters, unusable curves, files, CLI usage)
//! - `3` no usable data after ingest
//! - `4` numerical/domain failures and terminal errors

use thiserror::Error;

/// Errors raised by the titration core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TitrationError {
    /// Invalid or missing concentration, volume, dissociation constant or selection.
    #[error("invalid parameter: {message}")]
    Parameter { message: String },

    /// A closed-form branch produced (or would produce) a non-real value.
    #[error("domain error: {message}")]
    Domain { message: String },

    /// A curve violates the ordering/finiteness invariants and cannot be used.
    #[error("unusable curve: {message}")]
    Validation { message: String },
}

impl TitrationError {
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter {
            message: message.into(),
        }
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            TitrationError::Parameter { .. } | TitrationError::Validation { .. } => 2,
            TitrationError::Domain { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<TitrationError> for AppError {
    fn from(err: TitrationError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
