//! Error types for ferro-locus
//!
//! Every failure in the locus pipeline maps onto one [`LocusError`] variant.
//! Errors fall into three categories:
//! - local validation of user-supplied ranges (never reaches a remote call)
//! - upstream failures (transport, non-success status, timeout, undecodable body)
//! - soft data errors (the remote call succeeded but reported a data problem)
//!
//! Each variant carries a stable [`ErrorCode`] for programmatic handling.

use std::fmt;
use thiserror::Error;

use crate::coords::{signed_thousands, thousands};

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Validation errors (E1xxx)
    /// Gene has no external identifier
    MissingIdentifier = 1001,
    /// Range bounds are not integers
    InvalidRange = 1002,
    /// Start is not strictly before end
    StartNotBeforeEnd = 1003,
    /// Start lies below the gene's minimum bound
    BelowMinimum = 1004,
    /// End lies above the gene's maximum bound
    AboveMaximum = 1005,
    /// Requested window exceeds the maximum span
    RangeTooLarge = 1006,
    /// Substitution input is not usable
    InvalidSubstitution = 1007,

    // Upstream errors (E2xxx)
    /// Transport failure or non-success status
    UpstreamFailure = 2001,
    /// Remote call succeeded but reported a data problem
    SoftDataError = 2002,
    /// Response body did not match the expected record
    Decode = 2003,

    // Configuration errors (E9xxx)
    /// Configuration could not be loaded or is invalid
    Config = 9001,
}

impl ErrorCode {
    /// Get the error code as a string (e.g., "E1001")
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a brief description of this error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::MissingIdentifier => "gene identifier missing",
            ErrorCode::InvalidRange => "invalid coordinate range",
            ErrorCode::StartNotBeforeEnd => "start not before end",
            ErrorCode::BelowMinimum => "start below gene bound",
            ErrorCode::AboveMaximum => "end above gene bound",
            ErrorCode::RangeTooLarge => "range exceeds maximum window",
            ErrorCode::InvalidSubstitution => "invalid substitution",
            ErrorCode::UpstreamFailure => "upstream service failure",
            ErrorCode::SoftDataError => "upstream data error",
            ErrorCode::Decode => "undecodable upstream response",
            ErrorCode::Config => "configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for ferro-locus operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocusError {
    /// The selected gene carries no external identifier
    #[error("Gene id is missing for {symbol}, cannot fetch gene details")]
    MissingIdentifier { symbol: String },

    /// Start or end did not parse as an integer, or start is not positive
    #[error("Please enter a valid start and end position")]
    InvalidRange { start: String, end: String },

    /// Start must be strictly less than end
    #[error("Start position ({start}) must be less than end position ({end})")]
    StartNotBeforeEnd { start: i64, end: i64 },

    /// Start lies below the gene's minimum bound
    #[error(
        "Start position ({}) is below the minimum bound ({})",
        signed_thousands(*.start),
        thousands(*.min)
    )]
    BelowMinimum { start: i64, min: u64 },

    /// End lies above the gene's maximum bound
    #[error(
        "End position ({}) exceeds the maximum bound ({})",
        thousands(*.end),
        thousands(*.max)
    )]
    AboveMaximum { end: u64, max: u64 },

    /// The requested window spans more than the configured maximum
    #[error("Selected range exceeds maximum of {} bp", thousands(*.max))]
    RangeTooLarge { span: u64, max: u64 },

    /// A manual substitution request was not usable
    #[error("Invalid substitution: {msg}")]
    InvalidSubstitution { msg: String },

    /// Transport failure, non-success status or timeout from a remote call
    #[error("{service} request failed: {msg}")]
    UpstreamFailure { service: String, msg: String },

    /// The remote call succeeded but reported a data-level problem
    #[error("{msg}")]
    SoftDataError { msg: String },

    /// The remote body could not be decoded into its typed record
    #[error("Could not decode {service} response: {msg}")]
    Decode { service: String, msg: String },

    /// Configuration load or validation failure
    #[error("Configuration error: {msg}")]
    Config { msg: String },
}

impl LocusError {
    /// Build an upstream failure for a named service.
    pub fn upstream(service: impl Into<String>, msg: impl fmt::Display) -> Self {
        LocusError::UpstreamFailure {
            service: service.into(),
            msg: msg.to_string(),
        }
    }

    /// Build a decode failure for a named service.
    pub fn decode(service: impl Into<String>, msg: impl fmt::Display) -> Self {
        LocusError::Decode {
            service: service.into(),
            msg: msg.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            LocusError::MissingIdentifier { .. } => ErrorCode::MissingIdentifier,
            LocusError::InvalidRange { .. } => ErrorCode::InvalidRange,
            LocusError::StartNotBeforeEnd { .. } => ErrorCode::StartNotBeforeEnd,
            LocusError::BelowMinimum { .. } => ErrorCode::BelowMinimum,
            LocusError::AboveMaximum { .. } => ErrorCode::AboveMaximum,
            LocusError::RangeTooLarge { .. } => ErrorCode::RangeTooLarge,
            LocusError::InvalidSubstitution { .. } => ErrorCode::InvalidSubstitution,
            LocusError::UpstreamFailure { .. } => ErrorCode::UpstreamFailure,
            LocusError::SoftDataError { .. } => ErrorCode::SoftDataError,
            LocusError::Decode { .. } => ErrorCode::Decode,
            LocusError::Config { .. } => ErrorCode::Config,
        }
    }

    /// True for errors produced by local validation, before any remote call.
    pub fn is_validation(&self) -> bool {
        (self.code() as u16) < 2000
    }

    /// True for errors caused by a remote collaborator.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            LocusError::UpstreamFailure { .. } | LocusError::Decode { .. }
        )
    }
}

impl From<toml::de::Error> for LocusError {
    fn from(err: toml::de::Error) -> Self {
        LocusError::Config {
            msg: err.to_string(),
        }
    }
}

impl From<std::io::Error> for LocusError {
    fn from(err: std::io::Error) -> Self {
        LocusError::Config {
            msg: err.to_string(),
        }
    }
}
