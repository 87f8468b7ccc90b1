//! Error types for targets verification.

use thiserror::Error;

/// Terminal failures of a verification run.
///
/// `process` returns at the first failure; outputs are only ever carried
/// inside a success verdict, so a caller can never observe half-verified
/// image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TargetsError {
    /// Grammar mismatch, read underflow, overlong field or bad hex digit.
    #[error("malformed targets metadata")]
    Json,

    /// The `_type` field named a role other than `Targets`.
    #[error("metadata role is not Targets")]
    WrongType,

    /// The document's expiry lies strictly in the past.
    #[error("targets metadata has expired")]
    Expired,

    /// The document's version runs backwards from the last accepted one.
    #[error("version {version} is older than already-accepted {previous}")]
    Downgrade {
        /// Version carried by the rejected document.
        version: u32,
        /// Version of the last accepted document.
        previous: u32,
    },

    /// More than one target entry addressed this ECU.
    #[error("duplicate target entry for this ECU")]
    DuplicateEcuTarget,

    /// The matching target entry carried no sha512 digest.
    #[error("matching target carries no sha512 digest")]
    MissingSha512,

    /// Fewer valid signatures than the configured threshold.
    #[error("{valid} valid signatures, {threshold} required")]
    SignatureThreshold {
        /// Signatures that verified over the signed bytes.
        valid: u32,
        /// Signatures the trust configuration requires.
        threshold: u32,
    },

    /// No verification context could be allocated (pool exhausted).
    #[error("out of verification contexts")]
    NoMemory,
}

/// Disjoint failure classes, for callers that route recovery by kind
/// rather than by individual code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The byte stream did not form a well-shaped document; refetching may
    /// help.
    Structural,
    /// The document was well-formed but violated a metadata predicate.
    Semantic,
    /// The document failed the signature threshold; treat it as hostile.
    Trust,
    /// A bounded resource ran out; retry after freeing.
    Resource,
}

impl TargetsError {
    /// The failure class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            TargetsError::Json => ErrorClass::Structural,
            TargetsError::WrongType
            | TargetsError::Expired
            | TargetsError::Downgrade { .. }
            | TargetsError::DuplicateEcuTarget
            | TargetsError::MissingSha512 => ErrorClass::Semantic,
            TargetsError::SignatureThreshold { .. } => ErrorClass::Trust,
            TargetsError::NoMemory => ErrorClass::Resource,
        }
    }
}

/// Rejected verifier configurations.
///
/// Raised at construction time, before any byte is read, so a verification
/// run can never start from an unsound trust setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The threshold must satisfy `1 <= threshold <= keys.len()`.
    #[error("threshold {threshold} outside 1..={num_keys}")]
    ThresholdOutOfRange {
        /// The rejected threshold.
        threshold: u32,
        /// Number of trusted keys supplied.
        num_keys: usize,
    },

    /// More trusted keys than signature slots.
    #[error("{num_keys} trusted keys exceed the {max} slot limit")]
    TooManyKeys {
        /// Number of trusted keys supplied.
        num_keys: usize,
        /// The slot limit.
        max: usize,
    },
}
