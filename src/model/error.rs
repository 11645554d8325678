//! Error types for property validation.
//!
//! Every variant is a construction-time or call-time validation failure;
//! a failed construction never leaves a partially-built collector behind.

use thiserror::Error;

/// Errors raised while building or querying a [`PropertyCollector`](crate::PropertyCollector).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    /// A required property name is missing from the construction input.
    #[error("missing required property '{name}'")]
    MissingRequired {
        /// Name of the absent property.
        name: String,
    },

    /// The input names a property that has no schema.
    #[error("property '{name}' is not supported (supported properties: {supported})")]
    Unsupported {
        /// The unrecognized name.
        name: String,
        /// Comma-separated list of schema names.
        supported: String,
    },

    /// A payload record is empty, malformed, or fails its schema validator.
    #[error("invalid payload for property '{name}': {detail}")]
    InvalidPayload {
        /// Name of the offending property.
        name: String,
        /// Description of the problem.
        detail: String,
    },

    /// An intra-site property's length disagrees with the site count.
    #[error("property '{name}' has {actual} entries but the structure has {expected} sites")]
    LengthMismatch {
        /// Name of the offending property.
        name: String,
        /// Site count defined by `positions`.
        expected: usize,
        /// Length actually provided.
        actual: usize,
    },

    /// A read accessor was called for a property that is not stored.
    #[error("property '{name}' is not set on this structure")]
    NotSet {
        /// Name of the absent property.
        name: String,
    },
}

impl PropertyError {
    pub(crate) fn missing_required(name: &str) -> Self {
        Self::MissingRequired {
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid_payload(name: &str, detail: impl Into<String>) -> Self {
        Self::InvalidPayload {
            name: name.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn length_mismatch(name: &str, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            name: name.to_string(),
            expected,
            actual,
        }
    }

    pub(crate) fn not_set(name: &str) -> Self {
        Self::NotSet {
            name: name.to_string(),
        }
    }
}
