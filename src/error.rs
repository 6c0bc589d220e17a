//! # Error Handling
//!
//! This module defines the centralized error type for the option limiting
//! engine. It uses the `thiserror` library to describe every failure mode the
//! engine can report, with enough context to tell which field instance was
//! being processed.
//!
//! ## Policy states versus failures
//!
//! Several of the variants below describe *policy states* rather than hard
//! failures. The pipeline never returns them for a normal form build; it logs
//! them and degrades instead:
//!
//! - **`ConfigurationUnavailable`**: no common matching fields exist, so
//!   filtering is forced off.
//! - **`UnresolvedTarget`**: the reference field points at a kind with no
//!   resolvable bundles, so the option list is empty.
//! - **`MalformedConfiguration`**: stored matching-field names no longer
//!   exist, so they contribute no constraint.
//!
//! They exist as values so that the `check` command and the settings hooks can
//! report them. Only `StoreFailure` propagates out of option computation, and
//! only for the single field being processed.
//!
//! A routing miss on a partial update is not an error at all; the router
//! returns `RouterState::Ignored`.

use thiserror::Error;

/// Main error type for option limiting operations
#[derive(Error, Debug)]
pub enum Error {
    /// No field exists on both the owning bundle and a target bundle.
    #[error("No common matching fields for {entity_kind}.{bundle}.{field}")]
    ConfigurationUnavailable {
        entity_kind: String,
        bundle: String,
        field: String,
    },

    /// The reference field's target kind or bundles could not be resolved.
    #[error("Unresolved reference target for field {field}: {message}")]
    UnresolvedTarget { field: String, message: String },

    /// The entity store failed while querying or loading candidates.
    #[error("Entity store failure for {entity_kind}: {message}")]
    StoreFailure {
        entity_kind: String,
        message: String,
    },

    /// Stored matching-field names that no longer exist on the current bundles.
    #[error("Stale matching fields on {field}: {}", stale.join(", "))]
    MalformedConfiguration { field: String, stale: Vec<String> },

    /// A field was referenced that has no definition or instance.
    #[error("Unknown field: {entity_kind}.{bundle}.{field}")]
    UnknownField {
        entity_kind: String,
        bundle: String,
        field: String,
    },

    /// An entity was referenced that the store does not hold.
    #[error("Unknown entity: {entity_kind} {id}")]
    UnknownEntity { entity_kind: String, id: u64 },

    /// An error occurred while parsing a site definition file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Whether this error is a degraded policy state rather than a failure.
    pub fn is_policy_state(&self) -> bool {
        matches!(
            self,
            Error::ConfigurationUnavailable { .. }
                | Error::UnresolvedTarget { .. }
                | Error::MalformedConfiguration { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
