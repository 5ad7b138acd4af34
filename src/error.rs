//! Error taxonomy for the analytics kernel (§7).
//!
//! Three layers: per-component query failures that never abort a
//! snapshot ([`ComponentError`]), ingestion-boundary failures that drop a
//! single malformed event ([`IngestError`]), and a session-level error
//! that tears the whole session down ([`SessionError`]). `anyhow` is
//! layered on top at the process boundary (`main.rs`).

use thiserror::Error;

/// A single component's query failed to produce a value for this tick.
/// Modeled on this codebase's `report::SectionError`: each variant
/// carries enough context to render a short user-facing message, and the
/// snapshot assembler never propagates this past the component's own
/// section — it renders `{"error": msg}` instead.
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("feature not enabled: {0}")]
    FeatureNotEnabled(String),

    #[error("stale: {0}")]
    Stale(String),
}

impl ComponentError {
    pub fn insufficient_data(what: impl Into<String>) -> Self {
        Self::InsufficientData(what.into())
    }

    /// Short message suitable for the `{"error": "..."}` wire fallback.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Event rejected at the transport/ingestion boundary. The event is
/// dropped, a counter incremented, no component state is touched.
#[derive(Error, Debug, Clone)]
pub enum IngestError {
    #[error("malformed event: {0}")]
    Malformed(String),

    #[error("non-finite or non-positive value: {0}")]
    InvalidValue(String),
}

/// Configuration failure at process start.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Fatal, session-ending failure. The outbound channel is closed and the
/// session is torn down; callers observe end-of-stream.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("transport failed permanently: {0}")]
    TransportDied(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
