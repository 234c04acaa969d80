//! Failure taxonomy for the risk engine.
//!
//! None of these reach the embedding application: every variant is absorbed at
//! the engine boundary and replaced by a safe default (neutral classification,
//! canned reply, fallback resources, empty history). They exist so internal
//! seams can report precisely what went wrong to the diagnostic channel before
//! the degradation path kicks in.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    /// The classification call failed or the response carried no usable payload.
    #[error("classification failed: {0}")]
    Classification(String),

    /// A generation call (greeting, reply, resources) failed or was unusable.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A persisted blob exists but cannot be decoded. Treated as a cache miss.
    #[error("stored payload unreadable: {0}")]
    CacheParse(#[from] serde_json::Error),

    /// The key-value collaborator failed a read or write.
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}
