//! Error types for backend selection

use crate::backend::BackendKind;
use thiserror::Error;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised while resolving or using a kernel backend
///
/// All of them surface at selection time, before any simulation work, except
/// [`BackendError::OffloadFailed`] which an offload device may report from a
/// dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The requested name is not one of the known backends
    #[error("Unknown backend '{0}' (expected AUTO, SCALAR_SERIAL, SCALAR_THREADED, VECTOR_SERIAL, VECTOR_THREADED or OFFLOAD_<VENDOR>)")]
    UnknownBackend(String),

    /// The backend cannot be provided by this build or session
    #[error("Backend {0} is not supported")]
    Unsupported(BackendKind),

    /// The backend is supported but the running hardware cannot execute it
    #[error("Backend {kind} is not available: {reason}")]
    Unavailable { kind: BackendKind, reason: String },

    /// An offload device rejected or failed a dispatch
    #[error("Offload device failed: {0}")]
    OffloadFailed(String),
}
