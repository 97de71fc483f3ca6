//! Error types for the simulator

use qfuse_backend::BackendError;
use qfuse_fusion::FusionError;
use qfuse_state::StateError;
use thiserror::Error;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimulatorError>;

/// Errors that can occur during simulation
///
/// Every error is returned before any amplitude is modified; a failed
/// dispatch leaves the state vector exactly as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    /// The requested backend cannot run in this session
    #[error("Configuration error: {0}")]
    Configuration(#[from] BackendError),

    /// Invalid simulator settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An operator or index space is larger than the kernels support
    #[error("Capacity exceeded: {what} is {requested}, limit is {limit}")]
    Capacity {
        what: &'static str,
        requested: usize,
        limit: usize,
    },

    /// Malformed operation (bad qubit, wrong matrix size, overlapping control)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Fusion error: {0}")]
    Fusion(FusionError),
}

impl SimulatorError {
    /// Whether continuing would risk silently wrong results
    ///
    /// Capacity errors are fatal; configuration errors can be recovered from
    /// by choosing another backend.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimulatorError::Capacity { .. } | SimulatorError::Fusion(FusionError::CapacityExceeded { .. })
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SimulatorError::Configuration(_) | SimulatorError::InvalidConfig(_))
    }
}

impl From<FusionError> for SimulatorError {
    fn from(err: FusionError) -> Self {
        match err {
            FusionError::CapacityExceeded { qubits, max } => SimulatorError::Capacity {
                what: "fused target count",
                requested: qubits,
                limit: max,
            },
            other => SimulatorError::Fusion(other),
        }
    }
}
