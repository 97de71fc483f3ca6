//! Error types for gate fusion

use thiserror::Error;

/// Result type for fusion operations
pub type Result<T> = std::result::Result<T, FusionError>;

/// Errors raised while accumulating or materializing fused gates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    /// Matrix does not have the expected number of elements
    #[error("Matrix shape mismatch: expected {expected} elements, got {actual}")]
    MatrixShape { expected: usize, actual: usize },

    /// Matrix dimension does not match the number of target qubits
    #[error("Matrix of dimension {dim} cannot act on {targets} target qubit(s)")]
    DimensionMismatch { dim: usize, targets: usize },

    /// A qubit appears twice in the target or control list
    #[error("Qubit {qubit} is listed more than once")]
    DuplicateQubit { qubit: usize },

    /// A qubit is both a target and a control of the same gate
    #[error("Qubit {qubit} cannot be both a target and a control")]
    TargetIsControl { qubit: usize },

    /// A qubit index cannot be addressed by a bitmask
    #[error("Qubit {qubit} is out of range, indices must be below {limit}")]
    QubitOutOfRange { qubit: usize, limit: usize },

    /// The gate has no target qubits
    #[error("Gate has no target qubits")]
    NoTargets,

    /// Accumulated target count exceeds what the kernels can apply
    #[error("Fused operator spans {qubits} target qubits, the maximum is {max}")]
    CapacityExceeded { qubits: usize, max: usize },
}
