//! Gate fusion for the qfuse simulator
//!
//! Consecutive gate operations are accumulated into a [`FusedOperator`]
//! and materialized on demand as one dense matrix over the union of their
//! target qubits ([`FusedGate`]). Controls shared by every accumulated gate
//! stay global and are applied as a bitmask by the kernel; any other
//! control is folded into the matrices as an extra target bit.
//!
//! # Example
//!
//! ```
//! use qfuse_fusion::{common, FusedOperator};
//!
//! let mut fusion = FusedOperator::new();
//! fusion.insert(common::pauli_x(), &[0], &[]).unwrap();
//! fusion.insert(common::pauli_x(), &[1], &[0]).unwrap();
//!
//! let fused = fusion.perform_fusion().unwrap();
//! assert_eq!(fused.targets(), &[0, 1]);
//! assert!(fused.controls().is_empty());
//! ```

pub mod error;
pub mod fusion;
pub mod matrix_utils;

pub use error::{FusionError, Result};
pub use fusion::{FusedGate, FusedOperator, Item, QubitList, MAX_FUSED_QUBITS};
pub use matrix_utils::{common, DenseMatrix};
