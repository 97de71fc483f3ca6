//! Dense quantum state storage for the qfuse simulator
//!
//! This crate owns the memory every kernel writes into: a contiguous,
//! 64-byte aligned vector of `2^n` complex amplitudes ([`StateVector`]).
//! It also provides the complex-arithmetic tiers the kernels are built on
//! ([`simd`]): a plain scalar implementation and packed real/imaginary
//! implementations for AVX2 (x86_64) and NEON (aarch64).
//!
//! # Example
//!
//! ```
//! use qfuse_state::StateVector;
//!
//! let state = StateVector::new(3).unwrap();
//! assert_eq!(state.dimension(), 8);
//! assert!(state.is_simd_aligned());
//! ```

pub mod error;
pub mod simd;
pub mod state_vector;

pub use error::{Result, StateError};
pub use simd::{Arithmetic, PackedMatrix, ScalarArith};
pub use state_vector::{StateVector, MAX_QUBITS, SIMD_ALIGNMENT};

#[cfg(target_arch = "x86_64")]
pub use simd::Avx2Arith;

#[cfg(target_arch = "aarch64")]
pub use simd::NeonArith;
