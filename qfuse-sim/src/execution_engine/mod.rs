//! Execution engine: index partitioning, kernels and the parallel sweep
//!
//! - [`geometry`] maps a narrow free-bit counter to state-vector base indices
//! - [`kernels`] holds the dense small-matrix kernels, one table per arithmetic tier
//! - [`parallel`] runs a per-group callback over every counter value

pub mod geometry;
pub mod kernels;
pub mod parallel;

pub use geometry::{IndexWidth, IterationGeometry};
pub use kernels::{ArithmeticKind, KernelVariant};
pub use parallel::ParallelExecutor;
