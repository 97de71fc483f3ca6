//! Fused-gate state-vector simulator
//!
//! This crate evolves a dense state vector under streamed gate operations.
//! Consecutive gates are merged by a [`qfuse_fusion::FusedOperator`] and
//! applied in one pass by a kernel specialized for the fused target count,
//! with plain or vectorized complex arithmetic, on one thread or across a
//! rayon pool.
//!
//! # Features
//!
//! - **Gate fusion**: up to five target qubits per kernel dispatch
//! - **Kernel family**: `k = 1..=5`, controlled and uncontrolled, scalar and AVX2/NEON
//! - **Narrow counters**: the group sweep uses the smallest integer that covers the free bits
//! - **Backend selection**: `SIM_BACKEND` or automatic, checked before any work starts
//!
//! # Example
//!
//! ```
//! use qfuse_fusion::common;
//! use qfuse_sim::{Simulator, SimulatorConfig};
//!
//! let mut sim = Simulator::new(2, SimulatorConfig::threaded().with_seed(1)).unwrap();
//! sim.apply_gate(common::hadamard(), &[0], &[]).unwrap();
//! sim.apply_gate(common::pauli_x(), &[1], &[0]).unwrap();
//!
//! let outcome = sim.measure(&[0, 1]).unwrap();
//! assert_eq!(outcome[0], outcome[1]);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod execution_engine;
pub mod simulator;

pub use config::SimulatorConfig;
pub use dispatch::KernelDispatcher;
pub use error::{Result, SimulatorError};
pub use execution_engine::{IndexWidth, IterationGeometry, ParallelExecutor};
pub use simulator::Simulator;
