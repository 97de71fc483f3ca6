//! Kernel backend selection for qfuse
//!
//! This crate decides *how* a fused operator is applied to the state vector:
//! with plain or vectorized complex arithmetic, on one thread or on all of
//! them, or on an accelerator device.
//!
//! # Architecture
//!
//! - [`CpuCapabilities`] reports the instruction tier of the running CPU.
//! - [`BackendRequest`] is what the user asked for, usually read from the
//!   `SIM_BACKEND` environment variable.
//! - [`BackendSelector`] resolves a request into a [`SelectedBackend`], or
//!   fails with a [`BackendError`] before any simulation work starts.
//! - [`OffloadDevice`] is the seam for accelerator backends.

pub mod backend;
pub mod backend_selector;
pub mod capabilities;
pub mod error;
pub mod offload;

pub use backend::{BackendKind, BackendRequest, Vendor, BACKEND_ENV_VAR};
pub use backend_selector::{BackendSelector, SelectedBackend};
pub use capabilities::{CpuCapabilities, InstructionTier};
pub use error::{BackendError, Result};
pub use offload::OffloadDevice;
