//! Accelerator offload devices

use crate::backend::Vendor;
use crate::error::Result;
use num_complex::Complex64;
use std::fmt;

/// A device that can run the kernel entry point itself
///
/// Implementations receive the same arguments as the CPU dispatch, already
/// validated: `matrix` is row-major `2^k × 2^k` for `k = qubits.len() ≤ 5`,
/// entry `l` of `qubits` is local bit `l`, and no control in `control_mask`
/// is also a target. The call must either apply the whole operator or
/// return an error without touching `state`.
pub trait OffloadDevice: Send + Sync + fmt::Debug {
    fn vendor(&self) -> Vendor;

    /// Human-readable device name
    fn name(&self) -> &str;

    /// Whether the device can accept work right now
    fn is_available(&self) -> bool {
        true
    }

    /// Apply `matrix` to `state` over `qubits`, gated by `control_mask`
    fn apply(
        &self,
        state: &mut [Complex64],
        matrix: &[Complex64],
        control_mask: usize,
        qubits: &[usize],
    ) -> Result<()>;
}
