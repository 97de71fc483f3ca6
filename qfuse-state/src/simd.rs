//! Complex-arithmetic tiers for dense small-matrix products
//!
//! Every kernel in the simulator reduces to the same inner operation: a
//! `dim × dim` complex matrix times a gathered vector of `dim` amplitudes.
//! This module provides that operation once per instruction tier behind the
//! [`Arithmetic`] trait:
//!
//! - [`ScalarArith`]: straightforward `num_complex` multiply/add, portable.
//! - `Avx2Arith` (x86_64): two complex numbers per 256-bit register, real and
//!   imaginary parts processed together with `addsub`.
//! - `NeonArith` (aarch64): one complex number per 128-bit register.
//!
//! All tiers agree with [`ScalarArith`] to within `1e-10` per component.
//! Tiers are picked at runtime by the caller after capability detection; no
//! kernel code branches on the target architecture.

pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "aarch64")]
pub mod neon;

pub use scalar::ScalarArith;

#[cfg(target_arch = "x86_64")]
pub use avx2::Avx2Arith;

#[cfg(target_arch = "aarch64")]
pub use neon::NeonArith;

use num_complex::Complex64;

/// A dense matrix laid out the way one arithmetic tier reads it
///
/// Produced once per dispatch by [`Arithmetic::pack`] and shared read-only
/// by every amplitude group of the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedMatrix {
    dim: usize,
    data: Vec<Complex64>,
}

impl PackedMatrix {
    pub(crate) fn new(dim: usize, data: Vec<Complex64>) -> Self {
        debug_assert_eq!(data.len(), dim * dim);
        Self { dim, data }
    }

    /// Row/column count of the matrix
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Packed elements in tier-specific order
    #[inline]
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }
}

/// One implementation of the dense complex matrix-vector product
pub trait Arithmetic: Send + Sync + 'static {
    /// Short name used in logs
    const NAME: &'static str;

    /// Whether the running CPU can execute this tier
    fn is_supported() -> bool;

    /// Rearrange a row-major `dim × dim` matrix for [`Arithmetic::mat_vec`]
    fn pack(matrix: &[Complex64], dim: usize) -> PackedMatrix;

    /// Compute `output = matrix × input`
    ///
    /// `input` and `output` must both hold exactly `packed.dim()` elements.
    ///
    /// # Safety
    /// The caller must have checked [`Arithmetic::is_supported`].
    unsafe fn mat_vec(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]);
}
