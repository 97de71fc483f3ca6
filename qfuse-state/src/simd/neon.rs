//! NEON complex arithmetic (aarch64)

use super::{Arithmetic, PackedMatrix};
use num_complex::Complex64;
use std::arch::aarch64::*;

/// NEON complex arithmetic, one complex number per `float64x2_t`
#[derive(Debug, Clone, Copy, Default)]
pub struct NeonArith;

impl Arithmetic for NeonArith {
    const NAME: &'static str = "neon";

    #[inline]
    fn is_supported() -> bool {
        std::arch::is_aarch64_feature_detected!("neon")
    }

    fn pack(matrix: &[Complex64], dim: usize) -> PackedMatrix {
        PackedMatrix::new(dim, matrix.to_vec())
    }

    #[inline]
    unsafe fn mat_vec(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]) {
        mat_vec_neon(packed, input, output);
    }
}

/// Compute `output = matrix × input` one row at a time
///
/// # Safety
/// Requires NEON; both slices must hold `packed.dim()` elements.
#[target_feature(enable = "neon")]
pub unsafe fn mat_vec_neon(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]) {
    let dim = packed.dim();
    let m = packed.data().as_ptr() as *const f64;
    let out = output.as_mut_ptr() as *mut f64;
    let sign_lanes = [-1.0f64, 1.0];
    let sign = vld1q_f64(sign_lanes.as_ptr());

    for r in 0..dim {
        let mut acc = vdupq_n_f64(0.0);
        for (c, v) in input.iter().take(dim).enumerate() {
            let a = vld1q_f64(m.add((r * dim + c) * 2)); // [a.re, a.im]
            let straight = vmulq_n_f64(a, v.re); // [a.re*b.re, a.im*b.re]
            let swapped = vextq_f64::<1>(a, a); // [a.im, a.re]
            let cross = vmulq_n_f64(swapped, v.im); // [a.im*b.im, a.re*b.im]
            acc = vaddq_f64(acc, vfmaq_f64(straight, cross, sign));
        }
        vst1q_f64(out.add(r * 2), acc);
    }
}
