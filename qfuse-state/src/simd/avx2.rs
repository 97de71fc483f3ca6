//! AVX2 complex arithmetic (x86_64)
//!
//! Two complex numbers share one `__m256d` register as
//! `[re0, im0, re1, im1]`. The matrix is packed so that the elements of two
//! consecutive rows in the same column sit next to each other, which lets a
//! single multiply produce two output rows at once.

use super::{Arithmetic, PackedMatrix};
use num_complex::Complex64;
use std::arch::x86_64::*;

/// Packed AVX2 complex arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct Avx2Arith;

impl Arithmetic for Avx2Arith {
    const NAME: &'static str = "avx2";

    #[inline]
    fn is_supported() -> bool {
        is_x86_feature_detected!("avx2")
    }

    /// Interleave row pairs: element `(r, c)` lands at `((r / 2) * dim + c) * 2 + r % 2`
    fn pack(matrix: &[Complex64], dim: usize) -> PackedMatrix {
        let mut data = vec![Complex64::new(0.0, 0.0); dim * dim];
        for r in 0..dim {
            for c in 0..dim {
                data[((r / 2) * dim + c) * 2 + r % 2] = matrix[r * dim + c];
            }
        }
        PackedMatrix::new(dim, data)
    }

    #[inline]
    unsafe fn mat_vec(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]) {
        mat_vec_avx2(packed, input, output);
    }
}

/// Multiply two packed complex pairs by one broadcast complex scalar
///
/// Uses the 4-multiply decomposition folded into two multiplies plus one
/// `addsub`: `(a.re*b.re - a.im*b.im, a.im*b.re + a.re*b.im)`.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn complex_mul(a: __m256d, b_re: __m256d, b_im: __m256d) -> __m256d {
    let straight = _mm256_mul_pd(a, b_re); // [a.re*b.re, a.im*b.re, ...]
    let swapped = _mm256_permute_pd::<0b0101>(a); // [a.im, a.re, ...]
    let cross = _mm256_mul_pd(swapped, b_im); // [a.im*b.im, a.re*b.im, ...]
    _mm256_addsub_pd(straight, cross)
}

/// Compute `output = matrix × input` two rows at a time
///
/// # Safety
/// Requires AVX2; `packed` must come from [`Avx2Arith::pack`] with an even
/// dimension and both slices must hold `packed.dim()` elements.
#[target_feature(enable = "avx2")]
pub unsafe fn mat_vec_avx2(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]) {
    let dim = packed.dim();
    debug_assert!(dim % 2 == 0);
    debug_assert!(input.len() >= dim && output.len() >= dim);

    let m = packed.data().as_ptr() as *const f64;
    let out = output.as_mut_ptr() as *mut f64;

    for pair in 0..dim / 2 {
        let mut acc = _mm256_setzero_pd();
        for (c, v) in input.iter().take(dim).enumerate() {
            let a = _mm256_loadu_pd(m.add(((pair * dim + c) * 2) * 2));
            let v_re = _mm256_set1_pd(v.re);
            let v_im = _mm256_set1_pd(v.im);
            acc = _mm256_add_pd(acc, complex_mul(a, v_re, v_im));
        }
        // Rows 2*pair and 2*pair+1 are adjacent in `output`.
        _mm256_storeu_pd(out.add(pair * 4), acc);
    }
}
