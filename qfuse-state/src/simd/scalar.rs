//! Portable scalar complex arithmetic

use super::{Arithmetic, PackedMatrix};
use num_complex::Complex64;

/// Plain complex multiply/add using `num_complex`
///
/// This is the reference tier: every other tier is tested against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarArith;

impl Arithmetic for ScalarArith {
    const NAME: &'static str = "scalar";

    #[inline]
    fn is_supported() -> bool {
        true
    }

    fn pack(matrix: &[Complex64], dim: usize) -> PackedMatrix {
        PackedMatrix::new(dim, matrix.to_vec())
    }

    #[inline]
    unsafe fn mat_vec(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]) {
        mat_vec_scalar(packed, input, output);
    }
}

/// Row-major matrix-vector product
#[inline]
pub fn mat_vec_scalar(packed: &PackedMatrix, input: &[Complex64], output: &mut [Complex64]) {
    let dim = packed.dim();
    for (row, out) in packed.data().chunks_exact(dim).zip(output.iter_mut()) {
        let mut acc = Complex64::new(0.0, 0.0);
        for (m, v) in row.iter().zip(input) {
            acc += m * v;
        }
        *out = acc;
    }
}
