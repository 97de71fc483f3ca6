//! Dense matrix utilities for gate composition
//!
//! [`DenseMatrix`] is the square, row-major complex matrix that flows
//! through fusion and into the kernels. Besides the usual product and
//! adjoint it implements control padding: embedding a matrix as the
//! lower-right block of a block-diagonal operator whose upper-left block is
//! the identity.

use crate::error::{FusionError, Result};
use num_complex::Complex64;
use std::fmt;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Square complex matrix stored in row-major order
#[derive(Clone, PartialEq)]
pub struct DenseMatrix {
    dim: usize,
    data: Vec<Complex64>,
}

impl DenseMatrix {
    /// The `dim × dim` identity
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![ZERO; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = ONE;
        }
        Self { dim, data }
    }

    /// The `dim × dim` zero matrix
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![ZERO; dim * dim],
        }
    }

    /// Build from row-major elements; `data.len()` must be `dim * dim`
    pub fn from_row_major(dim: usize, data: Vec<Complex64>) -> Result<Self> {
        if data.len() != dim * dim {
            return Err(FusionError::MatrixShape {
                expected: dim * dim,
                actual: data.len(),
            });
        }
        Ok(Self { dim, data })
    }

    /// Build from a list of rows; every row must have as many entries as there are rows
    pub fn from_rows<R: AsRef<[Complex64]>>(rows: &[R]) -> Result<Self> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for row in rows {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(FusionError::MatrixShape {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { dim, data })
    }

    /// Row/column count
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of qubits the matrix acts on (`log2(dim)`), if `dim` is a power of two
    pub fn num_qubits(&self) -> Option<usize> {
        self.dim
            .is_power_of_two()
            .then(|| self.dim.trailing_zeros() as usize)
    }

    /// Element at (`row`, `col`)
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dim + col]
    }

    /// Overwrite the element at (`row`, `col`)
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.dim + col] = value;
    }

    /// Row-major elements
    #[inline]
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Consume into row-major elements
    pub fn into_vec(self) -> Vec<Complex64> {
        self.data
    }

    /// Matrix product `self × rhs`
    ///
    /// In gate order this is "apply `rhs`, then `self`".
    pub fn matmul(&self, rhs: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.dim, rhs.dim, "matmul of mismatched dimensions");
        let n = self.dim;
        let mut out = DenseMatrix::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.data[i * n + k];
                if a == ZERO {
                    continue;
                }
                for j in 0..n {
                    out.data[i * n + j] += a * rhs.data[k * n + j];
                }
            }
        }
        out
    }

    /// Conjugate transpose
    pub fn adjoint(&self) -> DenseMatrix {
        let n = self.dim;
        let mut out = DenseMatrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                out.data[j * n + i] = self.data[i * n + j].conj();
            }
        }
        out
    }

    /// Pad with `num_controls` control bits
    ///
    /// The result has dimension `2^num_controls * dim`; the new bits become
    /// the most significant bits of the local index. The operator acts as
    /// `self` when all new bits are set and as the identity otherwise.
    pub fn with_controls(&self, num_controls: usize) -> DenseMatrix {
        if num_controls == 0 {
            return self.clone();
        }
        let n = self.dim << num_controls;
        let offset = n - self.dim;
        let mut out = DenseMatrix::zeros(n);
        for i in 0..offset {
            out.data[i * n + i] = ONE;
        }
        for i in 0..self.dim {
            for j in 0..self.dim {
                out.data[(offset + i) * n + offset + j] = self.data[i * self.dim + j];
            }
        }
        out
    }

    /// Check if every element differs from `other` by at most `epsilon` (per component)
    pub fn approx_eq(&self, other: &DenseMatrix, epsilon: f64) -> bool {
        self.dim == other.dim
            && self.data.iter().zip(&other.data).all(|(a, b)| {
                (a.re - b.re).abs() <= epsilon && (a.im - b.im).abs() <= epsilon
            })
    }

    /// Check if the matrix is the identity within `epsilon`
    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.approx_eq(&DenseMatrix::identity(self.dim), epsilon)
    }

    /// Check if `self × self†` is the identity within `epsilon`
    pub fn is_unitary(&self, epsilon: f64) -> bool {
        self.matmul(&self.adjoint()).is_identity(epsilon)
    }
}

impl fmt::Debug for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DenseMatrix({}x{}) [", self.dim, self.dim)?;
        for row in self.data.chunks(self.dim.max(1)) {
            write!(f, "  ")?;
            for z in row {
                write!(f, "{:+.4}{:+.4}i ", z.re, z.im)?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

/// Common gate matrices
pub mod common {
    use super::*;

    fn m2(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> DenseMatrix {
        DenseMatrix {
            dim: 2,
            data: vec![a, b, c, d],
        }
    }

    pub fn identity() -> DenseMatrix {
        DenseMatrix::identity(2)
    }

    pub fn pauli_x() -> DenseMatrix {
        m2(ZERO, ONE, ONE, ZERO)
    }

    pub fn pauli_y() -> DenseMatrix {
        m2(ZERO, Complex64::new(0.0, -1.0), Complex64::new(0.0, 1.0), ZERO)
    }

    pub fn pauli_z() -> DenseMatrix {
        m2(ONE, ZERO, ZERO, -ONE)
    }

    pub fn hadamard() -> DenseMatrix {
        let h = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        m2(h, h, h, -h)
    }

    /// Phase gate `diag(1, e^{iθ})`
    pub fn phase(theta: f64) -> DenseMatrix {
        m2(ONE, ZERO, ZERO, Complex64::from_polar(1.0, theta))
    }

    pub fn rotation_x(theta: f64) -> DenseMatrix {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = Complex64::new(0.0, -(theta / 2.0).sin());
        m2(c, s, s, c)
    }

    pub fn rotation_y(theta: f64) -> DenseMatrix {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = Complex64::new((theta / 2.0).sin(), 0.0);
        m2(c, -s, s, c)
    }

    pub fn rotation_z(theta: f64) -> DenseMatrix {
        m2(
            Complex64::from_polar(1.0, -theta / 2.0),
            ZERO,
            ZERO,
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// SWAP on two qubits
    pub fn swap() -> DenseMatrix {
        let mut m = DenseMatrix::zeros(4);
        m.set(0, 0, ONE);
        m.set(1, 2, ONE);
        m.set(2, 1, ONE);
        m.set(3, 3, ONE);
        m
    }

    /// CNOT over local bits (bit 0 = control, bit 1 = target)
    pub fn cnot() -> DenseMatrix {
        let mut m = DenseMatrix::zeros(4);
        m.set(0, 0, ONE);
        m.set(2, 2, ONE);
        m.set(3, 1, ONE);
        m.set(1, 3, ONE);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_product() {
        let h = common::hadamard();
        let product = DenseMatrix::identity(2).matmul(&h);
        assert!(product.approx_eq(&h, 1e-12));
    }

    #[test]
    fn test_hadamard_squared_is_identity() {
        let h = common::hadamard();
        assert!(h.matmul(&h).is_identity(1e-10));
    }

    #[test]
    fn test_matmul_order() {
        // Z × X = iY
        let zx = common::pauli_z().matmul(&common::pauli_x());
        let y = common::pauli_y();
        let i = Complex64::new(0.0, 1.0);
        for r in 0..2 {
            for c in 0..2 {
                let expected = i * y.get(r, c);
                assert_relative_eq!(zx.get(r, c).re, expected.re, epsilon = 1e-12);
                assert_relative_eq!(zx.get(r, c).im, expected.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_adjoint() {
        let s = common::phase(std::f64::consts::FRAC_PI_2);
        let sdg = s.adjoint();
        assert_relative_eq!(sdg.get(1, 1).im, -1.0, epsilon = 1e-12);
        assert!(s.matmul(&sdg).is_identity(1e-12));
    }

    #[test]
    fn test_with_controls_builds_cnot() {
        // X padded with one control on the high bit: acts on bit 0 when bit 1 is set.
        let cx = common::pauli_x().with_controls(1);
        assert_eq!(cx.dim(), 4);
        assert_eq!(cx.get(0, 0), ONE);
        assert_eq!(cx.get(1, 1), ONE);
        assert_eq!(cx.get(2, 3), ONE);
        assert_eq!(cx.get(3, 2), ONE);
        assert_eq!(cx.get(2, 2), ZERO);
    }

    #[test]
    fn test_with_two_controls() {
        let ccz = common::pauli_z().with_controls(2);
        assert_eq!(ccz.dim(), 8);
        for i in 0..7 {
            assert_eq!(ccz.get(i, i), ONE);
        }
        assert_eq!(ccz.get(7, 7), -ONE);
        assert!(ccz.is_unitary(1e-12));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = vec![vec![ONE, ZERO], vec![ONE]];
        assert!(DenseMatrix::from_rows(&rows).is_err());
        assert!(DenseMatrix::from_row_major(2, vec![ONE; 3]).is_err());
    }

    #[test]
    fn test_num_qubits() {
        assert_eq!(DenseMatrix::identity(8).num_qubits(), Some(3));
        assert_eq!(DenseMatrix::identity(6).num_qubits(), None);
    }

    #[test]
    fn test_standard_gates_unitary() {
        for m in [
            common::pauli_x(),
            common::pauli_y(),
            common::pauli_z(),
            common::hadamard(),
            common::rotation_x(0.3),
            common::rotation_y(1.1),
            common::rotation_z(-0.7),
            common::swap(),
            common::cnot(),
        ] {
            assert!(m.is_unitary(1e-12));
        }
    }
}
