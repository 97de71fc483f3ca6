//! State vector representation with aligned memory for SIMD kernels

use crate::error::{Result, StateError};
use num_complex::Complex64;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;

/// Alignment of the amplitude buffer (64 bytes, one cache line)
pub const SIMD_ALIGNMENT: usize = 64;

/// Largest qubit count a dense in-core state vector may hold
pub const MAX_QUBITS: usize = 34;

/// Quantum state vector with SIMD-aligned memory
///
/// The amplitude buffer always holds exactly `2^num_qubits` entries. It is
/// allocated once and mutated in place by every kernel dispatch for the
/// lifetime of the owning session.
///
/// # Example
///
/// ```
/// use qfuse_state::StateVector;
///
/// let state = StateVector::new(2).unwrap();
/// assert_eq!(state.num_qubits(), 2);
/// assert_eq!(state.dimension(), 4);
/// ```
pub struct StateVector {
    num_qubits: usize,
    dimension: usize,
    data: NonNull<Complex64>,
    layout: Layout,
}

impl StateVector {
    /// Create a new state vector initialized to |0...0⟩
    ///
    /// # Errors
    /// Returns an error if `num_qubits` exceeds [`MAX_QUBITS`] or the
    /// allocation fails.
    pub fn new(num_qubits: usize) -> Result<Self> {
        if num_qubits > MAX_QUBITS {
            return Err(StateError::TooManyQubits {
                num_qubits,
                max: MAX_QUBITS,
            });
        }

        let dimension = 1usize << num_qubits;
        let size = dimension * std::mem::size_of::<Complex64>();

        let layout = Layout::from_size_align(size, SIMD_ALIGNMENT)
            .map_err(|_| StateError::AllocationError { size })?;

        // SAFETY: `layout` has a non-zero size (dimension >= 1) and the
        // zeroed bit pattern is a valid `Complex64` (0.0 + 0.0i).
        let data = unsafe {
            let ptr = alloc_zeroed(layout) as *mut Complex64;
            let data = NonNull::new(ptr).ok_or(StateError::AllocationError {
                size: layout.size(),
            })?;
            data.as_ptr().write(Complex64::new(1.0, 0.0));
            data
        };

        Ok(Self {
            num_qubits,
            dimension,
            data,
            layout,
        })
    }

    /// Create a state vector from raw amplitude data
    ///
    /// The length of `amplitudes` must be a power of two; the qubit count is
    /// derived from it.
    pub fn from_amplitudes(amplitudes: &[Complex64]) -> Result<Self> {
        let dimension = amplitudes.len();
        if !dimension.is_power_of_two() {
            return Err(StateError::InvalidDimension { dimension });
        }

        let mut state = Self::new(dimension.trailing_zeros() as usize)?;
        state.amplitudes_mut().copy_from_slice(amplitudes);
        Ok(state)
    }

    /// Get the number of qubits
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Get the state dimension (2^num_qubits)
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get a reference to the state amplitudes
    #[inline]
    pub fn amplitudes(&self) -> &[Complex64] {
        // SAFETY: `data` points to `dimension` initialized amplitudes owned by self.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.dimension) }
    }

    /// Get a mutable reference to the state amplitudes
    #[inline]
    pub fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.dimension) }
    }

    /// Check if the buffer is aligned for SIMD loads
    #[inline]
    pub fn is_simd_aligned(&self) -> bool {
        (self.data.as_ptr() as usize) % SIMD_ALIGNMENT == 0
    }

    /// Overwrite all amplitudes
    ///
    /// # Errors
    /// Returns [`StateError::DimensionMismatch`] if the lengths differ.
    pub fn copy_from(&mut self, amplitudes: &[Complex64]) -> Result<()> {
        if amplitudes.len() != self.dimension {
            return Err(StateError::DimensionMismatch {
                expected: self.dimension,
                actual: amplitudes.len(),
            });
        }
        self.amplitudes_mut().copy_from_slice(amplitudes);
        Ok(())
    }

    /// Compute the L2 norm of the state vector
    pub fn norm(&self) -> f64 {
        self.amplitudes()
            .iter()
            .map(|a| a.norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    /// Scale all amplitudes so that the norm equals 1
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 1e-10 {
            let inv_norm = 1.0 / norm;
            for amplitude in self.amplitudes_mut() {
                *amplitude *= inv_norm;
            }
        }
    }

    /// Check if the state is normalized (|norm - 1| < epsilon)
    pub fn is_normalized(&self, epsilon: f64) -> bool {
        (self.norm() - 1.0).abs() < epsilon
    }

    /// Probability of measuring `qubit` in |1⟩
    pub fn probability_of_one(&self, qubit: usize) -> Result<f64> {
        self.check_qubit(qubit)?;
        let mask = 1usize << qubit;
        Ok(self
            .amplitudes()
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum())
    }

    /// Project onto the subspace where the bits in `mask` equal `value` and renormalize
    ///
    /// Returns the probability of the projected outcome before renormalization.
    pub fn collapse(&mut self, mask: usize, value: usize) -> f64 {
        let mut kept = 0.0;
        for (i, amplitude) in self.amplitudes_mut().iter_mut().enumerate() {
            if i & mask == value {
                kept += amplitude.norm_sqr();
            } else {
                *amplitude = Complex64::new(0.0, 0.0);
            }
        }
        if kept > 0.0 {
            let inv_norm = 1.0 / kept.sqrt();
            for amplitude in self.amplitudes_mut() {
                *amplitude *= inv_norm;
            }
        }
        kept
    }

    /// Reset the state to |0...0⟩
    pub fn reset(&mut self) {
        let amplitudes = self.amplitudes_mut();
        amplitudes.fill(Complex64::new(0.0, 0.0));
        amplitudes[0] = Complex64::new(1.0, 0.0);
    }

    /// Clone the state vector into a fresh aligned allocation
    pub fn clone_state(&self) -> Result<Self> {
        Self::from_amplitudes(self.amplitudes())
    }

    /// Ensure `qubit` is a valid index for this state
    pub fn check_qubit(&self, qubit: usize) -> Result<()> {
        if qubit >= self.num_qubits {
            return Err(StateError::InvalidQubitIndex {
                index: qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateVector")
            .field("num_qubits", &self.num_qubits)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl Drop for StateVector {
    fn drop(&mut self) {
        // SAFETY: `data` was allocated in `new` with exactly `layout`.
        unsafe {
            dealloc(self.data.as_ptr() as *mut u8, self.layout);
        }
    }
}

// Safety: StateVector owns its data and hands out access only through
// borrow-checked slices.
unsafe impl Send for StateVector {}
unsafe impl Sync for StateVector {}
