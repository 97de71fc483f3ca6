//! Kernel family: dense `2^k × 2^k` operators applied to one amplitude group
//!
//! One kernel exists per combination of target count (`k = 1..=5`),
//! control mode and arithmetic tier. They are monomorphized from
//! [`apply_group`] (plus hand-unrolled scalar kernels for `k = 1, 2`) and
//! collected into one [`KernelTable`] per tier; [`KernelVariant`] picks the
//! entry at the single dispatch site.

use num_complex::Complex64;
use qfuse_fusion::MAX_FUSED_QUBITS;
use qfuse_state::{Arithmetic, PackedMatrix};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Largest local dimension, `2^MAX_FUSED_QUBITS`
pub const MAX_LOCAL_DIM: usize = 1 << MAX_FUSED_QUBITS;

// Raw pointer the sweep shares between workers. Groups touch disjoint
// amplitudes, so concurrent writes never alias.
#[derive(Copy, Clone)]
pub(crate) struct SendPtr<T>(*mut T);
unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    pub(crate) fn new(ptr: *mut T) -> Self {
        Self(ptr)
    }

    #[inline]
    pub(crate) fn get(self) -> *mut T {
        self.0
    }
}

/// Everything a kernel needs besides the state and the group's base index
pub struct GroupOperator<'a> {
    packed: &'a PackedMatrix,
    offsets: &'a [usize],
    control_mask: usize,
}

impl<'a> GroupOperator<'a> {
    /// `offsets[j]` is the distance from the base index to local amplitude `j`
    pub fn new(packed: &'a PackedMatrix, offsets: &'a [usize], control_mask: usize) -> Self {
        debug_assert_eq!(packed.dim(), offsets.len());
        Self {
            packed,
            offsets,
            control_mask,
        }
    }

    #[inline]
    fn controls_satisfied(&self, base: usize) -> bool {
        base & self.control_mask == self.control_mask
    }
}

/// Offset of every local amplitude from the group base
///
/// Local bit `l` of `j` selects `2^qubits[l]`.
pub fn gather_offsets(qubits: &[usize]) -> Vec<usize> {
    (0..1usize << qubits.len())
        .map(|j| {
            qubits
                .iter()
                .enumerate()
                .filter(|(l, _)| (j >> l) & 1 == 1)
                .fold(0, |acc, (_, &q)| acc | (1 << q))
        })
        .collect()
}

/// Apply the operator to the group at `base`
///
/// # Safety
/// `state` must be valid for reads and writes at `base + offset` for every
/// offset of `op`, no other thread may touch those amplitudes during the
/// call, and the table's arithmetic tier must be supported by the CPU.
pub type GroupKernel = unsafe fn(state: *mut Complex64, base: usize, op: &GroupOperator<'_>);

/// Kernels of one arithmetic tier, indexed by `[k - 1][controlled]`
pub struct KernelTable {
    pub name: &'static str,
    pub pack: fn(&[Complex64], usize) -> PackedMatrix,
    pub kernels: [[GroupKernel; 2]; MAX_FUSED_QUBITS],
}

impl KernelTable {
    pub fn kernel(&self, variant: KernelVariant) -> Option<GroupKernel> {
        let row = self.kernels.get(variant.qubits.checked_sub(1)?)?;
        Some(row[usize::from(variant.controlled)])
    }
}

/// Arithmetic used inside the kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticKind {
    Scalar,
    Vector,
}

/// Closed description of one kernel: target count, arithmetic and control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelVariant {
    pub qubits: usize,
    pub arith: ArithmeticKind,
    pub controlled: bool,
}

impl KernelVariant {
    /// The kernel for this variant, if the tier exists on the running CPU
    pub fn resolve(self) -> Option<(&'static KernelTable, GroupKernel)> {
        let table = match self.arith {
            ArithmeticKind::Scalar => &scalar::SCALAR_KERNELS,
            ArithmeticKind::Vector => vector::kernels()?,
        };
        table.kernel(self).map(|kernel| (table, kernel))
    }
}

/// Gather `2^K` amplitudes, multiply by the packed matrix, scatter back
///
/// # Safety
/// See [`GroupKernel`].
#[inline(always)]
pub(crate) unsafe fn apply_group<A: Arithmetic, const K: usize, const CONTROLLED: bool>(
    state: *mut Complex64,
    base: usize,
    op: &GroupOperator<'_>,
) {
    if CONTROLLED && !op.controls_satisfied(base) {
        return;
    }
    let dim = 1usize << K;
    let mut input = [ZERO; MAX_LOCAL_DIM];
    let mut output = [ZERO; MAX_LOCAL_DIM];

    for (slot, &offset) in input[..dim].iter_mut().zip(op.offsets) {
        *slot = *state.add(base + offset);
    }
    A::mat_vec(op.packed, &input[..dim], &mut output[..dim]);
    for (&value, &offset) in output[..dim].iter().zip(op.offsets) {
        *state.add(base + offset) = value;
    }
}

/// Build the table of a tier from the generic kernel
macro_rules! generic_table {
    ($arith:ty) => {
        $crate::execution_engine::kernels::KernelTable {
            name: <$arith as qfuse_state::Arithmetic>::NAME,
            pack: <$arith as qfuse_state::Arithmetic>::pack,
            kernels: [
                [
                    $crate::execution_engine::kernels::apply_group::<$arith, 1, false>,
                    $crate::execution_engine::kernels::apply_group::<$arith, 1, true>,
                ],
                [
                    $crate::execution_engine::kernels::apply_group::<$arith, 2, false>,
                    $crate::execution_engine::kernels::apply_group::<$arith, 2, true>,
                ],
                [
                    $crate::execution_engine::kernels::apply_group::<$arith, 3, false>,
                    $crate::execution_engine::kernels::apply_group::<$arith, 3, true>,
                ],
                [
                    $crate::execution_engine::kernels::apply_group::<$arith, 4, false>,
                    $crate::execution_engine::kernels::apply_group::<$arith, 4, true>,
                ],
                [
                    $crate::execution_engine::kernels::apply_group::<$arith, 5, false>,
                    $crate::execution_engine::kernels::apply_group::<$arith, 5, true>,
                ],
            ],
        }
    };
}
pub(crate) use generic_table;

pub mod scalar;
pub mod vector;
