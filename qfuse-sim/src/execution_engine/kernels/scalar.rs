//! Plain complex-arithmetic kernels
//!
//! One- and two-qubit groups dominate most circuits, so they get
//! hand-unrolled bodies; larger groups use the generic gather/multiply/scatter.

use super::{apply_group, GroupOperator, KernelTable};
use num_complex::Complex64;
use qfuse_state::{Arithmetic, ScalarArith};

pub static SCALAR_KERNELS: KernelTable = KernelTable {
    name: ScalarArith::NAME,
    pack: ScalarArith::pack,
    kernels: [
        [apply_1q::<false>, apply_1q::<true>],
        [apply_2q::<false>, apply_2q::<true>],
        [
            apply_group::<ScalarArith, 3, false>,
            apply_group::<ScalarArith, 3, true>,
        ],
        [
            apply_group::<ScalarArith, 4, false>,
            apply_group::<ScalarArith, 4, true>,
        ],
        [
            apply_group::<ScalarArith, 5, false>,
            apply_group::<ScalarArith, 5, true>,
        ],
    ],
};

/// # Safety
/// See [`super::GroupKernel`].
unsafe fn apply_1q<const CONTROLLED: bool>(state: *mut Complex64, base: usize, op: &GroupOperator<'_>) {
    if CONTROLLED && !op.controls_satisfied(base) {
        return;
    }
    let m = op.packed.data();
    let p0 = state.add(base);
    let p1 = state.add(base + op.offsets[1]);

    let v0 = *p0;
    let v1 = *p1;
    *p0 = m[0] * v0 + m[1] * v1;
    *p1 = m[2] * v0 + m[3] * v1;
}

/// # Safety
/// See [`super::GroupKernel`].
unsafe fn apply_2q<const CONTROLLED: bool>(state: *mut Complex64, base: usize, op: &GroupOperator<'_>) {
    if CONTROLLED && !op.controls_satisfied(base) {
        return;
    }
    let m = op.packed.data();
    let d0 = op.offsets[1];
    let d1 = op.offsets[2];

    let p0 = state.add(base);
    let p1 = state.add(base + d0);
    let p2 = state.add(base + d1);
    let p3 = state.add(base + d0 + d1);

    let v = [*p0, *p1, *p2, *p3];
    *p0 = m[0] * v[0] + m[1] * v[1] + m[2] * v[2] + m[3] * v[3];
    *p1 = m[4] * v[0] + m[5] * v[1] + m[6] * v[2] + m[7] * v[3];
    *p2 = m[8] * v[0] + m[9] * v[1] + m[10] * v[2] + m[11] * v[3];
    *p3 = m[12] * v[0] + m[13] * v[1] + m[14] * v[2] + m[15] * v[3];
}
