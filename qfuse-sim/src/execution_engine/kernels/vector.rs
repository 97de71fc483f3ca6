//! Vectorized complex-arithmetic kernels
//!
//! The tier is fixed by the target architecture (AVX2 on x86_64, NEON on
//! aarch64) and only handed out when the running CPU supports it.

use super::KernelTable;

#[cfg(target_arch = "x86_64")]
static VECTOR_KERNELS: KernelTable = super::generic_table!(qfuse_state::Avx2Arith);

#[cfg(target_arch = "aarch64")]
static VECTOR_KERNELS: KernelTable = super::generic_table!(qfuse_state::NeonArith);

/// Vector kernel table, if this CPU can run it
#[cfg(target_arch = "x86_64")]
pub fn kernels() -> Option<&'static KernelTable> {
    use qfuse_state::{Arithmetic, Avx2Arith};
    Avx2Arith::is_supported().then_some(&VECTOR_KERNELS)
}

/// Vector kernel table, if this CPU can run it
#[cfg(target_arch = "aarch64")]
pub fn kernels() -> Option<&'static KernelTable> {
    use qfuse_state::{Arithmetic, NeonArith};
    NeonArith::is_supported().then_some(&VECTOR_KERNELS)
}

/// Vector kernel table, if this CPU can run it
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub fn kernels() -> Option<&'static KernelTable> {
    None
}
