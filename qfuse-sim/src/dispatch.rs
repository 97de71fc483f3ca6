//! The uniform kernel entry point
//!
//! [`KernelDispatcher::apply`] is the single place where a dense operator
//! meets the state vector. It validates the call, computes the iteration
//! geometry, resolves the kernel for `{target count, arithmetic, control
//! mode}` and sweeps every amplitude group. All validation, capacity checks
//! included, happens before the first amplitude is written.

use crate::error::{Result, SimulatorError};
use crate::execution_engine::geometry::IterationGeometry;
use crate::execution_engine::kernels::{gather_offsets, ArithmeticKind, GroupOperator, KernelVariant, SendPtr};
use crate::execution_engine::parallel::ParallelExecutor;
use num_complex::Complex64;
use qfuse_backend::{BackendError, BackendKind, OffloadDevice, SelectedBackend};
use qfuse_fusion::{DenseMatrix, FusedGate, MAX_FUSED_QUBITS};
use std::sync::Arc;

/// Applies dense operators to a state vector with one selected backend
#[derive(Debug)]
pub struct KernelDispatcher {
    kind: BackendKind,
    executor: ParallelExecutor,
    device: Option<Arc<dyn OffloadDevice>>,
}

impl KernelDispatcher {
    /// Dispatcher for `backend`, sweeping on `num_threads` workers when threaded
    ///
    /// # Errors
    /// [`SimulatorError::Configuration`] if the backend's kernels cannot run
    /// on this CPU.
    pub fn new(backend: &SelectedBackend, num_threads: usize) -> Result<Self> {
        let kind = backend.kind();
        if kind.is_vector() && crate::execution_engine::kernels::vector::kernels().is_none() {
            return Err(BackendError::Unavailable {
                kind,
                reason: "no vector kernels for this CPU".to_string(),
            }
            .into());
        }

        let device = match kind {
            BackendKind::Offload(_) => Some(backend.device().cloned().ok_or(BackendError::Unsupported(kind))?),
            _ => None,
        };

        let executor = if kind.is_threaded() {
            ParallelExecutor::threaded(num_threads)
        } else {
            ParallelExecutor::serial()
        };

        Ok(Self {
            kind,
            executor,
            device,
        })
    }

    /// Backend this dispatcher runs
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Threads a CPU sweep runs on
    pub fn num_threads(&self) -> usize {
        self.executor.num_threads()
    }

    /// Apply a fused gate
    pub fn apply_fused(&self, state: &mut [Complex64], gate: &FusedGate) -> Result<()> {
        self.apply(state, gate.matrix(), gate.control_mask(), gate.targets())
    }

    /// Apply `matrix` over `qubits` wherever every bit of `control_mask` is set
    ///
    /// Entry `l` of `qubits` is bit `l` of the matrix row/column index.
    ///
    /// # Errors
    /// - [`SimulatorError::InvalidOperation`] for a malformed call
    /// - [`SimulatorError::Capacity`] for more than five qubits or a too wide index space
    /// - [`SimulatorError::Configuration`] when an offload device fails
    pub fn apply(
        &self,
        state: &mut [Complex64],
        matrix: &DenseMatrix,
        control_mask: usize,
        qubits: &[usize],
    ) -> Result<()> {
        let num_qubits = validate_call(state, matrix, control_mask, qubits)?;
        let geometry = IterationGeometry::new(num_qubits, qubits)?;

        tracing::debug!(
            backend = %self.kind,
            qubits = qubits.len(),
            free_bits = geometry.free_bits(),
            width = %geometry.width(),
            controlled = control_mask != 0,
            "dispatching kernel"
        );

        if let Some(device) = &self.device {
            return device
                .apply(state, matrix.as_slice(), control_mask, qubits)
                .map_err(SimulatorError::from);
        }

        let variant = KernelVariant {
            qubits: qubits.len(),
            arith: if self.kind.is_vector() {
                ArithmeticKind::Vector
            } else {
                ArithmeticKind::Scalar
            },
            controlled: control_mask != 0,
        };
        let (table, kernel) = variant.resolve().ok_or_else(|| BackendError::Unavailable {
            kind: self.kind,
            reason: format!("no kernel for {:?}", variant),
        })?;

        let packed = (table.pack)(matrix.as_slice(), matrix.dim());
        let offsets = gather_offsets(qubits);
        let op = GroupOperator::new(&packed, &offsets, control_mask);
        let ptr = SendPtr::new(state.as_mut_ptr());

        // SAFETY: geometry yields base indices with every target bit clear,
        // one per group and each exactly once, so the 2^k amplitudes of
        // different groups never overlap and all lie inside `state`.
        // The vector table is only resolved when the CPU supports it.
        self.executor.sweep(geometry.width(), geometry.upper_bound(), |counter| unsafe {
            kernel(ptr.get(), geometry.base_index(counter), &op)
        })?;

        Ok(())
    }
}

/// Check a dispatch call, returning the state's qubit count
fn validate_call(state: &[Complex64], matrix: &DenseMatrix, control_mask: usize, qubits: &[usize]) -> Result<usize> {
    let len = state.len();
    if !len.is_power_of_two() {
        return Err(SimulatorError::InvalidOperation(format!(
            "state length {} is not a power of two",
            len
        )));
    }
    let num_qubits = len.trailing_zeros() as usize;

    if qubits.len() > MAX_FUSED_QUBITS {
        return Err(SimulatorError::Capacity {
            what: "target qubit count",
            requested: qubits.len(),
            limit: MAX_FUSED_QUBITS,
        });
    }
    if qubits.is_empty() || matrix.dim() != 1 << qubits.len() {
        return Err(SimulatorError::InvalidOperation(format!(
            "matrix of dimension {} does not act on {} qubits",
            matrix.dim(),
            qubits.len()
        )));
    }
    if control_mask >> num_qubits != 0 {
        return Err(SimulatorError::InvalidOperation(format!(
            "control mask {:#b} refers to qubits beyond {}",
            control_mask, num_qubits
        )));
    }

    let mut target_mask = 0usize;
    for &q in qubits {
        if q >= num_qubits {
            return Err(SimulatorError::InvalidOperation(format!(
                "target qubit {} out of range for {} qubits",
                q, num_qubits
            )));
        }
        if target_mask & (1 << q) != 0 {
            return Err(SimulatorError::InvalidOperation(format!("target qubit {} listed twice", q)));
        }
        target_mask |= 1 << q;
    }
    if target_mask & control_mask != 0 {
        return Err(SimulatorError::InvalidOperation(format!(
            "qubits {:#b} are both control and target",
            target_mask & control_mask
        )));
    }
    Ok(num_qubits)
}
