//! Simulation session

use crate::config::SimulatorConfig;
use crate::dispatch::KernelDispatcher;
use crate::error::{Result, SimulatorError};
use num_complex::Complex64;
use qfuse_backend::{BackendKind, BackendSelector, CpuCapabilities, InstructionTier};
use qfuse_fusion::{DenseMatrix, FusedOperator};
use qfuse_state::StateVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A state vector evolving under streamed gates
///
/// Gates are collected into a [`FusedOperator`] and applied in batches; any
/// read of the state applies the pending batch first, so observations always
/// reflect every gate passed to [`Simulator::apply_gate`].
///
/// # Example
///
/// ```
/// use qfuse_fusion::common;
/// use qfuse_sim::{Simulator, SimulatorConfig};
///
/// let mut sim = Simulator::new(3, SimulatorConfig::serial()).unwrap();
/// sim.apply_gate(common::pauli_x(), &[0], &[]).unwrap();
/// sim.apply_gate(common::pauli_x(), &[1], &[0]).unwrap();
///
/// let amplitude = sim.amplitude(0b011).unwrap();
/// assert!((amplitude.re - 1.0).abs() < 1e-12);
/// ```
pub struct Simulator {
    config: SimulatorConfig,
    state: StateVector,
    fused: FusedOperator,
    dispatcher: KernelDispatcher,
    tier: InstructionTier,
    rng: StdRng,
}

impl Simulator {
    /// Start a session on `num_qubits` qubits in |0...0⟩ on the running CPU
    ///
    /// # Errors
    /// Configuration errors for an invalid config or a backend that cannot run
    /// here; state errors when the state vector cannot be allocated.
    pub fn new(num_qubits: usize, config: SimulatorConfig) -> Result<Self> {
        Self::with_capabilities(num_qubits, config, CpuCapabilities::detect())
    }

    /// Start a session with the backend taken from `SIM_BACKEND`
    pub fn from_env(num_qubits: usize) -> Result<Self> {
        Self::new(num_qubits, SimulatorConfig::from_env()?)
    }

    /// Start a session as if running on a CPU with `capabilities`
    pub fn with_capabilities(num_qubits: usize, config: SimulatorConfig, capabilities: CpuCapabilities) -> Result<Self> {
        config.validate()?;

        let mut selector = BackendSelector::new(capabilities);
        if let Some(device) = &config.offload {
            selector.register(device.clone());
        }
        let backend = selector.select(config.backend)?;
        let dispatcher = KernelDispatcher::new(&backend, config.num_threads)?;
        let state = StateVector::new(num_qubits)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(
            num_qubits,
            backend = %dispatcher.kind(),
            tier = %backend.tier(),
            threads = dispatcher.num_threads(),
            "simulator session started"
        );

        Ok(Self {
            fused: FusedOperator::with_max_qubits(config.fusion_max_qubits),
            config,
            state,
            dispatcher,
            tier: backend.tier(),
            rng,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.state.num_qubits()
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Backend the session dispatches to
    pub fn backend(&self) -> BackendKind {
        self.dispatcher.kind()
    }

    /// Instruction tier of the CPU the backend was selected on
    pub fn instruction_tier(&self) -> InstructionTier {
        self.tier
    }

    /// Worker threads used by kernel sweeps
    pub fn num_threads(&self) -> usize {
        self.dispatcher.num_threads()
    }

    /// Number of gates waiting in the fused operator
    pub fn pending_gates(&self) -> usize {
        self.fused.len()
    }

    /// Queue a gate: `matrix` over `targets`, applied only where all `controls` are |1⟩
    ///
    /// Entry `l` of `targets` is bit `l` of the matrix index. The gate may be
    /// applied immediately or merged with later gates.
    pub fn apply_gate(&mut self, matrix: DenseMatrix, targets: &[usize], controls: &[usize]) -> Result<()> {
        let max = self.config.fusion_max_qubits;
        if targets.len() > max {
            return Err(SimulatorError::Capacity {
                what: "gate target count",
                requested: targets.len(),
                limit: max,
            });
        }
        for &q in targets.iter().chain(controls) {
            self.state.check_qubit(q)?;
        }

        let mut trial = self.fused.clone();
        trial.insert(matrix.clone(), targets, controls)?;
        let fused_qubits = trial.num_qubits();

        if (self.config.fusion_min_qubits..=max).contains(&fused_qubits) {
            self.fused = trial;
            self.run()
        } else if fused_qubits > max || fused_qubits - targets.len() > self.fused.num_qubits() {
            self.run()?;
            self.fused.insert(matrix, targets, controls)?;
            Ok(())
        } else {
            self.fused = trial;
            Ok(())
        }
    }

    /// Apply every pending gate to the state
    pub fn run(&mut self) -> Result<()> {
        if self.fused.is_empty() {
            return Ok(());
        }
        let gate = self.fused.perform_fusion()?;
        self.dispatcher.apply_fused(self.state.amplitudes_mut(), &gate)?;
        self.fused.clear();
        Ok(())
    }

    /// Amplitude of basis state `index`
    pub fn amplitude(&mut self, index: usize) -> Result<Complex64> {
        self.run()?;
        self.state.amplitudes().get(index).copied().ok_or_else(|| {
            SimulatorError::InvalidOperation(format!(
                "basis index {} out of range for {} qubits",
                index,
                self.num_qubits()
            ))
        })
    }

    /// Snapshot of all amplitudes
    pub fn state(&mut self) -> Result<Vec<Complex64>> {
        self.run()?;
        Ok(self.state.amplitudes().to_vec())
    }

    /// Replace the state with `amplitudes`, which must be normalized and of matching length
    pub fn set_state(&mut self, amplitudes: &[Complex64]) -> Result<()> {
        self.run()?;
        let norm = amplitudes.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        if (norm - 1.0).abs() > 1e-10 {
            return Err(qfuse_state::StateError::NotNormalized { norm }.into());
        }
        self.state.copy_from(amplitudes)?;
        Ok(())
    }

    /// Return to |0...0⟩, dropping pending gates
    pub fn reset(&mut self) {
        self.fused.clear();
        self.state.reset();
    }

    /// Probability that `qubit` is measured as 1
    pub fn probability_of_one(&mut self, qubit: usize) -> Result<f64> {
        self.run()?;
        Ok(self.state.probability_of_one(qubit)?)
    }

    /// Whether `qubit` is in a basis state up to `tolerance`
    pub fn is_classical(&mut self, qubit: usize, tolerance: f64) -> Result<bool> {
        Ok(self.classical_value(qubit, tolerance)?.is_some())
    }

    /// Value of `qubit` if it is in a basis state up to `tolerance`
    pub fn classical_value(&mut self, qubit: usize, tolerance: f64) -> Result<Option<bool>> {
        let p1 = self.probability_of_one(qubit)?;
        Ok(if p1 <= tolerance {
            Some(false)
        } else if p1 >= 1.0 - tolerance {
            Some(true)
        } else {
            None
        })
    }

    /// Measure `qubits` jointly, collapsing the state
    ///
    /// One basis state is sampled from the full distribution; the outcome of
    /// every listed qubit is read from it and the state is projected onto
    /// that outcome.
    pub fn measure(&mut self, qubits: &[usize]) -> Result<Vec<bool>> {
        self.run()?;
        for &q in qubits {
            self.state.check_qubit(q)?;
        }

        let sample: f64 = self.rng.gen();
        let amplitudes = self.state.amplitudes();
        let mut cumulative = 0.0;
        let mut picked = amplitudes.len() - 1;
        for (index, amplitude) in amplitudes.iter().enumerate() {
            cumulative += amplitude.norm_sqr();
            if sample < cumulative {
                picked = index;
                break;
            }
        }

        let mask = qubits.iter().fold(0usize, |m, &q| m | (1 << q));
        let outcome: Vec<bool> = qubits.iter().map(|&q| (picked >> q) & 1 == 1).collect();
        self.state.collapse(mask, picked & mask);

        tracing::trace!(?qubits, ?outcome, "measured");
        Ok(outcome)
    }
}
