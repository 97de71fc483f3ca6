//! Simulator configuration

use crate::error::{Result, SimulatorError};
use qfuse_backend::{BackendKind, BackendRequest, OffloadDevice};
use qfuse_fusion::MAX_FUSED_QUBITS;
use std::sync::Arc;

/// Configuration for a simulation session
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Requested kernel backend
    ///
    /// Default: [`BackendRequest::Auto`]
    pub backend: BackendRequest,

    /// Worker threads for threaded backends
    ///
    /// 0 uses the rayon default worker count (at least one).
    ///
    /// Default: 0
    pub num_threads: usize,

    /// Flush the fused operator as soon as it spans at least this many qubits
    ///
    /// Default: 4
    pub fusion_min_qubits: usize,

    /// Never let a fused operator span more than this many qubits
    ///
    /// Must not exceed the largest kernel size (5).
    ///
    /// Default: 5
    pub fusion_max_qubits: usize,

    /// Seed for measurement sampling; `None` seeds from the OS
    pub seed: Option<u64>,

    /// Accelerator made available to `OFFLOAD_<VENDOR>` and AUTO selection
    pub offload: Option<Arc<dyn OffloadDevice>>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            backend: BackendRequest::Auto,
            num_threads: 0,
            fusion_min_qubits: 4,
            fusion_max_qubits: MAX_FUSED_QUBITS,
            seed: None,
            offload: None,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-threaded scalar kernels
    pub fn serial() -> Self {
        Self {
            backend: BackendRequest::Explicit(BackendKind::ScalarSerial),
            num_threads: 1,
            ..Default::default()
        }
    }

    /// Best available backend on every core
    pub fn threaded() -> Self {
        Self::default()
    }

    /// Default settings with the backend read from `SIM_BACKEND`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            backend: BackendRequest::from_env()?,
            ..Default::default()
        })
    }

    pub fn with_backend(mut self, backend: impl Into<BackendRequest>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_fusion_range(mut self, min_qubits: usize, max_qubits: usize) -> Self {
        self.fusion_min_qubits = min_qubits;
        self.fusion_max_qubits = max_qubits;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_offload_device(mut self, device: Arc<dyn OffloadDevice>) -> Self {
        self.offload = Some(device);
        self
    }

    /// Worker count a threaded sweep will use
    pub fn effective_threads(&self) -> usize {
        if self.num_threads == 0 {
            rayon::current_num_threads().max(1)
        } else {
            self.num_threads
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.fusion_max_qubits == 0 || self.fusion_max_qubits > MAX_FUSED_QUBITS {
            return Err(SimulatorError::InvalidConfig(format!(
                "fusion_max_qubits must be in 1..={}, got {}",
                MAX_FUSED_QUBITS, self.fusion_max_qubits
            )));
        }
        if self.fusion_min_qubits == 0 || self.fusion_min_qubits > self.fusion_max_qubits {
            return Err(SimulatorError::InvalidConfig(format!(
                "fusion_min_qubits must be in 1..={}, got {}",
                self.fusion_max_qubits, self.fusion_min_qubits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulatorConfig::default();
        assert_eq!(config.backend, BackendRequest::Auto);
        assert_eq!(config.num_threads, 0);
        assert_eq!(config.fusion_min_qubits, 4);
        assert_eq!(config.fusion_max_qubits, 5);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_and_builders() {
        let serial = SimulatorConfig::serial();
        assert_eq!(serial.backend, BackendRequest::Explicit(BackendKind::ScalarSerial));
        assert_eq!(serial.effective_threads(), 1);

        let config = SimulatorConfig::threaded()
            .with_backend(BackendKind::VectorThreaded)
            .with_threads(3)
            .with_fusion_range(2, 3)
            .with_seed(42);
        assert_eq!(config.backend, BackendRequest::Explicit(BackendKind::VectorThreaded));
        assert_eq!(config.effective_threads(), 3);
        assert_eq!((config.fusion_min_qubits, config.fusion_max_qubits), (2, 3));
        assert_eq!(config.seed, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let invalid = SimulatorConfig::new().with_fusion_range(4, 6);
        assert!(invalid.validate().is_err());

        let invalid = SimulatorConfig::new().with_fusion_range(5, 4);
        assert!(invalid.validate().is_err());

        let invalid = SimulatorConfig::new().with_fusion_range(0, 4);
        assert!(invalid.validate().is_err());
    }
}
