//! CPU capability detection
//!
//! Detection runs once per process; [`CpuCapabilities::detect`] memoizes the
//! probe. Sessions copy the result into their own context, and tests build
//! capabilities by hand to exercise selection on hardware they do not have.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Vector instruction tier, lowest to highest within an architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstructionTier {
    /// No usable vector extension
    Scalar,
    Sse2,
    Avx,
    Avx2,
    Avx512F,
    /// AArch64 Advanced SIMD
    Neon,
}

impl InstructionTier {
    /// Whether the vector kernels can run on this tier
    pub fn supports_vector_kernels(self) -> bool {
        matches!(self, Self::Avx2 | Self::Avx512F | Self::Neon)
    }
}

impl fmt::Display for InstructionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Sse2 => "sse2",
            Self::Avx => "avx",
            Self::Avx2 => "avx2",
            Self::Avx512F => "avx512f",
            Self::Neon => "neon",
        };
        f.write_str(name)
    }
}

/// What the executing CPU offers the kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCapabilities {
    /// Highest detected instruction tier
    pub tier: InstructionTier,

    /// Number of logical cores visible to the process
    pub logical_cores: usize,
}

impl CpuCapabilities {
    /// Probe the running CPU, once per process
    pub fn detect() -> Self {
        static DETECTED: OnceLock<CpuCapabilities> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let caps = Self::probe();
            tracing::debug!(tier = %caps.tier, cores = caps.logical_cores, "detected CPU capabilities");
            caps
        })
    }

    /// Capabilities of a CPU without vector support
    pub fn scalar_only() -> Self {
        Self {
            tier: InstructionTier::Scalar,
            logical_cores: 1,
        }
    }

    /// Capabilities reporting `tier`, with the detected core count
    pub fn with_tier(tier: InstructionTier) -> Self {
        Self {
            tier,
            logical_cores: logical_cores(),
        }
    }

    /// Whether the vector kernels may be selected
    pub fn supports_vector(&self) -> bool {
        self.tier.supports_vector_kernels()
    }

    fn probe() -> Self {
        Self {
            tier: detect_tier(),
            logical_cores: logical_cores(),
        }
    }
}

impl Default for CpuCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}

fn logical_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(target_arch = "x86_64")]
fn detect_tier() -> InstructionTier {
    if is_x86_feature_detected!("avx512f") {
        InstructionTier::Avx512F
    } else if is_x86_feature_detected!("avx2") {
        InstructionTier::Avx2
    } else if is_x86_feature_detected!("avx") {
        InstructionTier::Avx
    } else if is_x86_feature_detected!("sse2") {
        InstructionTier::Sse2
    } else {
        InstructionTier::Scalar
    }
}

#[cfg(target_arch = "aarch64")]
fn detect_tier() -> InstructionTier {
    if std::arch::is_aarch64_feature_detected!("neon") {
        InstructionTier::Neon
    } else {
        InstructionTier::Scalar
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_tier() -> InstructionTier {
    InstructionTier::Scalar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_is_memoized() {
        assert_eq!(CpuCapabilities::detect(), CpuCapabilities::detect());
        assert!(CpuCapabilities::detect().logical_cores >= 1);
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn test_detect_agrees_with_feature_macro() {
        let caps = CpuCapabilities::detect();
        assert_eq!(caps.supports_vector(), is_x86_feature_detected!("avx2"));
    }

    #[test]
    fn test_vector_tiers() {
        assert!(!CpuCapabilities::scalar_only().supports_vector());
        assert!(!InstructionTier::Avx.supports_vector_kernels());
        assert!(InstructionTier::Avx2.supports_vector_kernels());
        assert!(InstructionTier::Avx512F.supports_vector_kernels());
        assert!(InstructionTier::Neon.supports_vector_kernels());
    }

    #[test]
    fn test_capabilities_serialize() {
        let caps = CpuCapabilities {
            tier: InstructionTier::Avx2,
            logical_cores: 8,
        };
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"{"tier":"Avx2","logical_cores":8}"#);
    }
}
