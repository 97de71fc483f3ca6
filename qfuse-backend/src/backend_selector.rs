//! Backend selection logic
//!
//! Resolves a [`BackendRequest`] against the CPU capabilities and the
//! registered offload devices. A backend is *supported* when this session
//! could provide it at all, and *available* when the running hardware can
//! execute it; both must hold, otherwise the request fails before any
//! simulation work begins. There is no silent fallback for explicit
//! requests.

use crate::backend::{BackendKind, BackendRequest, Vendor};
use crate::capabilities::{CpuCapabilities, InstructionTier};
use crate::error::{BackendError, Result};
use crate::offload::OffloadDevice;
use std::sync::Arc;

/// Outcome of a successful selection
#[derive(Debug, Clone)]
pub struct SelectedBackend {
    kind: BackendKind,
    tier: InstructionTier,
    device: Option<Arc<dyn OffloadDevice>>,
}

impl SelectedBackend {
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Instruction tier of the CPU the backend was selected on
    pub fn tier(&self) -> InstructionTier {
        self.tier
    }

    /// Device that runs the kernels, for offload backends
    pub fn device(&self) -> Option<&Arc<dyn OffloadDevice>> {
        self.device.as_ref()
    }
}

/// Backend selector for one simulation session
#[derive(Debug, Clone)]
pub struct BackendSelector {
    capabilities: CpuCapabilities,
    devices: Vec<Arc<dyn OffloadDevice>>,
}

impl BackendSelector {
    /// Create a selector for the given CPU
    pub fn new(capabilities: CpuCapabilities) -> Self {
        Self {
            capabilities,
            devices: Vec::new(),
        }
    }

    /// Create a selector for the running CPU
    pub fn detect() -> Self {
        Self::new(CpuCapabilities::detect())
    }

    /// Register an offload device
    pub fn register(&mut self, device: Arc<dyn OffloadDevice>) {
        self.devices.push(device);
    }

    pub fn capabilities(&self) -> &CpuCapabilities {
        &self.capabilities
    }

    /// Whether this session can provide `kind` at all
    pub fn is_supported(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::ScalarSerial | BackendKind::ScalarThreaded => true,
            BackendKind::VectorSerial | BackendKind::VectorThreaded => {
                cfg!(any(target_arch = "x86_64", target_arch = "aarch64"))
            },
            BackendKind::Offload(vendor) => self.device_for(vendor).is_some(),
        }
    }

    /// Check that `kind` can run here
    ///
    /// # Errors
    /// [`BackendError::Unsupported`] or [`BackendError::Unavailable`].
    pub fn check_available(&self, kind: BackendKind) -> Result<()> {
        if !self.is_supported(kind) {
            return Err(BackendError::Unsupported(kind));
        }
        match kind {
            BackendKind::VectorSerial | BackendKind::VectorThreaded if !self.capabilities.supports_vector() => {
                Err(BackendError::Unavailable {
                    kind,
                    reason: format!(
                        "CPU instruction tier {} lacks the vector extensions (AVX2 or NEON)",
                        self.capabilities.tier
                    ),
                })
            },
            BackendKind::Offload(vendor) if !self.has_available_device(vendor) => Err(BackendError::Unavailable {
                kind,
                reason: format!("no {} device is ready", vendor),
            }),
            _ => Ok(()),
        }
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        self.check_available(kind).is_ok()
    }

    /// Best backend for this machine: an available offload device, then
    /// vectorized threads, then scalar threads
    pub fn resolve_auto(&self) -> BackendKind {
        let offload = self
            .devices
            .iter()
            .find(|device| device.is_available())
            .map(|device| BackendKind::Offload(device.vendor()));

        offload.unwrap_or_else(|| {
            if self.is_available(BackendKind::VectorThreaded) {
                BackendKind::VectorThreaded
            } else {
                BackendKind::ScalarThreaded
            }
        })
    }

    /// Resolve `request` to a backend that can run here
    pub fn select(&self, request: BackendRequest) -> Result<SelectedBackend> {
        let kind = match request {
            BackendRequest::Auto => {
                let kind = self.resolve_auto();
                tracing::debug!(%kind, "resolved AUTO backend");
                kind
            },
            BackendRequest::Explicit(kind) => kind,
        };
        self.check_available(kind)?;

        let device = match kind {
            BackendKind::Offload(vendor) => self.available_device(vendor),
            _ => None,
        };
        tracing::debug!(%kind, tier = %self.capabilities.tier, "selected backend");

        Ok(SelectedBackend {
            kind,
            tier: self.capabilities.tier,
            device,
        })
    }

    /// Every backend that would pass [`BackendSelector::check_available`]
    pub fn available_backends(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<BackendKind> = BackendKind::CPU
            .into_iter()
            .filter(|&kind| self.is_available(kind))
            .collect();
        for device in &self.devices {
            let kind = BackendKind::Offload(device.vendor());
            if device.is_available() && !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    fn device_for(&self, vendor: Vendor) -> Option<&Arc<dyn OffloadDevice>> {
        self.devices.iter().find(|device| device.vendor() == vendor)
    }

    fn has_available_device(&self, vendor: Vendor) -> bool {
        self.available_device(vendor).is_some()
    }

    fn available_device(&self, vendor: Vendor) -> Option<Arc<dyn OffloadDevice>> {
        self.devices
            .iter()
            .find(|device| device.vendor() == vendor && device.is_available())
            .cloned()
    }
}
