//! Backend kinds and how they are requested

use crate::error::{BackendError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable holding the requested backend
pub const BACKEND_ENV_VAR: &str = "SIM_BACKEND";

/// Accelerator vendor of an offload backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Nvidia,
    Intel,
    Amd,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Nvidia => write!(f, "NVIDIA"),
            Vendor::Intel => write!(f, "INTEL"),
            Vendor::Amd => write!(f, "AMD"),
        }
    }
}

impl FromStr for Vendor {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NVIDIA" => Ok(Vendor::Nvidia),
            "INTEL" => Ok(Vendor::Intel),
            "AMD" => Ok(Vendor::Amd),
            other => Err(BackendError::UnknownBackend(format!("OFFLOAD_{}", other))),
        }
    }
}

/// A concrete implementation of the kernel entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Plain complex arithmetic, one thread
    ScalarSerial,

    /// Plain complex arithmetic, fork-join over all workers
    ScalarThreaded,

    /// Vectorized complex arithmetic, one thread
    VectorSerial,

    /// Vectorized complex arithmetic, fork-join over all workers
    VectorThreaded,

    /// Dispatch handed to an accelerator device
    Offload(Vendor),
}

impl BackendKind {
    /// Every CPU backend, in ascending order of preference
    pub const CPU: [BackendKind; 4] = [
        BackendKind::ScalarSerial,
        BackendKind::ScalarThreaded,
        BackendKind::VectorSerial,
        BackendKind::VectorThreaded,
    ];

    /// Whether the amplitude-group sweep fans out across worker threads
    pub fn is_threaded(self) -> bool {
        matches!(self, BackendKind::ScalarThreaded | BackendKind::VectorThreaded)
    }

    /// Whether the kernels use vectorized complex arithmetic
    pub fn is_vector(self) -> bool {
        matches!(self, BackendKind::VectorSerial | BackendKind::VectorThreaded)
    }

    pub fn is_offload(self) -> bool {
        matches!(self, BackendKind::Offload(_))
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::ScalarSerial => write!(f, "SCALAR_SERIAL"),
            BackendKind::ScalarThreaded => write!(f, "SCALAR_THREADED"),
            BackendKind::VectorSerial => write!(f, "VECTOR_SERIAL"),
            BackendKind::VectorThreaded => write!(f, "VECTOR_THREADED"),
            BackendKind::Offload(vendor) => write!(f, "OFFLOAD_{}", vendor),
        }
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SCALAR_SERIAL" => Ok(BackendKind::ScalarSerial),
            "SCALAR_THREADED" => Ok(BackendKind::ScalarThreaded),
            "VECTOR_SERIAL" => Ok(BackendKind::VectorSerial),
            "VECTOR_THREADED" => Ok(BackendKind::VectorThreaded),
            other => match other.strip_prefix("OFFLOAD_") {
                Some(vendor) => Ok(BackendKind::Offload(vendor.parse()?)),
                None => Err(BackendError::UnknownBackend(other.to_string())),
            },
        }
    }
}

/// A backend request: automatic selection or one explicit kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendRequest {
    /// Best backend available on this machine
    #[default]
    Auto,

    Explicit(BackendKind),
}

impl BackendRequest {
    /// Read [`BACKEND_ENV_VAR`]; unset or empty means [`BackendRequest::Auto`]
    ///
    /// # Errors
    /// [`BackendError::UnknownBackend`] for any unrecognised value.
    pub fn from_env() -> Result<Self> {
        match std::env::var(BACKEND_ENV_VAR) {
            Ok(value) => Self::from_env_value(Some(&value)),
            Err(std::env::VarError::NotPresent) => Self::from_env_value(None),
            Err(std::env::VarError::NotUnicode(raw)) => {
                let value = raw.to_string_lossy().into_owned();
                tracing::warn!(%value, "{} is not valid unicode", BACKEND_ENV_VAR);
                Err(BackendError::UnknownBackend(value))
            },
        }
    }

    /// Parse an optional environment value the way [`BackendRequest::from_env`] does
    pub fn from_env_value(value: Option<&str>) -> Result<Self> {
        let value = match value.map(str::trim) {
            None | Some("") => return Ok(BackendRequest::Auto),
            Some(value) => value,
        };
        value.parse().map_err(|err| {
            tracing::warn!(value, "unrecognised {} value", BACKEND_ENV_VAR);
            err
        })
    }
}

impl FromStr for BackendRequest {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "AUTO" {
            Ok(BackendRequest::Auto)
        } else {
            s.parse().map(BackendRequest::Explicit)
        }
    }
}

impl fmt::Display for BackendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendRequest::Auto => write!(f, "AUTO"),
            BackendRequest::Explicit(kind) => kind.fmt(f),
        }
    }
}

impl From<BackendKind> for BackendRequest {
    fn from(kind: BackendKind) -> Self {
        BackendRequest::Explicit(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_name() {
        for name in [
            "SCALAR_SERIAL",
            "SCALAR_THREADED",
            "VECTOR_SERIAL",
            "VECTOR_THREADED",
            "OFFLOAD_NVIDIA",
            "OFFLOAD_INTEL",
            "OFFLOAD_AMD",
        ] {
            let kind: BackendKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
        assert_eq!("AUTO".parse::<BackendRequest>(), Ok(BackendRequest::Auto));
    }

    #[test]
    fn test_unset_env_value_is_auto() {
        assert_eq!(BackendRequest::from_env_value(None), Ok(BackendRequest::Auto));
        assert_eq!(BackendRequest::from_env_value(Some("")), Ok(BackendRequest::Auto));
        assert_eq!(
            BackendRequest::from_env_value(Some("VECTOR_THREADED")),
            Ok(BackendRequest::Explicit(BackendKind::VectorThreaded))
        );
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert_eq!(
            BackendRequest::from_env_value(Some("vector_threaded")),
            Err(BackendError::UnknownBackend("vector_threaded".to_string()))
        );
        assert_eq!(
            "OFFLOAD_ACME".parse::<BackendKind>(),
            Err(BackendError::UnknownBackend("OFFLOAD_ACME".to_string()))
        );
        assert!("".parse::<BackendRequest>().is_err());
    }

    #[test]
    fn test_kind_flags() {
        assert!(BackendKind::ScalarThreaded.is_threaded());
        assert!(!BackendKind::ScalarThreaded.is_vector());
        assert!(BackendKind::VectorSerial.is_vector());
        assert!(!BackendKind::VectorSerial.is_threaded());
        assert!(BackendKind::Offload(Vendor::Intel).is_offload());
        assert!(!BackendKind::Offload(Vendor::Intel).is_threaded());
    }
}
