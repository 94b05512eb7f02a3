//! Inference device for the local scoring branch, chosen by `LUCID_DEVICE`.

use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use tracing::{info, warn};

use super::error::ScoringError;

/// Where the local model should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// The first GPU backend built into this binary that opens, else CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl DevicePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePreference::Auto => "auto",
            DevicePreference::Cpu => "cpu",
            DevicePreference::Cuda => "cuda",
            DevicePreference::Metal => "metal",
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            other => Err(format!("expected auto, cpu, cuda or metal, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GpuBackend {
    Metal,
    Cuda,
}

impl GpuBackend {
    const ALL: [GpuBackend; 2] = [GpuBackend::Metal, GpuBackend::Cuda];

    fn name(self) -> &'static str {
        match self {
            GpuBackend::Metal => "metal",
            GpuBackend::Cuda => "cuda",
        }
    }

    fn compiled(self) -> bool {
        match self {
            GpuBackend::Metal => cfg!(feature = "metal"),
            GpuBackend::Cuda => cfg!(feature = "cuda"),
        }
    }

    fn open(self) -> Result<Device, ScoringError> {
        if !self.compiled() {
            return Err(ScoringError::ModelLoadFailed {
                reason: format!("{0} requested but this build lacks the '{0}' feature", self.name()),
            });
        }

        let opened = match self {
            GpuBackend::Metal => Device::new_metal(0),
            GpuBackend::Cuda => Device::new_cuda(0),
        };
        opened.map_err(|e| ScoringError::ModelLoadFailed {
            reason: format!("{} device 0 unavailable: {e}", self.name()),
        })
    }
}

/// Resolves `preference` to a device.
///
/// Explicit GPU requests fail with `ModelLoadFailed` when the backend is missing;
/// only `Auto` settles for CPU.
pub fn select_device(preference: DevicePreference) -> Result<Device, ScoringError> {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Metal => GpuBackend::Metal.open()?,
        DevicePreference::Cuda => GpuBackend::Cuda.open()?,
        DevicePreference::Auto => auto_device(),
    };
    info!(preference = %preference, ?device, "Selected inference device");
    Ok(device)
}

fn auto_device() -> Device {
    for backend in GpuBackend::ALL.into_iter().filter(|b| b.compiled()) {
        match backend.open() {
            Ok(device) => return device,
            Err(e) => warn!(backend = backend.name(), error = %e, "GPU backend unusable"),
        }
    }
    Device::Cpu
}
