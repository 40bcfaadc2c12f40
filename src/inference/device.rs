//! Compute device selection.
//!
//! The device is chosen once at startup and fixed for the process lifetime.
//! CUDA is only selected when the crate was built with the `cuda` feature,
//! a CUDA runtime library is visible on the loader search path, and ONNX
//! Runtime reports the CUDA execution provider as usable.

use crate::config::InferenceDevice;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Device the detection model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    /// Host CPU.
    Cpu,
    /// NVIDIA GPU via the CUDA execution provider.
    Cuda,
}

impl std::fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
        }
    }
}

/// Resolve the requested device against what this host can provide.
pub fn select_device(requested: InferenceDevice) -> ComputeDevice {
    match requested {
        InferenceDevice::Cpu => {
            info!("Requested device: CPU");
            ComputeDevice::Cpu
        }
        InferenceDevice::Auto => {
            if is_cuda_usable() {
                info!("Auto mode: CUDA available, using GPU");
                ComputeDevice::Cuda
            } else {
                info!("Auto mode: CUDA not available, using CPU");
                ComputeDevice::Cpu
            }
        }
        InferenceDevice::Gpu => {
            if is_cuda_usable() {
                info!("--gpu: Selected CUDA provider");
                ComputeDevice::Cuda
            } else {
                warn!("--gpu requested but CUDA is not available, using CPU");
                ComputeDevice::Cpu
            }
        }
    }
}

fn is_cuda_usable() -> bool {
    if !cuda_runtime_present(&library_search_paths()) {
        debug!("CUDA runtime libraries not found");
        return false;
    }
    cuda_provider_available()
}

#[cfg(feature = "cuda")]
fn cuda_provider_available() -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

    match CUDAExecutionProvider::default().is_available() {
        Ok(available) => available,
        Err(e) => {
            debug!("CUDA provider probe failed: {e}");
            false
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn cuda_provider_available() -> bool {
    debug!("Built without the cuda feature");
    false
}

/// Environment variable listing extra shared-library directories.
const fn library_path_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Directories searched for the CUDA runtime.
pub fn library_search_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::env::var_os(library_path_var())
        .map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default();

    if cfg!(target_os = "linux") {
        paths.extend(
            [
                "/usr/lib",
                "/usr/local/lib",
                "/usr/lib/x86_64-linux-gnu",
                "/usr/lib64",
                "/usr/local/cuda/lib64",
            ]
            .map(PathBuf::from),
        );
    } else if cfg!(target_os = "macos") {
        paths.extend(["/usr/lib", "/usr/local/lib"].map(PathBuf::from));
    }

    paths.retain(|p| !p.as_os_str().is_empty());
    paths
}

/// True if any directory holds a CUDA runtime library.
pub fn cuda_runtime_present(paths: &[PathBuf]) -> bool {
    paths.iter().any(|dir| dir_has_cuda_runtime(dir))
}

fn dir_has_cuda_runtime(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(std::result::Result::ok)
        .any(|entry| is_cuda_runtime_name(&entry.file_name().to_string_lossy()))
}

fn is_cuda_runtime_name(name: &str) -> bool {
    if cfg!(target_os = "windows") {
        name.starts_with("cudart64_") && name.ends_with(".dll")
    } else if cfg!(target_os = "macos") {
        name.starts_with("libcudart.") && name.ends_with(".dylib")
    } else {
        name.starts_with("libcudart.so.")
    }
}
