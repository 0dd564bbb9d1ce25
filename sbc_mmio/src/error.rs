//! Error types for memory-mapped register access

use sbc_common::hal::driver::HalError;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while mapping or overlaying registers
#[derive(Error, Debug)]
pub enum MmioError {
    /// Opening or mapping the memory device was denied
    #[error("Permission denied mapping {path}")]
    PermissionDenied {
        /// Memory device path
        path: String,
    },

    /// Memory device does not exist
    #[error("Memory device not found: {path}")]
    NotFound {
        /// Memory device path
        path: String,
    },

    /// Requested window lies outside the mapping
    #[error("Invalid range: offset {offset:#x} + {len:#x} bytes exceeds mapping of {size:#x}")]
    InvalidRange {
        /// Offset into the mapping
        offset: usize,
        /// Length of the requested view
        len: usize,
        /// Size of the mapping
        size: usize,
    },

    /// Memory alignment error
    #[error("Memory alignment error: address {address:#x} not aligned to {alignment}")]
    AlignmentError {
        /// Memory address
        address: usize,
        /// Required alignment
        alignment: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

impl MmioError {
    /// Classify an I/O error raised while opening or mapping `path`.
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            ErrorKind::PermissionDenied => MmioError::PermissionDenied { path },
            ErrorKind::NotFound => MmioError::NotFound { path },
            _ => match err.raw_os_error() {
                Some(libc::EPERM) | Some(libc::EACCES) => MmioError::PermissionDenied { path },
                _ => MmioError::Io { source: err },
            },
        }
    }

    /// Whether the error means "insufficient privilege" rather than
    /// absent or broken hardware.
    pub fn is_permission(&self) -> bool {
        matches!(self, MmioError::PermissionDenied { .. })
    }
}

/// Result type for register access operations
pub type MmioResult<T> = Result<T, MmioError>;

impl From<MmioError> for HalError {
    fn from(err: MmioError) -> Self {
        match err {
            MmioError::PermissionDenied { path } => HalError::PermissionDenied(path),
            other => HalError::Io(other.to_string()),
        }
    }
}
