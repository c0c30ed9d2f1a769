//! Firmware package loading and validation.
//!
//! A DFU package is a ZIP archive produced by the firmware build (init
//! packet plus one or more image blobs). The orchestrator does not look
//! inside the archive; the transport consumes it as an opaque blob. What we
//! do check, before a session is allowed to start, is that the file exists
//! and carries the container signature, so that a bad artifact surfaces as a
//! setup error instead of a mid-transfer failure.

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;
use tracing::info;

/// ZIP local file header signature, little-endian "PK\x03\x04".
const ZIP_MAGIC: u32 = 0x0403_4B50;

/// Smallest plausible package: ZIP header plus an init packet.
const MIN_PACKAGE_SIZE: usize = 64;

#[derive(Error, Debug)]
pub enum FirmwareError {
    #[error("File too small: {actual} bytes, minimum {minimum}")]
    FileTooSmall { actual: usize, minimum: usize },
    #[error("Not a DFU package: bad container signature 0x{actual:08X}")]
    InvalidMagic { actual: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validated, opaque firmware package.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    data: Vec<u8>,
    name: String,
}

impl FirmwareImage {
    /// Load and validate a package from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FirmwareError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let image = Self::from_bytes(data, name)?;
        info!(path = %path.display(), size = image.len(), "Loaded firmware package");
        Ok(image)
    }

    /// Validate a package already held in memory.
    pub fn from_bytes(data: Vec<u8>, name: impl Into<String>) -> Result<Self, FirmwareError> {
        if data.len() < MIN_PACKAGE_SIZE {
            return Err(FirmwareError::FileTooSmall {
                actual: data.len(),
                minimum: MIN_PACKAGE_SIZE,
            });
        }

        let magic = LittleEndian::read_u32(&data[..4]);
        if magic != ZIP_MAGIC {
            return Err(FirmwareError::InvalidMagic { actual: magic });
        }

        Ok(Self {
            data,
            name: name.into(),
        })
    }

    /// Package file name, for logs and messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw package bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Total package size.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_bytes(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..4].copy_from_slice(&ZIP_MAGIC.to_le_bytes());
        data
    }

    #[test]
    fn test_valid_package() {
        let image = FirmwareImage::from_bytes(package_bytes(1024), "app.zip").unwrap();
        assert_eq!(image.name(), "app.zip");
        assert_eq!(image.len(), 1024);
        assert!(!image.is_empty());
    }

    #[test]
    fn test_too_small() {
        let err = FirmwareImage::from_bytes(vec![0u8; 10], "tiny.zip").unwrap_err();
        assert!(matches!(err, FirmwareError::FileTooSmall { actual: 10, .. }));
    }

    #[test]
    fn test_bad_magic() {
        let data = vec![0xFFu8; 1024];
        let err = FirmwareImage::from_bytes(data, "junk.bin").unwrap_err();
        assert!(matches!(err, FirmwareError::InvalidMagic { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = FirmwareImage::from_file("/nonexistent/fw.zip").unwrap_err();
        assert!(matches!(err, FirmwareError::Io(_)));
    }
}
