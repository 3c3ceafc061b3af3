//! Input validation: path or raw bytes → checked PDF payload.
//!
//! Failing here is cheap and local, so every check runs before any
//! network call: existence, readability, and the `%PDF` magic. Raw
//! byte inputs get the same magic check as paths.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PdftomdError;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF to extract, by path or already in memory.
#[derive(Debug, Clone)]
pub enum PdfInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<&Path> for PdfInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for PdfInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for PdfInput {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for PdfInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl PdfInput {
    /// True when the caller supplied in-memory bytes rather than a path.
    /// Byte inputs are sent inline in the generate request instead of
    /// going through the Files API.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }

    /// Validate the input and return the PDF bytes.
    pub fn load(&self) -> Result<Vec<u8>, PdftomdError> {
        match self {
            Self::Path(path) => {
                if !path.exists() {
                    return Err(PdftomdError::FileNotFound { path: path.clone() });
                }
                let bytes = std::fs::read(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        PdftomdError::PermissionDenied { path: path.clone() }
                    }
                    std::io::ErrorKind::NotFound => {
                        PdftomdError::FileNotFound { path: path.clone() }
                    }
                    _ => PdftomdError::InvalidConfig(format!("cannot read '{}': {e}", path.display())),
                })?;
                check_magic(&bytes, path)?;
                debug!(path = %path.display(), size = bytes.len(), "PDF input validated");
                Ok(bytes)
            }
            Self::Bytes(bytes) => {
                check_magic(bytes, Path::new("<bytes>"))?;
                debug!(size = bytes.len(), "in-memory PDF input validated");
                Ok(bytes.clone())
            }
        }
    }
}

fn check_magic(bytes: &[u8], path: &Path) -> Result<(), PdftomdError> {
    let mut magic = [0u8; 4];
    let head = bytes.get(..4).unwrap_or_default();
    magic[..head.len()].copy_from_slice(head);
    if head != PDF_MAGIC {
        return Err(PdftomdError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}
