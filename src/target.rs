//! Upload targets - the byte source being uploaded

use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::UploadError;

/// Where the bytes of a target come from
#[derive(Debug, Clone)]
enum TargetSource {
    Memory(Arc<Vec<u8>>),
    File(PathBuf),
}

/// Byte-addressable data of known size plus descriptive metadata
#[derive(Debug, Clone)]
pub struct UploadTarget {
    name: String,
    file_size: u64,
    metadata: BTreeMap<String, String>,
    source: TargetSource,
}

impl UploadTarget {
    /// Serve an in-memory buffer
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            file_size: bytes.len() as u64,
            metadata: BTreeMap::new(),
            source: TargetSource::Memory(Arc::new(bytes)),
        }
    }

    /// Serve a file from disk; the size is captured once and treated as fixed
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| UploadError::InvalidTarget {
                message: format!("{}: {}", path.display(), e),
            })?;

        if !meta.is_file() {
            return Err(UploadError::InvalidTarget {
                message: format!("{} is not a regular file", path.display()),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            file_size: meta.len(),
            metadata: BTreeMap::new(),
            source: TargetSource::File(path.to_path_buf()),
        })
    }

    /// Attach a descriptive metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Look up one metadata value
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Read bytes `[offset, end)`; anything short of the full range is an error
    pub async fn read_range(&self, offset: u64, end: u64) -> Result<Vec<u8>, UploadError> {
        if offset > end || end > self.file_size {
            return Err(UploadError::Source {
                offset,
                message: format!("range {}..{} outside 0..{}", offset, end, self.file_size),
            });
        }

        match &self.source {
            TargetSource::Memory(bytes) => Ok(bytes[offset as usize..end as usize].to_vec()),
            TargetSource::File(path) => {
                let io_err = |e: std::io::Error| UploadError::Source {
                    offset,
                    message: format!("{}: {}", path.display(), e),
                };

                let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
                file.seek(SeekFrom::Start(offset)).await.map_err(io_err)?;

                let mut buf = vec![0u8; (end - offset) as usize];
                file.read_exact(&mut buf).await.map_err(io_err)?;
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_read_range() {
        let target = UploadTarget::from_bytes("clip.mp4", (0u8..10).collect());
        assert_eq!(target.file_size(), 10);
        assert_eq!(target.read_range(2, 5).await.unwrap(), vec![2, 3, 4]);
        assert!(target.read_range(8, 11).await.is_err());
    }

    #[test]
    fn test_metadata_builder() {
        let target = UploadTarget::from_bytes("clip.mp4", vec![1])
            .with_metadata("description", "holiday")
            .with_metadata("distributor", "cli");
        assert_eq!(target.metadata_value("description"), Some("holiday"));
        assert_eq!(target.metadata().len(), 2);
        assert!(target.metadata_value("missing").is_none());
    }
}
