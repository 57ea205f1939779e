use std::path::Path;

use bytes::Bytes;

use crate::{MediaError, MediaKind};

/// An owned, named binary payload with its MIME type.
///
/// Cloning shares the underlying buffer, so two handles to the same file
/// can be told apart from a re-encoded copy with [`FileBlob::same_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    name: String,
    content_type: String,
    data: Bytes,
}

impl FileBlob {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::Io(format!("read {}: {e}", path.display())))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, guess_content_type(path), data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.content_type)
    }

    /// True when both handles point at the same buffer, not merely equal bytes.
    pub fn same_data(&self, other: &FileBlob) -> bool {
        self.data.as_ptr() == other.data.as_ptr() && self.data.len() == other.data.len()
    }
}

/// MIME type for a path's extension, or the empty string when unknown.
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default()
}
