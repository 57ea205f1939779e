use serde::{Deserialize, Serialize};

use crate::FileBlob;

/// One user-supplied media item pending submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    #[serde(skip)]
    pub file: Option<FileBlob>,
    pub content_type: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

impl Attachment {
    /// Build a record for `file`, copying its type and name.
    pub fn new(id: i64, file: FileBlob, url: Option<String>) -> Self {
        Self {
            id,
            content_type: file.content_type().to_string(),
            file_name: file.name().to_string(),
            file: Some(file),
            url,
        }
    }

    pub fn size(&self) -> Option<usize> {
        self.file.as_ref().map(FileBlob::size)
    }
}
