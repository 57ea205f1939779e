use std::collections::BTreeMap;

use attachkit_core::{Attachment, FileBlob, MediaError};
use reqwest::multipart::{Form, Part};

pub const ATTACHMENT_KEY_PREFIX: &str = "Image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FileBlob),
}

/// Key/value submission payload, sent as a multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    fields: BTreeMap<String, FormValue>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), FormValue::Text(value.into()));
    }

    pub fn insert_file(&mut self, key: impl Into<String>, file: FileBlob) {
        self.fields.insert(key.into(), FormValue::File(file));
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a multipart form; file parts carry their name and MIME type.
    pub fn into_form(self) -> Result<Form, MediaError> {
        let mut form = Form::new();
        for (key, value) in self.fields {
            form = match value {
                FormValue::Text(text) => form.text(key, text),
                FormValue::File(file) => {
                    let mut part =
                        Part::bytes(file.data().to_vec()).file_name(file.name().to_string());
                    if !file.content_type().is_empty() {
                        part = part.mime_str(file.content_type()).map_err(|e| {
                            MediaError::Encode(format!(
                                "{key}: invalid content type '{}': {e}",
                                file.content_type()
                            ))
                        })?;
                    }
                    form.part(key, part)
                }
            };
        }
        Ok(form)
    }
}

/// Stage each attachment's file under `Image<index>`, skipping entries without one.
///
/// The index is the attachment's position in `attachments`, so skipped
/// entries leave gaps in the numbering.
pub fn append_attachments(payload: &mut Payload, attachments: Option<&[Attachment]>) {
    for (i, attachment) in attachments.unwrap_or_default().iter().enumerate() {
        if let Some(file) = &attachment.file {
            payload.insert_file(format!("{ATTACHMENT_KEY_PREFIX}{i}"), file.clone());
        }
    }
}
