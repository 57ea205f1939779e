use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use attachkit_core::{FileBlob, MediaError};
use futures::future::BoxFuture;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The selection handle a picker fills in, analogous to a file input element.
#[derive(Debug, Clone, Default)]
pub struct FileInput {
    accept: Option<String>,
    files: Vec<FileBlob>,
}

impl FileInput {
    pub fn new(accept: Option<&str>) -> Self {
        Self {
            accept: accept.map(str::to_string),
            files: Vec::new(),
        }
    }

    /// MIME type the caller requires, if any.
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    pub fn files(&self) -> &[FileBlob] {
        &self.files
    }

    pub fn set_files(&mut self, files: Vec<FileBlob>) {
        self.files = files;
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Native file-selection surface.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Present the surface and return once it signals a change.
    ///
    /// The chosen files are written into `input`; leaving it empty means
    /// the user dismissed the surface.
    async fn pick(&self, input: &mut FileInput) -> Result<(), MediaError>;
}

/// Invoked with the cleared input when the chosen file has the wrong type.
pub type MismatchCallback = Box<dyn FnOnce(FileInput) -> BoxFuture<'static, ()> + Send>;

/// Ask `picker` for one file, enforcing an exact MIME type when `accept` is set.
///
/// Resolves to `None` when the user dismisses the surface or picks a file
/// of the wrong type (after running `on_type_mismatch`), and fails with
/// [`MediaError::TimedOut`] if no change arrives within `timeout`.
pub async fn select_file(
    picker: &dyn FilePicker,
    accept: Option<&str>,
    on_type_mismatch: Option<MismatchCallback>,
    timeout: Duration,
) -> Result<Option<FileBlob>, MediaError> {
    let mut input = FileInput::new(accept);
    tokio::time::timeout(timeout, picker.pick(&mut input))
        .await
        .map_err(|_| MediaError::TimedOut {
            operation: "file selection",
            after: timeout,
        })??;

    let Some(file) = input.files().first().cloned() else {
        debug!("file selection dismissed");
        return Ok(None);
    };

    if let Some(required) = accept {
        if file.content_type() != required {
            info!(
                "selected {} has type '{}', expected '{required}'",
                file.name(),
                file.content_type()
            );
            input.clear();
            if let Some(callback) = on_type_mismatch {
                callback(input).await;
            }
            return Ok(None);
        }
    }

    Ok(Some(file))
}

/// Prompts on stderr and reads one path per line from `R`. An empty line
/// or end of input dismisses.
///
/// The line reader is shared across calls so buffered input is never lost
/// between selections.
pub struct LinePicker<R> {
    lines: Mutex<Lines<R>>,
}

/// [`LinePicker`] over the process's standard input.
pub type StdinPicker = LinePicker<BufReader<Stdin>>;

impl StdinPicker {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for StdinPicker {
    fn default() -> Self {
        Self::stdin()
    }
}

impl<R: AsyncBufRead + Unpin> LinePicker<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }
}

impl<R> fmt::Debug for LinePicker<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinePicker").finish_non_exhaustive()
    }
}

#[async_trait]
impl<R> FilePicker for LinePicker<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn pick(&self, input: &mut FileInput) -> Result<(), MediaError> {
        let prompt = match input.accept() {
            Some(accept) => format!("Select a file ({accept}): "),
            None => "Select a file: ".to_string(),
        };
        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| MediaError::Io(format!("write prompt: {e}")))?;
        stderr
            .flush()
            .await
            .map_err(|e| MediaError::Io(format!("flush prompt: {e}")))?;

        let line = self
            .lines
            .lock()
            .await
            .next_line()
            .await
            .map_err(|e| MediaError::Io(format!("read selection: {e}")))?;

        match line.as_deref().map(str::trim) {
            None | Some("") => input.clear(),
            Some(path) => {
                let file = FileBlob::from_path(PathBuf::from(path)).await?;
                input.set_files(vec![file]);
            }
        }
        Ok(())
    }
}

/// Picker with a fixed outcome, for embedding hosts and tests.
#[derive(Debug, Clone)]
pub enum StaticPicker {
    Choose(FileBlob),
    Dismiss,
    /// Never signals a change.
    Hang,
}

#[async_trait]
impl FilePicker for StaticPicker {
    async fn pick(&self, input: &mut FileInput) -> Result<(), MediaError> {
        match self {
            StaticPicker::Choose(file) => input.set_files(vec![file.clone()]),
            StaticPicker::Dismiss => input.clear(),
            StaticPicker::Hang => futures::future::pending::<()>().await,
        }
        Ok(())
    }
}
