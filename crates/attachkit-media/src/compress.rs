use attachkit_core::{FileBlob, MediaError, MediaKind};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_MAX_PIXELS;
use crate::surface::Canvas;

#[derive(Debug, Clone, PartialEq)]
pub struct CompressOptions {
    /// Encoder quality in 0..=1. Exactly 1 means "do not compress".
    pub quality: f32,
    /// Target MIME type; the file's own type when `None`.
    pub content_type: Option<String>,
    /// Canvas area limit.
    pub max_pixels: u64,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: 1.0,
            content_type: None,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl CompressOptions {
    pub fn with_quality(quality: f32) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    fn target_type<'a>(&'a self, file: &'a FileBlob) -> &'a str {
        self.content_type.as_deref().unwrap_or(file.content_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No canvas could be acquired for the bitmap.
    NoDrawingContext,
    /// The canvas could not export an encoded blob.
    EncodeFailed,
}

/// Outcome of a compression request.
#[derive(Debug, Clone)]
pub enum Compression {
    /// Nothing was attempted; this is the caller's file.
    Unchanged(FileBlob),
    Compressed(FileBlob),
    /// Compression was attempted but degraded; this is the caller's file.
    Fallback {
        file: FileBlob,
        reason: FallbackReason,
    },
}

impl Compression {
    pub fn file(&self) -> &FileBlob {
        match self {
            Compression::Unchanged(file)
            | Compression::Compressed(file)
            | Compression::Fallback { file, .. } => file,
        }
    }

    pub fn into_file(self) -> FileBlob {
        match self {
            Compression::Unchanged(file)
            | Compression::Compressed(file)
            | Compression::Fallback { file, .. } => file,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Compression::Compressed(_))
    }
}

/// Compress `file` only when a lossy quality is requested for an image type.
pub async fn compress_file(
    file: FileBlob,
    options: &CompressOptions,
) -> Result<Compression, MediaError> {
    if options.quality == 1.0 {
        return Ok(Compression::Unchanged(file));
    }
    let target = options.target_type(&file);
    if !MediaKind::from_mime(target).is_image() {
        debug!("{}: target type '{target}' is not an image, passing through", file.name());
        return Ok(Compression::Unchanged(file));
    }
    compress_image(file, options).await
}

/// Decode, redraw on a canvas of the same size and re-encode at the requested quality.
///
/// Fails only if the bytes cannot be decoded as an image.
pub async fn compress_image(
    file: FileBlob,
    options: &CompressOptions,
) -> Result<Compression, MediaError> {
    let target = options.target_type(&file).to_string();
    let quality = options.quality;
    let max_pixels = options.max_pixels;

    let source = file.clone();
    let encoded = tokio::task::spawn_blocking(move || redraw(&source, &target, quality, max_pixels))
        .await
        .map_err(|e| MediaError::Encode(format!("compression task: {e}")))??;

    match encoded {
        Ok(blob) => {
            info!(
                "compressed {} ({} -> {} bytes, {})",
                file.name(),
                file.size(),
                blob.data.len(),
                blob.content_type
            );
            Ok(Compression::Compressed(FileBlob::new(
                file.name(),
                blob.content_type,
                blob.data,
            )))
        }
        Err(reason) => {
            warn!("compression of {} fell back to the original: {reason:?}", file.name());
            Ok(Compression::Fallback { file, reason })
        }
    }
}

type Redrawn = Result<crate::surface::EncodedBlob, FallbackReason>;

fn redraw(
    file: &FileBlob,
    target: &str,
    quality: f32,
    max_pixels: u64,
) -> Result<Redrawn, MediaError> {
    let bitmap = image::load_from_memory(file.data())
        .map_err(|e| MediaError::Decode(format!("{}: {e}", file.name())))?;

    let mut canvas = match Canvas::acquire(bitmap.width(), bitmap.height(), max_pixels) {
        Ok(canvas) => canvas,
        Err(e) => {
            debug!("{}: {e}", file.name());
            return Ok(Err(FallbackReason::NoDrawingContext));
        }
    };
    canvas.draw_image(&bitmap, 0, 0);
    Ok(canvas.to_blob(target, quality).ok_or(FallbackReason::EncodeFailed))
}
