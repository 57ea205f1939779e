//! Off-screen drawing and decoding surfaces.
//!
//! Both surfaces are scoped: acquire one, use it, and it is released when
//! dropped on every path, including early returns and cancelled futures.

use std::io::Cursor;
use std::path::Path;

use attachkit_core::{FileBlob, MediaError};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tempfile::NamedTempFile;
use tracing::debug;

/// Quality used for lossy encodings when the requested one is out of range.
pub const DEFAULT_LOSSY_QUALITY: f32 = 0.92;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("canvas has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },

    #[error("canvas of {pixels} pixels exceeds the limit of {max}")]
    TooLarge { pixels: u64, max: u64 },
}

impl From<SurfaceError> for MediaError {
    fn from(e: SurfaceError) -> Self {
        MediaError::Encode(format!("canvas: {e}"))
    }
}

/// An encoded image produced by [`Canvas::to_blob`].
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// RGBA raster that images are drawn onto before re-encoding.
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    pub fn acquire(width: u32, height: u32, max_pixels: u64) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::ZeroArea { width, height });
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > max_pixels {
            return Err(SurfaceError::TooLarge {
                pixels,
                max: max_pixels,
            });
        }
        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Draw `image` with its top-left corner at (`x`, `y`), clipped to the canvas.
    pub fn draw_image(&mut self, image: &DynamicImage, x: i64, y: i64) {
        image::imageops::overlay(&mut self.pixels, &image.to_rgba8(), x, y);
    }

    /// Lossless PNG `data:` URL of the current contents.
    pub fn to_data_url(&self) -> Result<String, MediaError> {
        let mut buf = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| MediaError::Encode(format!("png: {e}")))?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buf)
        ))
    }

    /// Encode as `content_type` at `quality` (0..=1, lossy formats only).
    ///
    /// JPEG and WebP (lossless) are honoured; any other type is encoded as
    /// PNG. Returns `None` if encoding fails.
    pub fn to_blob(&self, content_type: &str, quality: f32) -> Option<EncodedBlob> {
        let mut buf = Vec::new();
        let result = match content_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => {
                let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).into_rgb8();
                JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
                    .encode_image(&rgb)
                    .map(|_| "image/jpeg")
            }
            "image/webp" => self
                .pixels
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
                .map(|_| "image/webp"),
            _ => self
                .pixels
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map(|_| "image/png"),
        };
        match result {
            Ok(content_type) => Some(EncodedBlob {
                content_type,
                data: buf,
            }),
            Err(e) => {
                debug!("canvas encode as {content_type} failed: {e}");
                None
            }
        }
    }
}

fn jpeg_quality(quality: f32) -> u8 {
    let q = if (0.0..=1.0).contains(&quality) {
        quality
    } else {
        DEFAULT_LOSSY_QUALITY
    };
    (q * 100.0).round().clamp(1.0, 100.0) as u8
}

/// A video payload staged on disk for an external decoder.
///
/// The backing temp file is deleted when the surface is dropped.
pub struct VideoSurface {
    file: NamedTempFile,
}

impl VideoSurface {
    pub async fn load(video: &FileBlob) -> Result<Self, MediaError> {
        let suffix = mime_guess::get_mime_extensions_str(video.content_type())
            .and_then(|exts| exts.first())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix("attachkit-video-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| MediaError::Io(format!("create video surface: {e}")))?;
        tokio::fs::write(file.path(), video.data())
            .await
            .map_err(|e| MediaError::Io(format!("write video surface: {e}")))?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255])))
    }

    #[test]
    fn acquire_rejects_zero_and_oversized() {
        assert!(matches!(
            Canvas::acquire(0, 10, 100),
            Err(SurfaceError::ZeroArea { .. })
        ));
        assert!(matches!(
            Canvas::acquire(11, 10, 100),
            Err(SurfaceError::TooLarge { pixels: 110, max: 100 })
        ));
        let canvas = Canvas::acquire(10, 10, 100).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (10, 10));
    }

    #[test]
    fn data_url_is_decodable_png() {
        let mut canvas = Canvas::acquire(3, 2, 100).unwrap();
        canvas.draw_image(&solid(3, 2), 0, 0);
        let url = canvas.to_data_url().unwrap();

        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(2, 1), &Rgba([200, 30, 30, 255]));
    }

    #[test]
    fn to_blob_honours_jpeg_and_falls_back_to_png() {
        let mut canvas = Canvas::acquire(8, 8, 1_000).unwrap();
        canvas.draw_image(&solid(8, 8), 0, 0);

        let jpeg = canvas.to_blob("image/jpeg", 0.5).unwrap();
        assert_eq!(jpeg.content_type, "image/jpeg");
        assert_eq!(
            image::guess_format(&jpeg.data).unwrap(),
            ImageFormat::Jpeg
        );

        let other = canvas.to_blob("image/tiff", 0.5).unwrap();
        assert_eq!(other.content_type, "image/png");
        assert_eq!(image::guess_format(&other.data).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn jpeg_quality_mapping() {
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.5), 50);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(3.0), 92);
        assert_eq!(jpeg_quality(f32::NAN), 92);
    }

    #[tokio::test]
    async fn video_surface_is_removed_on_drop() {
        let video = FileBlob::new("clip.mp4", "video/mp4", vec![0u8; 32]);
        let surface = VideoSurface::load(&video).await.unwrap();
        let path = surface.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap().len(), 32);

        drop(surface);
        assert!(!path.exists());
    }
}
