use std::fmt;

use attachkit_core::MediaError;
use futures::future::BoxFuture;
use image::DynamicImage;

use crate::surface::Canvas;

/// A display reference for a file, either already available or still being derived.
pub enum Thumbnail<'a> {
    /// Image reference URL, available immediately.
    Ready(String),
    /// Video frame capture in progress.
    Pending(BoxFuture<'a, Result<String, MediaError>>),
}

impl Thumbnail<'_> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Thumbnail::Ready(_))
    }

    pub async fn resolve(self) -> Result<String, MediaError> {
        match self {
            Thumbnail::Ready(url) => Ok(url),
            Thumbnail::Pending(fut) => fut.await,
        }
    }
}

impl fmt::Debug for Thumbnail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thumbnail::Ready(url) => f.debug_tuple("Ready").field(url).finish(),
            Thumbnail::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Draw a decoded frame onto a canvas of the same size and export it as a PNG data URL.
pub fn frame_to_data_url(frame: &DynamicImage, max_pixels: u64) -> Result<String, MediaError> {
    let mut canvas = Canvas::acquire(frame.width(), frame.height(), max_pixels)?;
    canvas.draw_image(frame, 0, 0);
    canvas.to_data_url()
}
