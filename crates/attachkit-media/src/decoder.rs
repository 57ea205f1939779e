use std::process::Stdio;

use async_trait::async_trait;
use attachkit_core::{FileBlob, MediaError};
use image::{DynamicImage, ImageFormat};
use tokio::process::Command;
use tracing::{debug, info};

use crate::surface::VideoSurface;

/// Off-screen video decode surface: yields the first displayable frame.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// Verify the decoder can run at all. Called from preflight checks.
    async fn check_available(&self) -> Result<(), MediaError>;

    /// Decode the first frame of `video`.
    ///
    /// Dropping the returned future must release every resource the
    /// decoder acquired.
    async fn first_frame(&self, video: &FileBlob) -> Result<DynamicImage, MediaError>;
}

/// Decodes frames by running `ffmpeg` against a staged temp file.
pub struct FfmpegDecoder {
    program: String,
}

impl FfmpegDecoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn check_available(&self) -> Result<(), MediaError> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::Decoder(format!("{} is not runnable: {e}", self.program)))?;
        if !output.status.success() {
            return Err(MediaError::Decoder(format!(
                "{} -version exited with {}",
                self.program, output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout);
        info!("{}: {}", self.program, version.lines().next().unwrap_or("").trim());
        Ok(())
    }

    async fn first_frame(&self, video: &FileBlob) -> Result<DynamicImage, MediaError> {
        let surface = VideoSurface::load(video).await?;
        debug!("decoding first frame of {} via {}", video.name(), self.program);

        let output = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(surface.path())
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::Decoder(format!("spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Decoder(format!(
                "{} failed on {}: {}",
                self.program,
                video.name(),
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(MediaError::Decoder(format!(
                "{} produced no frame for {}",
                self.program,
                video.name()
            )));
        }
        image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
            .map_err(|e| MediaError::Decode(format!("frame of {}: {e}", video.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "attachkit-test-no-such-ffmpeg";

    #[tokio::test]
    async fn missing_program_fails_preflight() {
        let decoder = FfmpegDecoder::new(MISSING);
        let err = decoder.check_available().await.unwrap_err();
        assert!(matches!(err, MediaError::Decoder(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_program_fails_decode() {
        let decoder = FfmpegDecoder::new(MISSING);
        let video = FileBlob::new("clip.mp4", "video/mp4", vec![0u8; 8]);
        let err = decoder.first_frame(&video).await.unwrap_err();
        assert!(matches!(err, MediaError::Decoder(_)), "got {err:?}");
    }

    fn ffmpeg_installed() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn decodes_first_frame_of_generated_clip() {
        if !ffmpeg_installed() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("clip.mp4");
        let status = std::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "lavfi", "-i", "testsrc=size=32x24:rate=5"])
            .args(["-frames:v", "5", "-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success(), "ffmpeg could not generate a clip");

        let video = FileBlob::from_path(&path).await.unwrap();
        assert_eq!(video.content_type(), "video/mp4");

        let frame = FfmpegDecoder::new("ffmpeg").first_frame(&video).await.unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 24));
    }
}
