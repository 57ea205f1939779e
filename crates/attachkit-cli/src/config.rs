use std::path::PathBuf;
use std::time::Duration;

use attachkit_media::config::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_FFMPEG, DEFAULT_MAX_PIXELS, DEFAULT_PICK_TIMEOUT_SECS,
    DEFAULT_VIDEO_TIMEOUT_SECS,
};
use attachkit_media::ToolkitConfig;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "attachkit", about = "Attachment thumbnails, compression and file selection")]
pub struct Cli {
    /// Program used to decode video frames
    #[arg(long, global = true, env = "ATTACHKIT_FFMPEG", default_value = DEFAULT_FFMPEG)]
    pub ffmpeg: String,

    /// Give up on a video's first frame after this many seconds
    #[arg(
        long,
        global = true,
        env = "ATTACHKIT_VIDEO_TIMEOUT_SECS",
        default_value_t = DEFAULT_VIDEO_TIMEOUT_SECS
    )]
    pub video_timeout: u64,

    /// Give up waiting for a file selection after this many seconds
    #[arg(
        long,
        global = true,
        env = "ATTACHKIT_PICK_TIMEOUT_SECS",
        default_value_t = DEFAULT_PICK_TIMEOUT_SECS
    )]
    pub pick_timeout: u64,

    /// HTTP request timeout (seconds)
    #[arg(
        long,
        global = true,
        env = "ATTACHKIT_FETCH_TIMEOUT_SECS",
        default_value_t = DEFAULT_FETCH_TIMEOUT_SECS
    )]
    pub fetch_timeout: u64,

    /// Largest image area (pixels) that will be redrawn
    #[arg(long, global = true, env = "ATTACHKIT_MAX_PIXELS", default_value_t = DEFAULT_MAX_PIXELS)]
    pub max_pixels: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a URL (http, https, data, file) to disk
    Fetch {
        url: String,
        /// File name to record; defaults to the URL
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Build attachment records for files and print them as JSON
    Inspect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Thumbnails derived at once; 1 processes files sequentially
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Re-encode an image at a lower quality
    Compress {
        path: PathBuf,
        /// Encoder quality between 0 and 1; 1 leaves the file untouched
        #[arg(long, default_value_t = 1.0)]
        quality: f32,
        /// Target MIME type (defaults to the input's type)
        #[arg(long = "type")]
        content_type: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Ask for a file path on stdin
    Pick {
        /// Required MIME type
        #[arg(long)]
        accept: Option<String>,
    },
    /// Check that the video decoder is available
    Preflight,
}

impl Cli {
    pub fn toolkit_config(&self) -> ToolkitConfig {
        ToolkitConfig {
            ffmpeg_program: self.ffmpeg.clone(),
            video_timeout: Duration::from_secs(self.video_timeout),
            pick_timeout: Duration::from_secs(self.pick_timeout),
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            max_pixels: self.max_pixels,
        }
    }
}
