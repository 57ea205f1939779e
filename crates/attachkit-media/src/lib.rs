//! Turning user-supplied files and URLs into display-ready attachments.
//!
//! [`Toolkit`] is the entry point. Payload staging and compression are
//! free functions since they need no host surfaces.

pub mod compress;
pub mod config;
pub mod decoder;
pub mod fetch;
pub mod object_url;
pub mod payload;
pub mod picker;
pub mod surface;
pub mod thumbnail;
mod toolkit;

pub use attachkit_core::{Attachment, FileBlob, MediaError, MediaKind};
pub use compress::{compress_file, compress_image, CompressOptions, Compression, FallbackReason};
pub use config::ToolkitConfig;
pub use decoder::{FfmpegDecoder, FrameDecoder};
pub use fetch::{Fetched, Fetcher, HttpFetcher};
pub use object_url::ObjectUrlRegistry;
pub use payload::{append_attachments, FormValue, Payload};
pub use picker::{
    FileInput, FilePicker, LinePicker, MismatchCallback, StaticPicker, StdinPicker,
};
pub use thumbnail::Thumbnail;
pub use toolkit::Toolkit;
