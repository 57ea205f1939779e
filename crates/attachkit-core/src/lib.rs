pub mod attachment;
pub mod error;
pub mod file;
pub mod id;
pub mod media;

pub use attachment::Attachment;
pub use error::MediaError;
pub use file::FileBlob;
pub use id::AttachmentIdGenerator;
pub use media::MediaKind;
