use std::sync::Arc;

use attachkit_core::{Attachment, AttachmentIdGenerator, FileBlob, MediaError, MediaKind};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::ToolkitConfig;
use crate::decoder::{FfmpegDecoder, FrameDecoder};
use crate::fetch::{self, Fetcher, HttpFetcher};
use crate::object_url::{is_object_url, ObjectUrlRegistry};
use crate::picker::{self, FilePicker, MismatchCallback, StdinPicker};
use crate::thumbnail::{frame_to_data_url, Thumbnail};

/// Entry point for attachment handling: owns the host surfaces
/// (transport, video decoder, file picker) and the reference-URL registry.
pub struct Toolkit {
    config: ToolkitConfig,
    urls: ObjectUrlRegistry,
    ids: AttachmentIdGenerator,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn FrameDecoder>,
    picker: Arc<dyn FilePicker>,
}

impl Toolkit {
    /// Toolkit with the default surfaces: reqwest, ffmpeg and a stdin picker.
    pub fn new(config: ToolkitConfig) -> Result<Self, MediaError> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        let decoder = FfmpegDecoder::new(config.ffmpeg_program.clone());
        Ok(Self {
            config,
            urls: ObjectUrlRegistry::new(),
            ids: AttachmentIdGenerator::new(),
            fetcher: Arc::new(fetcher),
            decoder: Arc::new(decoder),
            picker: Arc::new(StdinPicker::stdin()),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_picker(mut self, picker: Arc<dyn FilePicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    pub fn decoder(&self) -> &dyn FrameDecoder {
        self.decoder.as_ref()
    }

    /// Retrieve `url` as a file named `file_name` (or the URL itself).
    pub async fn url_to_file(
        &self,
        url: &str,
        file_name: Option<&str>,
    ) -> Result<FileBlob, MediaError> {
        fetch::url_to_file(self.fetcher.as_ref(), &self.urls, url, file_name).await
    }

    /// Reference URL for an image file. The caller must revoke it.
    pub fn image_thumbnail(&self, file: &FileBlob) -> String {
        self.urls.create(file)
    }

    /// PNG data URL of the first frame of a video file.
    pub async fn video_thumbnail(&self, file: &FileBlob) -> Result<String, MediaError> {
        let timeout = self.config.video_timeout;
        let frame = tokio::time::timeout(timeout, self.decoder.first_frame(file))
            .await
            .map_err(|_| MediaError::TimedOut {
                operation: "video frame capture",
                after: timeout,
            })??;
        debug!(
            "captured {}x{} frame of {}",
            frame.width(),
            frame.height(),
            file.name()
        );
        frame_to_data_url(&frame, self.config.max_pixels)
    }

    /// Thumbnail by media kind: immediate for images, deferred for videos,
    /// `None` for everything else.
    pub fn file_thumbnail<'a>(&'a self, file: &'a FileBlob) -> Option<Thumbnail<'a>> {
        match file.kind() {
            MediaKind::Image => Some(Thumbnail::Ready(self.image_thumbnail(file))),
            MediaKind::Video => Some(Thumbnail::Pending(Box::pin(self.video_thumbnail(file)))),
            MediaKind::Audio | MediaKind::Other => None,
        }
    }

    /// Build attachments one file at a time, in input order.
    pub async fn files_to_attachments(&self, files: Vec<FileBlob>) -> Vec<Attachment> {
        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            let id = self.ids.next_id();
            let url = self.derive_url(&file).await;
            attachments.push(Attachment::new(id, file, url));
        }
        info!("built {} attachments", attachments.len());
        attachments
    }

    /// Like [`Toolkit::files_to_attachments`] but derives up to `limit`
    /// thumbnails at once. Ids and output follow input order.
    pub async fn files_to_attachments_concurrent(
        &self,
        files: Vec<FileBlob>,
        limit: usize,
    ) -> Vec<Attachment> {
        let ids: Vec<i64> = files.iter().map(|_| self.ids.next_id()).collect();
        let attachments: Vec<Attachment> = stream::iter(ids.into_iter().zip(files))
            .map(|(id, file)| async move {
                let url = self.derive_url(&file).await;
                Attachment::new(id, file, url)
            })
            .buffered(limit.max(1))
            .collect()
            .await;
        info!("built {} attachments (concurrency {limit})", attachments.len());
        attachments
    }

    async fn derive_url(&self, file: &FileBlob) -> Option<String> {
        let thumbnail = self.file_thumbnail(file)?;
        match thumbnail.resolve().await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("no thumbnail for {}: {e}", file.name());
                None
            }
        }
    }

    /// Revoke the reference URLs held by `attachments`. Returns how many were live.
    pub fn release_attachments(&self, attachments: &[Attachment]) -> usize {
        attachments
            .iter()
            .filter_map(|a| a.url.as_deref())
            .filter(|url| is_object_url(url))
            .filter(|url| self.urls.revoke(url))
            .count()
    }

    /// Ask the user for a file, requiring an exact MIME type when `accept` is set.
    pub async fn select_file(
        &self,
        accept: Option<&str>,
        on_type_mismatch: Option<MismatchCallback>,
    ) -> Result<Option<FileBlob>, MediaError> {
        picker::select_file(
            self.picker.as_ref(),
            accept,
            on_type_mismatch,
            self.config.pick_timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;
    use crate::picker::StaticPicker;

    /// Returns a solid frame after an optional delay, counting calls.
    struct StubDecoder {
        delay: Duration,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubDecoder {
        fn ok(delay: Duration) -> Self {
            Self {
                delay,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                delay: Duration::ZERO,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FrameDecoder for StubDecoder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn check_available(&self) -> Result<(), MediaError> {
            Ok(())
        }

        async fn first_frame(&self, _video: &FileBlob) -> Result<DynamicImage, MediaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(MediaError::Decoder("corrupt stream".into()));
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                4,
                2,
                Rgba([10, 20, 30, 255]),
            )))
        }
    }

    fn kit(decoder: StubDecoder) -> Toolkit {
        Toolkit::new(ToolkitConfig::default())
            .unwrap()
            .with_decoder(Arc::new(decoder))
    }

    fn image(name: &str) -> FileBlob {
        FileBlob::new(name, "image/png", vec![1, 2, 3])
    }

    fn video(name: &str) -> FileBlob {
        FileBlob::new(name, "video/mp4", vec![0; 16])
    }

    fn document(name: &str) -> FileBlob {
        FileBlob::new(name, "application/pdf", vec![b'%'])
    }

    #[tokio::test]
    async fn image_thumbnail_is_immediate_reference() {
        let kit = kit(StubDecoder::ok(Duration::ZERO));
        let file = image("a.png");
        let thumb = kit.file_thumbnail(&file).unwrap();
        assert!(thumb.is_ready());

        let url = thumb.resolve().await.unwrap();
        let resolved = kit.object_urls().resolve(&url).unwrap();
        assert!(resolved.same_data(&file));
    }

    #[tokio::test]
    async fn video_thumbnail_is_pending_png_data_url() {
        let kit = kit(StubDecoder::ok(Duration::ZERO));
        let file = video("clip.mp4");
        let thumb = kit.file_thumbnail(&file).unwrap();
        assert!(!thumb.is_ready());
        let url = thumb.resolve().await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(kit.object_urls().live_count(), 0);
    }

    #[tokio::test]
    async fn other_types_have_no_thumbnail() {
        let kit = kit(StubDecoder::ok(Duration::ZERO));
        assert!(kit.file_thumbnail(&document("a.pdf")).is_none());
        let audio = FileBlob::new("a.ogg", "audio/ogg", vec![0]);
        assert!(kit.file_thumbnail(&audio).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_video_times_out() {
        let kit = kit(StubDecoder::ok(Duration::from_secs(3600)));
        let err = kit.video_thumbnail(&video("stuck.mp4")).await.unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
    }

    #[tokio::test]
    async fn attachments_preserve_order_and_count() {
        let kit = kit(StubDecoder::ok(Duration::ZERO));
        let files = vec![video("1.mp4"), image("2.png"), document("3.pdf"), image("4.png")];
        let attachments = kit.files_to_attachments(files).await;

        let names: Vec<_> = attachments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["1.mp4", "2.png", "3.pdf", "4.png"]);
        assert!(attachments[0].url.as_deref().unwrap().starts_with("data:image/png"));
        assert!(attachments[1].url.as_deref().unwrap().starts_with("blob:attachkit/"));
        assert!(attachments[2].url.is_none());
        assert_eq!(attachments[2].content_type, "application/pdf");
        assert!(attachments.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn failed_video_degrades_to_no_url() {
        let kit = kit(StubDecoder::failing());
        let attachments = kit.files_to_attachments(vec![video("bad.mp4"), image("ok.png")]).await;
        assert_eq!(attachments.len(), 2);
        assert!(attachments[0].url.is_none());
        assert!(attachments[0].file.is_some());
        assert!(attachments[1].url.is_some());
    }

    #[tokio::test]
    async fn concurrent_variant_keeps_input_order() {
        let decoder = Arc::new(StubDecoder::ok(Duration::from_millis(20)));
        let kit = Toolkit::new(ToolkitConfig::default())
            .unwrap()
            .with_decoder(decoder.clone());
        let files = vec![video("a.mp4"), image("b.png"), video("c.mp4"), document("d.pdf")];
        let attachments = kit.files_to_attachments_concurrent(files, 3).await;

        let names: Vec<_> = attachments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.png", "c.mp4", "d.pdf"]);
        assert!(attachments.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn release_revokes_object_urls_only() {
        let kit = kit(StubDecoder::ok(Duration::ZERO));
        let attachments = kit
            .files_to_attachments(vec![image("a.png"), video("b.mp4"), image("c.png")])
            .await;
        assert_eq!(kit.object_urls().live_count(), 2);

        assert_eq!(kit.release_attachments(&attachments), 2);
        assert_eq!(kit.object_urls().live_count(), 0);
        assert_eq!(kit.release_attachments(&attachments), 0);
    }

    #[tokio::test]
    async fn select_file_uses_configured_picker() {
        let kit = kit(StubDecoder::ok(Duration::ZERO))
            .with_picker(Arc::new(StaticPicker::Choose(image("pick.png"))));
        let picked = kit.select_file(Some("image/png"), None).await.unwrap();
        assert_eq!(picked.unwrap().name(), "pick.png");
    }

    #[tokio::test]
    async fn url_to_file_round_trips_object_urls() {
        let kit = kit(StubDecoder::ok(Duration::ZERO));
        let file = image("a.png");
        let url = kit.image_thumbnail(&file);
        let back = kit.url_to_file(&url, Some("a.png")).await.unwrap();
        assert!(back.same_data(&file));
        assert_eq!(back.content_type(), "image/png");
    }
}
