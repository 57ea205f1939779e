use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use attachkit_media::{
    compress_file, CompressOptions, Compression, FileBlob, FileInput, MismatchCallback, Toolkit,
};
use futures::FutureExt;
use tracing::{info, warn};

use crate::config::Command;

pub async fn run(kit: &Toolkit, command: Command) -> Result<()> {
    match command {
        Command::Fetch { url, name, out } => {
            let file = fetch(kit, &url, name.as_deref(), &out).await?;
            println!(
                "{} ({}, {} bytes) -> {}",
                file.name(),
                file.content_type(),
                file.size(),
                out.display()
            );
        }
        Command::Inspect { paths, concurrency } => {
            println!("{}", inspect(kit, &paths, concurrency).await?);
        }
        Command::Compress {
            path,
            quality,
            content_type,
            out,
        } => {
            let options = CompressOptions {
                quality,
                content_type,
                max_pixels: kit.config().max_pixels,
            };
            let outcome = compress(&path, &options, &out).await?;
            println!("{}", describe(&outcome));
        }
        Command::Pick { accept } => match pick(kit, accept.as_deref()).await? {
            Some(file) => println!(
                "{} ({}, {} bytes)",
                file.name(),
                file.content_type(),
                file.size()
            ),
            None => println!("no file selected"),
        },
        Command::Preflight => crate::preflight::run_all(kit).await?,
    }
    Ok(())
}

pub async fn fetch(kit: &Toolkit, url: &str, name: Option<&str>, out: &Path) -> Result<FileBlob> {
    let file = kit
        .url_to_file(url, name)
        .await
        .with_context(|| format!("fetch {url}"))?;
    tokio::fs::write(out, file.data())
        .await
        .with_context(|| format!("write {}", out.display()))?;
    Ok(file)
}

/// Attachment records for `paths` as pretty JSON. Reference URLs are
/// released before returning since they die with the process anyway.
pub async fn inspect(kit: &Toolkit, paths: &[PathBuf], concurrency: usize) -> Result<String> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(FileBlob::from_path(path).await?);
    }
    let attachments = if concurrency > 1 {
        kit.files_to_attachments_concurrent(files, concurrency).await
    } else {
        kit.files_to_attachments(files).await
    };
    let json = serde_json::to_string_pretty(&attachments).context("serialize attachments")?;
    kit.release_attachments(&attachments);
    Ok(json)
}

pub async fn compress(path: &Path, options: &CompressOptions, out: &Path) -> Result<Compression> {
    let file = FileBlob::from_path(path).await?;
    let outcome = compress_file(file, options)
        .await
        .with_context(|| format!("compress {}", path.display()))?;
    tokio::fs::write(out, outcome.file().data())
        .await
        .with_context(|| format!("write {}", out.display()))?;
    Ok(outcome)
}

pub fn describe(outcome: &Compression) -> String {
    match outcome {
        Compression::Unchanged(file) => format!("unchanged: {} bytes", file.size()),
        Compression::Compressed(file) => {
            format!("compressed: {} bytes ({})", file.size(), file.content_type())
        }
        Compression::Fallback { file, reason } => {
            format!("not compressed ({reason:?}): {} bytes", file.size())
        }
    }
}

pub async fn pick(kit: &Toolkit, accept: Option<&str>) -> Result<Option<FileBlob>> {
    let on_mismatch: MismatchCallback = Box::new(|input: FileInput| {
        async move {
            warn!(
                "selected file does not match {}",
                input.accept().unwrap_or("the requested type")
            );
        }
        .boxed()
    });
    let file = kit.select_file(accept, Some(on_mismatch)).await?;
    if let Some(file) = &file {
        info!("selected {}", file.name());
    }
    Ok(file)
}
