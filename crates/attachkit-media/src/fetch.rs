use std::time::Duration;

use async_trait::async_trait;
use attachkit_core::file::guess_content_type;
use attachkit_core::{FileBlob, MediaError};
use base64::Engine;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::object_url::ObjectUrlRegistry;

/// Body and declared type of a fetched resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Transport for remote (`http`/`https`) resources.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the body at `url`. Only transport failures are errors;
    /// an HTTP error status still yields its body.
    async fn fetch(&self, url: &Url) -> Result<Fetched, MediaError>;
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::Network(format!("build http client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Fetched, MediaError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MediaError::Network(format!("GET {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            warn!("GET {url} returned {status}, using response body as-is");
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| essence(v).to_string());
        let body = resp
            .bytes()
            .await
            .map_err(|e| MediaError::Network(format!("read body of {url}: {e}")))?;
        Ok(Fetched { content_type, body })
    }
}

/// Resolve any supported URL to a named file.
///
/// `http`/`https` go through `fetcher`, `blob:` handles through `registry`,
/// `data:` URLs are decoded inline and `file:` URLs read from disk.
pub async fn url_to_file(
    fetcher: &dyn Fetcher,
    registry: &ObjectUrlRegistry,
    url: &str,
    file_name: Option<&str>,
) -> Result<FileBlob, MediaError> {
    let name = file_name.unwrap_or(url);
    let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl(format!("{url}: {e}")))?;
    debug!("resolving {} url for {name}", parsed.scheme());

    let (content_type, body) = match parsed.scheme() {
        "http" | "https" => {
            let fetched = fetcher.fetch(&parsed).await?;
            (fetched.content_type, fetched.body)
        }
        "blob" => {
            let file = registry
                .resolve(url)
                .ok_or_else(|| MediaError::Network(format!("{url}: no such object url")))?;
            (Some(file.content_type().to_string()), file.data().clone())
        }
        "data" => {
            let (content_type, body) = decode_data_url(url)?;
            (Some(content_type), body)
        }
        "file" => {
            let path = parsed
                .to_file_path()
                .map_err(|_| MediaError::InvalidUrl(format!("{url}: not a local path")))?;
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| MediaError::Network(format!("read {}: {e}", path.display())))?;
            (Some(guess_content_type(&path)), Bytes::from(data))
        }
        other => {
            return Err(MediaError::InvalidUrl(format!(
                "{url}: unsupported scheme '{other}'"
            )))
        }
    };

    Ok(FileBlob::new(name, content_type.unwrap_or_default(), body))
}

/// Split a `data:[<type>][;base64],<payload>` URL into its type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Bytes), MediaError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::InvalidUrl(format!("{url}: not a data url")))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::InvalidUrl("data url without ','".into()))?;

    let (meta, is_base64) = match meta.rsplit_once(';') {
        Some((m, marker)) if marker.trim().eq_ignore_ascii_case("base64") => (m, true),
        _ => (meta, false),
    };
    let content_type = match essence(meta) {
        "" => "text/plain".to_string(),
        t => t.to_string(),
    };
    // The payload is percent-encoded in both forms; base64 is decoded after.
    let raw: Vec<u8> = percent_decode_str(payload).collect();
    let body = if is_base64 {
        let compact: Vec<u8> = raw
            .into_iter()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| MediaError::Network(format!("data url payload: {e}")))?
    } else {
        raw
    };
    Ok((content_type, Bytes::from(body)))
}

fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}
