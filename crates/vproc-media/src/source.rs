//! Source locator resolution.
//!
//! `http(s)://` locators are downloaded into the job's scratch directory;
//! `file://` URLs and bare paths are used in place.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};

/// A locator after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(Url),
    Local(PathBuf),
}

impl Source {
    /// Classify a locator without touching the network or filesystem.
    pub fn parse(locator: &str) -> MediaResult<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(MediaError::source_unreachable(locator, "empty locator"));
        }

        match Url::parse(locator) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Source::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Source::Local)
                    .map_err(|_| MediaError::source_unreachable(locator, "invalid file URL")),
                scheme => Err(MediaError::source_unreachable(
                    locator,
                    format!("unsupported scheme '{}'", scheme),
                )),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Source::Local(PathBuf::from(locator))),
            Err(e) => Err(MediaError::source_unreachable(locator, e.to_string())),
        }
    }
}

/// Resolve `locator` to a readable local file.
///
/// Remote sources are streamed to `scratch/<name>.<ext>`, keeping the
/// extension of the URL path so FFmpeg can sniff the container.
pub async fn resolve(http: &Client, locator: &str, scratch: &Path, name: &str) -> MediaResult<PathBuf> {
    match Source::parse(locator)? {
        Source::Remote(url) => {
            let dest = scratch.join(download_name(&url, name));
            download(http, &url, &dest).await?;
            Ok(dest)
        }
        Source::Local(path) => {
            check_readable(locator, &path).await?;
            Ok(path)
        }
    }
}

fn download_name(url: &Url, name: &str) -> String {
    let ext = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match ext {
        Some(ext) => format!("{}.{}", name, ext.to_ascii_lowercase()),
        None => name.to_string(),
    }
}

async fn check_readable(locator: &str, path: &Path) -> MediaResult<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| MediaError::source_unreachable(locator, e.to_string()))?;

    if !metadata.is_file() {
        return Err(MediaError::source_unreachable(locator, "not a regular file"));
    }

    File::open(path)
        .await
        .map_err(|e| MediaError::source_unreachable(locator, e.to_string()))?;

    Ok(())
}

async fn download(http: &Client, url: &Url, dest: &Path) -> MediaResult<()> {
    debug!(url = %url, dest = %dest.display(), "Downloading source");

    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| MediaError::source_unreachable(url.as_str(), e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::source_unreachable(
            url.as_str(),
            format!("HTTP {}", status),
        ));
    }

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::source_unreachable(url.as_str(), e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    info!(url = %url, bytes = written, "Downloaded source");
    Ok(())
}
