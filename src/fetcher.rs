use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Response};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_retry::Retry;
use url::Url;

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{FetchError, FetchErrorKind};

/// A document held in memory.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Where the request ended up after redirects.
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// A response body streamed to disk.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub content_type: Option<String>,
    pub bytes_written: u64,
}

/// GETs URLs with one shared client identity and a bounded retry loop.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: &ClientConfig, retry: RetryPolicy) -> reqwest::Result<Self> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, retry })
    }

    /// Fetches `url` into memory.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        let mut attempts = 0;
        let result = Retry::spawn(self.retry.delays(), || {
            attempts += 1;
            let attempt = attempts;
            async move {
                self.attempt_fetch(url, attempt)
                    .await
                    .inspect_err(|e| log::debug!("GET {} attempt {} failed: {}", url, attempt, e))
            }
        })
        .await;

        result.map_err(|kind| FetchError {
            url: url.to_string(),
            attempts,
            kind,
        })
    }

    /// Streams `url` into `destination`, creating parent directories as needed.
    ///
    /// The body goes to a `.part` sibling first and only replaces `destination`
    /// once it is complete, so a failed download never touches an existing file.
    pub async fn fetch_to_file(&self, url: &Url, destination: &Path) -> Result<FetchedFile, FetchError> {
        let mut attempts = 0;
        let result = Retry::spawn(self.retry.delays(), || {
            attempts += 1;
            let attempt = attempts;
            async move {
                self.attempt_download(url, destination, attempt)
                    .await
                    .inspect_err(|e| log::debug!("GET {} attempt {} failed: {}", url, attempt, e))
            }
        })
        .await;

        result.map_err(|kind| FetchError {
            url: url.to_string(),
            attempts,
            kind,
        })
    }

    async fn attempt_fetch(&self, url: &Url, attempt: usize) -> Result<FetchedDocument, FetchErrorKind> {
        log::debug!("GET {} (attempt {}/{})", url, attempt, self.retry.max_attempts);
        let response = self.send(url).await?;
        let final_url = response.url().clone();
        let content_type = content_type_of(&response);
        let body = response.bytes().await?.to_vec();

        Ok(FetchedDocument {
            final_url,
            content_type,
            body,
        })
    }

    async fn attempt_download(
        &self,
        url: &Url,
        destination: &Path,
        attempt: usize,
    ) -> Result<FetchedFile, FetchErrorKind> {
        log::debug!("GET {} -> {:?} (attempt {}/{})", url, destination, attempt, self.retry.max_attempts);
        let response = self.send(url).await?;
        let content_type = content_type_of(&response);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(destination);
        let bytes_written = match stream_to(response, &partial).await {
            Ok(bytes_written) => bytes_written,
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&partial).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Could not remove partial download {:?}: {}", partial, remove_err);
                    }
                }
                return Err(e);
            }
        };
        fs::rename(&partial, destination).await?;

        Ok(FetchedFile {
            content_type,
            bytes_written,
        })
    }

    async fn send(&self, url: &Url) -> Result<Response, FetchErrorKind> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchErrorKind::Status(status));
        }
        Ok(response)
    }
}

async fn stream_to(response: Response, path: &Path) -> Result<u64, FetchErrorKind> {
    let mut file = fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut bytes_written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(bytes_written)
}

/// `logo.png` -> `logo.png.part`, in the same directory.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

fn content_type_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
