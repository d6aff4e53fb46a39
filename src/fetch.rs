use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::FetchError;

/// Retrieves the text body behind a resolved candidate URL.
#[async_trait]
pub trait FragmentFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Fetcher for `http`/`https` URLs, with `file` URLs read straight from
/// disk so local documents expand offline.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// No request timeout: a hung fetch stalls only the host element that
    /// issued it.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().build()?,
        })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl FragmentFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        match url.scheme() {
            "http" | "https" => {
                let response = self
                    .http
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|source| FetchError::Transport {
                        url: url.clone(),
                        source,
                    })?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                        reason: status
                            .canonical_reason()
                            .unwrap_or("unknown status")
                            .to_string(),
                    });
                }
                response.text().await.map_err(|source| FetchError::Body {
                    url: url.clone(),
                    source,
                })
            }
            "file" => {
                let path: PathBuf = url.to_file_path().map_err(|()| FetchError::Scheme {
                    url: url.clone(),
                    scheme: "file".to_string(),
                })?;
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| FetchError::Io {
                        url: url.clone(),
                        source,
                    })
            }
            other => Err(FetchError::Scheme {
                url: url.clone(),
                scheme: other.to_string(),
            }),
        }
    }
}
