//! Upstream seams: the AI text source and plain HTTP fetches.
//!
//! Both are traits so the fetch chains can run against scripted sources in
//! tests. Every call made by a chain goes through [`with_timeout`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::decode::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no credential available")]
    NoCredential,
    #[error("request failed: {0}")]
    Request(String),
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream returned no content")]
    Empty,
    #[error("malformed payload: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

impl From<DecodeError> for FetchError {
    fn from(err: DecodeError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Per-call switches for the text-generation source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerateOptions {
    /// Ground the answer with web search.
    pub web_search: bool,
    /// Ask for a raw JSON body (ignored by sources that cannot combine it
    /// with search).
    pub json_response: bool,
}

#[async_trait]
pub trait TextSource: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String, FetchError>;
}

#[async_trait]
pub trait HttpSource: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Bound an upstream call. Elapsing is reported as [`FetchError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

/// reqwest-backed [`HttpSource`].
#[derive(Clone)]
pub struct ReqwestHttp {
    client: Client,
}

impl ReqwestHttp {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSource for ReqwestHttp {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(concat!("ticker-daemon/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_maps_elapsed() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, FetchError>("late")
        };
        let err = with_timeout(Duration::from_secs(5), slow).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_passes_through() {
        let fast = async { Ok::<_, FetchError>(7) };
        assert_eq!(with_timeout(Duration::from_secs(5), fast).await.unwrap(), 7);

        let failing = async { Err::<u8, _>(FetchError::Empty) };
        assert!(matches!(
            with_timeout(Duration::from_secs(5), failing).await,
            Err(FetchError::Empty)
        ));
    }
}
