//! Fallback fetch chains, one per data concern.
//!
//! A chain tries the AI source first and walks down its fallbacks on any
//! failure: no credential, transport error, timeout, empty answer or an
//! undecodable payload. Chains never return an error to their caller.

pub mod market;
pub mod news;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::decode::{decode_fenced_json, excerpt};
use crate::sources::{with_timeout, FetchError, GenerateOptions, HttpSource, TextSource};

/// Upstream handles shared by every chain.
#[derive(Clone)]
pub struct Upstreams {
    pub ai: Arc<dyn TextSource>,
    pub http: Arc<dyn HttpSource>,
    /// Bound for each individual upstream call.
    pub timeout: Duration,
    pub web_search: bool,
}

impl Upstreams {
    /// Run one AI query and decode its structured answer.
    pub async fn ask_json<T: DeserializeOwned>(
        &self,
        tag: &str,
        prompt: &str,
    ) -> Result<T, FetchError> {
        let options = GenerateOptions {
            web_search: self.web_search,
            json_response: true,
        };
        let text = with_timeout(self.timeout, self.ai.generate(prompt, options)).await?;
        decode_fenced_json(&text).map_err(|e| {
            warn!("[{}] could not decode AI payload: {} | raw: {}", tag, e, excerpt(&text));
            FetchError::from(e)
        })
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        with_timeout(self.timeout, self.http.get_text(url)).await
    }
}
