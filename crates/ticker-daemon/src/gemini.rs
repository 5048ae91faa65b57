//! Gemini REST client used as the primary source for every category.
//!
//! Each call takes the next key from the shared [`KeyRotationPool`]; an empty
//! pool short-circuits with [`FetchError::NoCredential`] before any request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::keys::KeyRotationPool;
use crate::sources::{FetchError, GenerateOptions, TextSource};

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    keys: Arc<KeyRotationPool>,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        keys: Arc<KeyRotationPool>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            keys,
        }
    }

    fn build_request(prompt: &str, options: GenerateOptions) -> GenerateContentRequest {
        let tools = options.web_search.then(|| {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        });
        // The API rejects a JSON mime type combined with search tools; the
        // fenced decoder copes with free text instead.
        let generation_config = (options.json_response && !options.web_search).then(|| {
            GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }
        });
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            tools,
            generation_config,
        }
    }
}

#[async_trait]
impl TextSource for GeminiClient {
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String, FetchError> {
        let credential = self.keys.next().ok_or(FetchError::NoCredential)?;
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        debug!(
            "[gemini] generateContent model={} key#={} search={}",
            self.model, credential.index, options.web_search
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", credential.key.as_str())])
            .json(&Self::build_request(prompt, options))
            .send()
            .await
            // reqwest errors carry the URL, which includes the key
            .map_err(|e| FetchError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorWrapper>(&body)
                .ok()
                .and_then(|w| w.error.message)
                .unwrap_or(body);
            warn!("[gemini] key#{} rejected: {} {}", credential.index, status, message);
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.without_url().to_string()))?;
        extract_text(parsed)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, FetchError> {
    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(text)
}
