//! Operator-requested breaking topics.
//!
//! A request is validated synchronously, then answered by one AI query in a
//! spawned task. The result reaches the core as
//! [`CoreEvent::TopicResolved`]; the core owns every state change.

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::CoreEvent;
use crate::fetch::Upstreams;
use crate::sources::FetchError;

pub const MAX_SUMMARIES: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ManualRequestError {
    #[error("chủ đề không được để trống")]
    EmptyTopic,
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("AI không trả về dữ liệu hợp lệ")]
    Invalid,
}

/// A validated topic request.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRequest {
    pub topic: String,
    pub count: u32,
}

/// Accepted answer to a topic request.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualNews {
    pub title: String,
    pub summaries: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TopicPayload {
    title: Option<String>,
    summaries: Option<Vec<String>>,
}

pub struct BreakingNewsController {
    upstreams: Upstreams,
    tx: mpsc::Sender<CoreEvent>,
}

impl BreakingNewsController {
    pub fn new(upstreams: Upstreams, tx: mpsc::Sender<CoreEvent>) -> Self {
        Self { upstreams, tx }
    }

    /// Trim the topic and clamp the summary count into `1..=50`.
    pub fn validate(topic: &str, count: u32) -> Result<TopicRequest, ManualRequestError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ManualRequestError::EmptyTopic);
        }
        Ok(TopicRequest {
            topic: topic.to_string(),
            count: count.clamp(1, MAX_SUMMARIES),
        })
    }

    pub fn request(&self, request: TopicRequest) {
        let upstreams = self.upstreams.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = Self::query(&upstreams, &request).await;
            if let Err(e) = &result {
                warn!("[breaking] topic {:?} failed: {}", request.topic, e);
            }
            let _ = tx.send(CoreEvent::TopicResolved(result)).await;
        });
    }

    pub async fn query(
        upstreams: &Upstreams,
        request: &TopicRequest,
    ) -> Result<ManualNews, ManualRequestError> {
        let prompt = topic_prompt(request);
        let payload: TopicPayload = upstreams.ask_json("breaking", &prompt).await?;

        let title = payload
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ManualRequestError::Invalid)?;
        let summaries: Vec<String> = payload
            .summaries
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if summaries.is_empty() {
            return Err(ManualRequestError::Invalid);
        }

        info!("[breaking] {:?}: {} summaries", title, summaries.len());
        Ok(ManualNews { title, summaries })
    }
}

fn topic_prompt(request: &TopicRequest) -> String {
    format!(
        "Tạo JSON với khóa \"title\" (tiêu đề siêu ngắn cho \"{}\") và \"summaries\" (mảng {} tóm tắt tin tức liên quan).",
        request.topic, request.count
    )
}

/// Message shown in the manual panel after a failed request.
pub fn panel_error(err: &ManualRequestError) -> String {
    format!("Lỗi: {}. Thử lại.", err)
}
