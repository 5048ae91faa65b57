//! Scripted upstream sources for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::sources::{FetchError, GenerateOptions, HttpSource, TextSource};

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    /// Never resolves; only a timeout gets the caller out.
    Hang,
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    async fn resolve(self) -> Result<String, FetchError> {
        match self {
            Reply::Text(s) => Ok(s),
            Reply::Fail => Err(FetchError::Request("scripted failure".to_string())),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Answers each call with the reply of the first rule whose marker occurs in
/// the prompt (or URL). Unmatched calls fail.
#[derive(Default)]
pub struct Scripted {
    rules: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, marker: impl Into<String>, reply: Reply) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((marker.into(), reply));
        self
    }

    /// Replace the reply for an existing marker (or add it).
    pub fn set(&self, marker: &str, reply: Reply) {
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|(m, _)| m == marker) {
            Some(rule) => rule.1 = reply,
            None => rules.push((marker.to_string(), reply)),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, marker: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(marker))
            .count()
    }

    fn reply_for(&self, input: &str) -> Reply {
        self.calls.lock().unwrap().push(input.to_string());
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|(marker, _)| input.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Fail)
    }
}

#[async_trait]
impl TextSource for Scripted {
    async fn generate(&self, prompt: &str, _options: GenerateOptions) -> Result<String, FetchError> {
        self.reply_for(prompt).resolve().await
    }
}

#[async_trait]
impl HttpSource for Scripted {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.reply_for(url).resolve().await
    }
}

pub fn rss(descriptions: &[&str]) -> String {
    let items: String = descriptions
        .iter()
        .map(|d| format!("<item><title>t</title><description><![CDATA[{d}]]></description></item>"))
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>feed</title>{items}</channel></rss>"#)
}
