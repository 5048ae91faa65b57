//! News chain: AI headline summary, then syndication feeds, then a fixed
//! "unavailable" placeholder.

use std::collections::HashSet;

use futures_util::future::join_all;
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::Upstreams;
use crate::sources::FetchError;

/// Shown as the only item when every source failed.
pub const UNAVAILABLE_ITEM: &str = "Không thể tải tin tức vào lúc này. Vui lòng thử lại sau.";
/// Error text that replaces the strip while the news source is down.
pub const UPDATING_ERROR: &str = "Đang cập nhật...";

#[derive(Debug, Clone, PartialEq)]
pub struct NewsOutcome {
    pub items: Vec<String>,
    pub error: Option<String>,
}

impl NewsOutcome {
    fn items(items: Vec<String>) -> Self {
        Self { items, error: None }
    }

    fn unavailable() -> Self {
        Self {
            items: vec![UNAVAILABLE_ITEM.to_string()],
            error: Some(UPDATING_ERROR.to_string()),
        }
    }
}

pub struct NewsChain {
    upstreams: Upstreams,
    feeds: Vec<String>,
    proxy_url: Option<String>,
    headline_count: usize,
}

impl NewsChain {
    pub fn new(
        upstreams: Upstreams,
        feeds: Vec<String>,
        proxy_url: Option<String>,
        headline_count: usize,
    ) -> Self {
        Self {
            upstreams,
            feeds,
            proxy_url,
            headline_count: headline_count.max(1),
        }
    }

    /// `use_ai` selects the AI headline query as the primary source; without
    /// it the chain starts at the feeds.
    pub async fn fetch(&self, use_ai: bool) -> NewsOutcome {
        if use_ai {
            match self.headlines_from_ai().await {
                Ok(items) => {
                    info!("[news] {} AI headlines", items.len());
                    return NewsOutcome::items(items);
                }
                Err(e) => warn!("[news] AI headlines failed, falling back to feeds: {}", e),
            }
        }

        let items = self.headlines_from_feeds().await;
        if items.is_empty() {
            warn!("[news] no items from any feed");
            return NewsOutcome::unavailable();
        }
        info!("[news] {} unique feed items", items.len());
        NewsOutcome::items(items)
    }

    async fn headlines_from_ai(&self) -> Result<Vec<String>, FetchError> {
        let prompt = headline_prompt(self.headline_count);
        let items: Vec<String> = self.upstreams.ask_json("news", &prompt).await?;
        let items: Vec<String> = items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if items.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(items)
    }

    /// All feeds in parallel; a failing feed contributes nothing.
    async fn headlines_from_feeds(&self) -> Vec<String> {
        let fetches = self.feeds.iter().map(|feed| async move {
            let url = self.feed_url(feed);
            let result = match self.upstreams.get_text(&url).await {
                Ok(xml) => parse_feed(&xml),
                Err(e) => Err(e),
            };
            (feed, result)
        });

        let mut all = Vec::new();
        for (feed, result) in join_all(fetches).await {
            match result {
                Ok(items) => {
                    debug!("[news] {} items from {}", items.len(), feed);
                    all.extend(items);
                }
                Err(e) => warn!("[news] feed {} failed: {}", feed, e),
            }
        }
        dedup_preserving_order(all)
    }

    fn feed_url(&self, feed: &str) -> String {
        match &self.proxy_url {
            Some(proxy) => reqwest::Url::parse_with_params(proxy, &[("url", feed)])
                .map(String::from)
                .unwrap_or_else(|_| feed.to_string()),
            None => feed.to_string(),
        }
    }
}

fn headline_prompt(count: usize) -> String {
    format!(
        "Liệt kê {count} tin tức nóng hổi, quan trọng nhất tại Việt Nam và thế giới trong giờ qua. \
         Trả về dưới dạng một mảng JSON các chuỗi tóm tắt. \
         Ví dụ: [\"Tóm tắt tin tức 1\", \"Tóm tắt tin tức 2\"]"
    )
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    description: Option<String>,
}

/// Readable text of every entry's description, blanks dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<String>, FetchError> {
    let doc: RssDocument =
        quick_xml::de::from_str(xml).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(doc
        .channel
        .items
        .into_iter()
        .filter_map(|item| item.description)
        .map(|markup| markup_to_text(&markup))
        .filter(|text| !text.is_empty())
        .collect())
}

/// Strip tags from an HTML fragment and collapse whitespace.
pub fn markup_to_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rss, Reply, Scripted};
    use std::sync::Arc;
    use std::time::Duration;

    const FEED_A: &str = "https://feeds.example/a.rss";
    const FEED_B: &str = "https://feeds.example/b.rss";

    fn chain(ai: Scripted, http: Scripted) -> (NewsChain, Arc<Scripted>, Arc<Scripted>) {
        let ai = Arc::new(ai);
        let http = Arc::new(http);
        let upstreams = Upstreams {
            ai: ai.clone(),
            http: http.clone(),
            timeout: Duration::from_secs(5),
            web_search: true,
        };
        let chain = NewsChain::new(
            upstreams,
            vec![FEED_A.to_string(), FEED_B.to_string()],
            None,
            10,
        );
        (chain, ai, http)
    }

    #[test]
    fn test_parse_feed_extracts_text_from_cdata_html() {
        let xml = rss(&[
            r#"<a href="https://x/1"><img src="https://x/1.jpg" /></a>Mưa lớn ở <b>Hà Nội</b>.  "#,
            "   ",
            "Giá xăng giảm",
        ]);
        let items = parse_feed(&xml).unwrap();
        assert_eq!(items, vec!["Mưa lớn ở Hà Nội.", "Giá xăng giảm"]);
    }

    #[test]
    fn test_parse_feed_handles_escaped_markup() {
        let xml = r#"<rss version="2.0"><channel><title>x</title>
            <item><description>&lt;p&gt;Tin &amp;amp; ảnh&lt;/p&gt;</description></item>
            <item><title>no description</title></item>
        </channel></rss>"#;
        assert_eq!(parse_feed(xml).unwrap(), vec!["Tin & ảnh"]);
    }

    #[test]
    fn test_parse_feed_rejects_non_xml() {
        assert!(parse_feed("<html><body>502 Bad Gateway").is_err());
    }

    #[test]
    fn test_markup_to_text() {
        assert_eq!(markup_to_text("<div>\n  A <i>b</i>\tc </div>"), "A b c");
        assert_eq!(markup_to_text("plain"), "plain");
    }

    #[tokio::test]
    async fn test_feed_fallback_dedups_across_feeds() {
        let http = Scripted::new()
            .on(FEED_A, Reply::text(rss(&["Tin chung", "Tin A"])))
            .on(FEED_B, Reply::text(rss(&["Tin B", "Tin chung"])));
        let (chain, ai, _) = chain(Scripted::new(), http);

        let outcome = chain.fetch(false).await;
        assert_eq!(outcome.items, vec!["Tin chung", "Tin A", "Tin B"]);
        assert_eq!(outcome.error, None);
        assert!(ai.calls().is_empty(), "normal mode starts at the feeds");
    }

    #[tokio::test]
    async fn test_failing_feed_contributes_nothing() {
        let http = Scripted::new()
            .on(FEED_A, Reply::Fail)
            .on(FEED_B, Reply::text(rss(&["Tin B"])));
        let (chain, _, _) = chain(Scripted::new(), http);
        assert_eq!(chain.fetch(false).await.items, vec!["Tin B"]);
    }

    #[tokio::test]
    async fn test_ai_headlines_are_primary_when_requested() {
        let ai = Scripted::new().on(
            "tin tức nóng hổi",
            Reply::text("```json\n[\"Một\", \" \", \"Hai\"]\n```"),
        );
        let (chain, _, http) = chain(ai, Scripted::new());

        let outcome = chain.fetch(true).await;
        assert_eq!(outcome.items, vec!["Một", "Hai"]);
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ai_garbage_falls_through_to_feeds() {
        let ai = Scripted::new().on("tin tức nóng hổi", Reply::text("không có tin"));
        let http = Scripted::new()
            .on(FEED_A, Reply::text(rss(&["Tin A"])))
            .on(FEED_B, Reply::Fail);
        let (chain, _, _) = chain(ai, http);
        assert_eq!(chain.fetch(true).await.items, vec!["Tin A"]);
    }

    #[tokio::test]
    async fn test_everything_failing_yields_placeholder() {
        let (chain, _, _) = chain(Scripted::new(), Scripted::new());
        let outcome = chain.fetch(true).await;
        assert_eq!(outcome.items, vec![UNAVAILABLE_ITEM]);
        assert_eq!(outcome.error.as_deref(), Some(UPDATING_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_feed_times_out() {
        let http = Scripted::new()
            .on(FEED_A, Reply::Hang)
            .on(FEED_B, Reply::text(rss(&["Tin B"])));
        let (chain, _, _) = chain(Scripted::new(), http);
        assert_eq!(chain.fetch(false).await.items, vec!["Tin B"]);
    }

    #[test]
    fn test_proxy_url_wraps_feed() {
        let upstreams = Upstreams {
            ai: Arc::new(Scripted::new()),
            http: Arc::new(Scripted::new()),
            timeout: Duration::from_secs(1),
            web_search: false,
        };
        let chain = NewsChain::new(
            upstreams,
            vec![],
            Some("https://proxy.example/raw".to_string()),
            10,
        );
        assert_eq!(
            chain.feed_url("https://baotintuc.vn/thoi-su.rss"),
            "https://proxy.example/raw?url=https%3A%2F%2Fbaotintuc.vn%2Fthoi-su.rss"
        );
    }
}
