//! Background refresh jobs. Each job runs its chain in its own task and
//! reports back through the core channel; jobs never wait on each other.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use ticker_proto::config::Config;
use ticker_proto::data::{MarketData, WeatherData};

use crate::core::CoreEvent;
use crate::fetch::market::MarketChain;
use crate::fetch::news::{NewsChain, NewsOutcome};
use crate::fetch::weather::WeatherChain;
use crate::fetch::Upstreams;

/// Result of one category job, applied to the session as a whole.
#[derive(Debug, Clone)]
pub enum CategoryUpdate {
    /// `None` once every weather source failed.
    Weather(Option<Vec<WeatherData>>),
    Market(MarketData),
}

#[derive(Debug)]
pub struct NewsLoaded {
    pub generation: u64,
    pub outcome: NewsOutcome,
}

pub struct BackgroundDataOrchestrator {
    news: Arc<NewsChain>,
    weather: Arc<WeatherChain>,
    market: Arc<MarketChain>,
    tx: mpsc::Sender<CoreEvent>,
}

impl BackgroundDataOrchestrator {
    pub fn new(upstreams: Upstreams, config: &Config, tx: mpsc::Sender<CoreEvent>) -> Self {
        let news = NewsChain::new(
            upstreams.clone(),
            config.news.feeds.clone(),
            config.news.proxy_url.clone(),
            config.news.headline_count,
        );
        let weather = WeatherChain::new(
            upstreams.clone(),
            config.weather.forecast_url.clone(),
            config.weather.timezone.clone(),
        );
        let market = MarketChain::new(upstreams);
        Self {
            news: Arc::new(news),
            weather: Arc::new(weather),
            market: Arc::new(market),
            tx,
        }
    }

    /// Start the weather and market jobs. Each reports as soon as it
    /// resolves.
    pub fn run_cycle(&self) {
        debug!("[orchestrator] cycle start");

        let weather = self.weather.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let update = CategoryUpdate::Weather(weather.fetch().await);
            let _ = tx.send(CoreEvent::CategoryLoaded(update)).await;
        });

        let market = self.market.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let update = CategoryUpdate::Market(market.fetch().await);
            let _ = tx.send(CoreEvent::CategoryLoaded(update)).await;
        });
    }

    /// Start a news job tagged with `generation` so the core can discard it
    /// if something newer replaced the strip meanwhile.
    pub fn refresh_news(&self, generation: u64, use_ai: bool) {
        debug!("[orchestrator] news refresh gen={} ai={}", generation, use_ai);
        let news = self.news.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = news.fetch(use_ai).await;
            let _ = tx
                .send(CoreEvent::NewsLoaded(NewsLoaded { generation, outcome }))
                .await;
        });
    }
}
