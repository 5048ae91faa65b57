//! The single mutable aggregate owned by the core.

use chrono::{DateTime, Local};

use ticker_proto::data::WeatherData;
use ticker_proto::protocol::{
    format_news_text, CategoryData, InfoCategory, ManualPanelState, TickerSnapshot,
};

use crate::breaking::ManualNews;
use crate::gate::AnimationGate;
use crate::orchestrator::CategoryUpdate;
use crate::scheduler::{BarMutation, RotationScheduler, RotationTiming};

/// Mutation carried by a main-strip flip.
#[derive(Debug, Clone, PartialEq)]
pub enum MainMutation {
    ToggleBreaking,
    ManualTopic(ManualNews),
}

#[derive(Debug)]
pub struct Session {
    pub news_items: Vec<String>,
    pub news_error: Option<String>,
    pub category_data: CategoryData,
    pub is_breaking_mode: bool,
    pub breaking_title: Option<String>,
    pub main_gate: AnimationGate<MainMutation>,
    pub bar_gate: AnimationGate<BarMutation>,
    pub rotation: RotationScheduler,
    pub manual: ManualPanelState,
    /// Manual result that arrived while the main gate was busy.
    pub held_manual: Option<ManualNews>,
    /// Bumped whenever the strip is replaced; news jobs from older
    /// generations are discarded.
    pub news_generation: u64,
    pub config_error: Option<String>,
    pub last_refresh: Option<DateTime<Local>>,
}

impl Session {
    pub fn new(timing: RotationTiming) -> Self {
        Self {
            news_items: Vec::new(),
            news_error: None,
            category_data: CategoryData::default(),
            is_breaking_mode: false,
            breaking_title: None,
            main_gate: AnimationGate::new(),
            bar_gate: AnimationGate::new(),
            rotation: RotationScheduler::new(timing),
            manual: ManualPanelState::default(),
            held_manual: None,
            news_generation: 0,
            config_error: None,
            last_refresh: None,
        }
    }

    /// A manual topic owns the strip; the ordinary refresh stays out.
    pub fn manual_topic_active(&self) -> bool {
        self.breaking_title.is_some()
    }

    pub fn next_news_generation(&mut self) -> u64 {
        self.news_generation += 1;
        self.news_generation
    }

    pub fn set_news(&mut self, items: Vec<String>, error: Option<String>) {
        self.news_items = items;
        self.news_error = error;
    }

    /// Midpoint of a main-strip flip.
    pub fn apply_main(&mut self, mutation: MainMutation) {
        match mutation {
            MainMutation::ToggleBreaking => {
                self.is_breaking_mode = !self.is_breaking_mode;
                if !self.is_breaking_mode {
                    self.breaking_title = None;
                }
                self.set_news(Vec::new(), None);
            }
            MainMutation::ManualTopic(news) => {
                self.is_breaking_mode = true;
                self.breaking_title = Some(news.title.to_uppercase());
                self.set_news(news.summaries, None);
            }
        }
        self.news_generation += 1;
    }

    /// Replace the datasets an update covers; the rest are untouched.
    pub fn apply_category(&mut self, update: CategoryUpdate) {
        match update {
            CategoryUpdate::Weather(weather) => self.category_data.weather = weather,
            CategoryUpdate::Market(market) => {
                self.category_data.stocks_vn = Some(market.vietnam_stocks);
                self.category_data.stocks_world = Some(market.world_stocks);
                self.category_data.forex = Some(market.forex);
                self.category_data.gold = Some(market.gold_prices);
                self.category_data.fuel = Some(market.fuel_prices);
            }
        }
        self.last_refresh = Some(Local::now());
    }

    fn current_city(&self) -> Option<WeatherData> {
        if self.rotation.active() != Some(InfoCategory::Weather) {
            return None;
        }
        self.category_data
            .weather
            .as_ref()
            .and_then(|w| w.get(self.rotation.item_index()))
            .cloned()
    }

    pub fn snapshot(&self) -> TickerSnapshot {
        TickerSnapshot {
            rev: 0,
            news_items: self.news_items.clone(),
            news_error: self.news_error.clone(),
            news_text: format_news_text(&self.news_items, self.news_error.as_deref()),
            category_data: self.category_data.clone(),
            is_breaking_mode: self.is_breaking_mode,
            breaking_title: self.breaking_title.clone(),
            main_animation: self.main_gate.phase(),
            bar_animation: self.bar_gate.phase(),
            active_category: self.rotation.active(),
            active_sub_view: self.rotation.sub_view(),
            active_item_index: self.rotation.item_index(),
            current_city: self.current_city(),
            manual: self.manual.clone(),
            config_error: self.config_error.clone(),
            last_refresh: self.last_refresh,
        }
    }
}
