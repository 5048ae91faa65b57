use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::data::{ForexData, FuelPrices, GoldPrices, StockData, WeatherData};

/// Commands accepted by the ticker core (from the HTTP API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Operator switch: flip breaking mode on/off without a topic.
    ToggleBreaking,
    /// Operator-submitted breaking topic.
    RequestTopic { topic: String, count: u32 },
    OpenManualPanel,
    CloseManualPanel,
    /// Run a full refresh cycle now instead of waiting for the timer.
    Refresh,
}

/// Members of the bottom-bar rotation cycle, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoCategory {
    Weather,
    Stocks,
    Forex,
    Gold,
    Fuel,
}

pub const ROTATION_ORDER: [InfoCategory; 5] = [
    InfoCategory::Weather,
    InfoCategory::Stocks,
    InfoCategory::Forex,
    InfoCategory::Gold,
    InfoCategory::Fuel,
];

impl InfoCategory {
    /// Categories that alternate between a domestic and a world view.
    pub fn has_sub_views(self) -> bool {
        matches!(self, Self::Stocks | Self::Gold | Self::Fuel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubView {
    #[default]
    Domestic,
    World,
}

impl SubView {
    pub fn toggled(self) -> Self {
        match self {
            Self::Domestic => Self::World,
            Self::World => Self::Domestic,
        }
    }
}

/// Phase of a flip gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePhase {
    #[default]
    Idle,
    Flipping,
}

/// Loaded datasets keyed by category. `None` means never successfully
/// loaded (or dropped after a total failure), not "empty".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    pub weather: Option<Vec<WeatherData>>,
    #[serde(rename = "stocks-vn")]
    pub stocks_vn: Option<Vec<StockData>>,
    #[serde(rename = "stocks-world")]
    pub stocks_world: Option<Vec<StockData>>,
    pub forex: Option<Vec<ForexData>>,
    pub gold: Option<GoldPrices>,
    pub fuel: Option<FuelPrices>,
}

impl CategoryData {
    pub fn is_available(&self, category: InfoCategory) -> bool {
        match category {
            InfoCategory::Weather => self.weather.as_ref().is_some_and(|w| !w.is_empty()),
            InfoCategory::Stocks => self.stocks_vn.is_some() || self.stocks_world.is_some(),
            InfoCategory::Forex => self.forex.is_some(),
            InfoCategory::Gold => self.gold.is_some(),
            InfoCategory::Fuel => self.fuel.is_some(),
        }
    }

    /// Categories with data, in rotation order.
    pub fn available(&self) -> Vec<InfoCategory> {
        ROTATION_ORDER
            .into_iter()
            .filter(|c| self.is_available(*c))
            .collect()
    }

    pub fn weather_len(&self) -> usize {
        self.weather.as_ref().map_or(0, Vec::len)
    }
}

/// State of the operator's manual breaking-news panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualPanelState {
    pub open: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// Everything the renderer consumes. Published atomically after each core
/// event; `rev` increases with every publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerSnapshot {
    #[serde(default)]
    pub rev: u64,
    pub news_items: Vec<String>,
    pub news_error: Option<String>,
    /// Display string for the scrolling strip (see [`format_news_text`]).
    pub news_text: String,
    pub category_data: CategoryData,
    pub is_breaking_mode: bool,
    pub breaking_title: Option<String>,
    pub main_animation: GatePhase,
    pub bar_animation: GatePhase,
    pub active_category: Option<InfoCategory>,
    pub active_sub_view: SubView,
    pub active_item_index: usize,
    pub current_city: Option<WeatherData>,
    pub manual: ManualPanelState,
    /// Set once at startup when no credentials are configured.
    pub config_error: Option<String>,
    pub last_refresh: Option<DateTime<Local>>,
}

const NBSP: char = '\u{00A0}';

/// Build the scrolling-strip text. An error replaces the items entirely.
pub fn format_news_text(items: &[String], error: Option<&str>) -> String {
    if let Some(err) = error {
        return err.to_string();
    }
    let pad: String = std::iter::repeat(NBSP).take(5).collect();
    let separator = format!("{NBSP}{NBSP}●{NBSP}{NBSP}");
    items
        .iter()
        .map(|item| {
            let text = item.trim();
            let text = text.strip_suffix('.').unwrap_or(text);
            format!("{pad}{text}{pad}")
        })
        .collect::<Vec<_>>()
        .join(&separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let cmd = Command::RequestTopic {
            topic: "Bão số 5".to_string(),
            count: 5,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"cmd":"RequestTopic","topic":"Bão số 5","count":5}"#);
        let back: Command = serde_json::from_str(r#"{"cmd":"ToggleBreaking"}"#).unwrap();
        assert_eq!(back, Command::ToggleBreaking);
    }

    #[test]
    fn test_availability_follows_rotation_order() {
        let data = CategoryData {
            fuel: Some(FuelPrices {
                domestic: vec![],
                world: vec![],
            }),
            stocks_world: Some(vec![]),
            weather: Some(vec![]),
            ..Default::default()
        };
        // an empty weather list has no city to show
        assert_eq!(
            data.available(),
            vec![InfoCategory::Stocks, InfoCategory::Fuel]
        );
        assert!(CategoryData::default().available().is_empty());
    }

    #[test]
    fn test_category_keys_serialize_kebab() {
        let json = serde_json::to_value(CategoryData::default()).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["weather", "stocks-vn", "stocks-world", "forex", "gold", "fuel"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_format_news_text() {
        let items = vec!["Tin một.".to_string(), "  Tin hai ".to_string()];
        let text = format_news_text(&items, None);
        let pad = "\u{a0}".repeat(5);
        let sep = "\u{a0}\u{a0}●\u{a0}\u{a0}";
        assert_eq!(text, format!("{pad}Tin một{pad}{sep}{pad}Tin hai{pad}"));
        assert_eq!(format_news_text(&items, Some("Đang cập nhật...")), "Đang cập nhật...");
        assert_eq!(format_news_text(&[], None), "");
    }

    #[test]
    fn test_sub_view_toggle() {
        assert_eq!(SubView::default(), SubView::Domestic);
        assert_eq!(SubView::Domestic.toggled(), SubView::World);
        assert_eq!(SubView::World.toggled(), SubView::Domestic);
    }
}
