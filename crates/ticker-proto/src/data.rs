//! Dataset types shown in the info bar, plus the immutable lookup tables
//! (weather cities and the default market datasets).
//!
//! Field names follow the camelCase shape the AI source is asked to return,
//! so the same types decode upstream payloads and serialize snapshots.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub city: String,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
    pub rain_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockData {
    pub index: String,
    pub value: f64,
    pub change: f64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForexData {
    pub code: String,
    pub buy: f64,
    pub sell: f64,
}

/// Domestic gold quote (buy/sell in VND per tael).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldData {
    pub name: String,
    pub buy: f64,
    pub sell: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldGoldData {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldPrices {
    #[serde(default)]
    pub domestic: Vec<GoldData>,
    #[serde(default)]
    pub world: Vec<WorldGoldData>,
}

impl GoldPrices {
    pub fn is_empty(&self) -> bool {
        self.domestic.is_empty() && self.world.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelData {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrices {
    #[serde(default)]
    pub domestic: Vec<FuelData>,
    #[serde(default)]
    pub world: Vec<FuelData>,
}

impl FuelPrices {
    pub fn is_empty(&self) -> bool {
        self.domestic.is_empty() && self.world.is_empty()
    }
}

/// All five market sub-categories, each always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub vietnam_stocks: Vec<StockData>,
    pub world_stocks: Vec<StockData>,
    pub forex: Vec<ForexData>,
    pub gold_prices: GoldPrices,
    pub fuel_prices: FuelPrices,
}

// ── Static tables ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn city(name: &'static str, lat: f64, lon: f64) -> City {
    City { name, lat, lon }
}

/// Cities covered by the weather rotation, in display order.
pub const WEATHER_CITIES: &[City] = &[
    city("Hà Nội", 21.0285, 105.8542),
    city("TP. Hồ Chí Minh", 10.7769, 106.7009),
    city("Đà Nẵng", 16.0545, 108.2022),
    city("Hải Phòng", 20.8458, 106.6881),
    city("Cần Thơ", 10.0452, 105.7469),
    city("Thanh Hóa", 19.8005, 105.7796),
    city("Vinh", 18.6752, 105.6942),
    city("Nha Trang", 12.2388, 109.1967),
    city("Quy Nhơn", 13.7808, 109.2223),
    city("Huế", 16.4637, 107.5909),
    city("Đà Lạt", 11.9404, 108.4583),
    city("Buôn Ma Thuột", 12.6683, 108.0436),
    city("Pleiku", 13.9785, 108.0023),
    city("Biên Hòa", 10.9576, 106.8432),
    city("Thủ Dầu Một", 11.0069, 106.6631),
    city("Vũng Tàu", 10.3458, 107.0843),
    city("Mỹ Tho", 10.3592, 106.3533),
    city("Long Xuyên", 10.3807, 105.4243),
    city("Rạch Giá", 10.0125, 105.0825),
    city("Cà Mau", 9.1764, 105.1531),
    city("Hạ Long", 20.9575, 107.0758),
    city("Thái Nguyên", 21.5928, 105.8442),
    city("Nam Định", 20.4344, 106.1771),
    city("Việt Trì", 21.3121, 105.3940),
    city("Phú Quốc", 10.2288, 103.9574),
];

fn stock(index: &str, value: f64, change: f64, percent_change: f64) -> StockData {
    StockData {
        index: index.to_string(),
        value,
        change,
        percent_change,
    }
}

fn forex(code: &str, buy: f64, sell: f64) -> ForexData {
    ForexData {
        code: code.to_string(),
        buy,
        sell,
    }
}

fn fuel(name: &str, price: f64) -> FuelData {
    FuelData {
        name: name.to_string(),
        price,
    }
}

/// Default market datasets used when the AI source is unavailable or omits a
/// sub-category. Built once on first use and only ever cloned.
pub static FALLBACK_MARKET: LazyLock<MarketData> = LazyLock::new(|| MarketData {
    vietnam_stocks: vec![
        stock("VN-INDEX", 1280.00, -2.50, -0.20),
        stock("HNX-INDEX", 245.00, 0.75, 0.31),
        stock("UPCOM", 98.50, 0.25, 0.25),
    ],
    world_stocks: vec![
        stock("DOW JONES", 39000.00, -150.00, -0.38),
        stock("S&P 500", 5400.00, -10.00, -0.18),
        stock("NIKKEI 225", 38500.00, 250.00, 0.65),
    ],
    forex: vec![
        forex("USD", 25300.0, 25470.0),
        forex("EUR", 26800.0, 27100.0),
        forex("JPY", 158.00, 161.00),
    ],
    gold_prices: GoldPrices {
        domestic: vec![
            GoldData {
                name: "VÀNG SJC".to_string(),
                buy: 90_500_000.0,
                sell: 92_500_000.0,
            },
            GoldData {
                name: "VÀNG 9999".to_string(),
                buy: 75_000_000.0,
                sell: 76_500_000.0,
            },
        ],
        world: vec![WorldGoldData {
            name: "GOLD".to_string(),
            price: 2350.55,
        }],
    },
    fuel_prices: FuelPrices {
        domestic: vec![
            fuel("RON95-V", 23540.0),
            fuel("E5 RON92", 22750.0),
            fuel("DẦU DO", 20990.0),
        ],
        world: vec![fuel("BRENT", 82.75), fuel("WTI", 78.50)],
    },
});
