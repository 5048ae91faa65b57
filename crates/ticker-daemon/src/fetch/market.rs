//! Market chain: a single combined AI query for all five sub-categories.
//! Anything missing falls back to the static default for that key only.

use serde::Deserialize;
use tracing::{info, warn};

use ticker_proto::data::{
    ForexData, FuelPrices, GoldPrices, MarketData, StockData, FALLBACK_MARKET,
};

use super::Upstreams;

const MARKET_PROMPT: &str = "Cung cấp dữ liệu tài chính mới nhất. Trả lời bằng một đối tượng JSON duy nhất có năm khóa: \
\"vietnamStocks\", \"worldStocks\", \"forex\", \"goldPrices\", và \"fuelPrices\". \
- \"vietnamStocks\": mảng các đối tượng {\"index\", \"value\", \"change\", \"percentChange\"} cho VN-INDEX, HNX-INDEX, UPCOM. \
- \"worldStocks\": mảng cùng dạng cho DOW JONES, S&P 500, NIKKEI 225. \
- \"forex\": mảng các đối tượng {\"code\", \"buy\", \"sell\"} cho USD, EUR, JPY. \
- \"goldPrices\": đối tượng có \"domestic\" (SJC, 9999; {\"name\", \"buy\", \"sell\"}) và \"world\" (Spot Gold; {\"name\", \"price\"}). \
- \"fuelPrices\": đối tượng có \"domestic\" (RON95-V, E5 RON92) và \"world\" (BRENT, WTI), mỗi mục {\"name\", \"price\"}.";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketPayload {
    vietnam_stocks: Option<Vec<StockData>>,
    world_stocks: Option<Vec<StockData>>,
    forex: Option<Vec<ForexData>>,
    gold_prices: Option<GoldPrices>,
    fuel_prices: Option<FuelPrices>,
}

impl MarketPayload {
    fn or_defaults(self) -> MarketData {
        let defaults = &*FALLBACK_MARKET;
        MarketData {
            vietnam_stocks: non_empty(self.vietnam_stocks)
                .unwrap_or_else(|| defaults.vietnam_stocks.clone()),
            world_stocks: non_empty(self.world_stocks)
                .unwrap_or_else(|| defaults.world_stocks.clone()),
            forex: non_empty(self.forex).unwrap_or_else(|| defaults.forex.clone()),
            gold_prices: self
                .gold_prices
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| defaults.gold_prices.clone()),
            fuel_prices: self
                .fuel_prices
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| defaults.fuel_prices.clone()),
        }
    }
}

fn non_empty<T>(list: Option<Vec<T>>) -> Option<Vec<T>> {
    list.filter(|l| !l.is_empty())
}

pub struct MarketChain {
    upstreams: Upstreams,
}

impl MarketChain {
    pub fn new(upstreams: Upstreams) -> Self {
        Self { upstreams }
    }

    /// Always yields a complete dataset.
    pub async fn fetch(&self) -> MarketData {
        match self
            .upstreams
            .ask_json::<MarketPayload>("market", MARKET_PROMPT)
            .await
        {
            Ok(payload) => {
                info!("[market] refreshed from AI");
                payload.or_defaults()
            }
            Err(e) => {
                warn!("[market] AI query failed, using defaults: {}", e);
                FALLBACK_MARKET.clone()
            }
        }
    }
}
