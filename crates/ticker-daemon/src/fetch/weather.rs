//! Weather chain: one AI query for the whole city list, then a per-city
//! Open-Meteo forecast lookup.

use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};

use ticker_proto::data::{City, WeatherData, WEATHER_CITIES};

use super::Upstreams;
use crate::sources::FetchError;

pub struct WeatherChain {
    upstreams: Upstreams,
    forecast_url: String,
    timezone: String,
    cities: &'static [City],
}

impl WeatherChain {
    pub fn new(upstreams: Upstreams, forecast_url: String, timezone: String) -> Self {
        Self {
            upstreams,
            forecast_url,
            timezone,
            cities: WEATHER_CITIES,
        }
    }

    /// `None` when both the AI query and every forecast lookup failed.
    pub async fn fetch(&self) -> Option<Vec<WeatherData>> {
        match self.from_ai().await {
            Ok(list) => {
                info!("[weather] {} cities from AI", list.len());
                return Some(list);
            }
            Err(e) => warn!("[weather] AI query failed, using forecast API: {}", e),
        }

        let list = self.from_forecast_api().await;
        if list.is_empty() {
            warn!("[weather] forecast API failed for every city");
            return None;
        }
        info!("[weather] {} cities from forecast API", list.len());
        Some(list)
    }

    async fn from_ai(&self) -> Result<Vec<WeatherData>, FetchError> {
        let names: Vec<&str> = self.cities.iter().map(|c| c.name).collect();
        let prompt = weather_prompt(&names);
        let list: Vec<WeatherData> = self.upstreams.ask_json("weather", &prompt).await?;
        if list.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(list)
    }

    /// Cities in table order; a failing city is left out.
    async fn from_forecast_api(&self) -> Vec<WeatherData> {
        let lookups = self.cities.iter().map(|city| async move {
            let result = self.forecast_for(city).await;
            (city, result)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(city, result)| match result {
                Ok(data) => Some(data),
                Err(e) => {
                    debug!("[weather] {} failed: {}", city.name, e);
                    None
                }
            })
            .collect()
    }

    async fn forecast_for(&self, city: &City) -> Result<WeatherData, FetchError> {
        let url = self.forecast_request_url(city)?;
        let body = self.upstreams.get_text(&url).await?;
        let forecast: Forecast =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        forecast.into_weather(city.name)
    }

    fn forecast_request_url(&self, city: &City) -> Result<String, FetchError> {
        let lat = city.lat.to_string();
        let lon = city.lon.to_string();
        reqwest::Url::parse_with_params(
            &self.forecast_url,
            &[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max",
                ),
                ("current", "relative_humidity_2m"),
                ("timezone", self.timezone.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|e| FetchError::Parse(format!("forecast url: {e}")))
    }
}

fn weather_prompt(cities: &[&str]) -> String {
    let list = serde_json::to_string(cities).unwrap_or_default();
    format!(
        "Cung cấp dữ liệu thời tiết hiện tại cho danh sách thành phố Việt Nam sau: {list}. \
         Trả về dưới dạng một mảng JSON các đối tượng với các khóa \
         \"city\", \"tempMin\", \"tempMax\", \"humidity\", \"rainChance\"."
    )
}

#[derive(Debug, Deserialize)]
struct Forecast {
    daily: DailyForecast,
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct DailyForecast {
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    relative_humidity_2m: Option<f64>,
}

fn first(series: &[Option<f64>], field: &str) -> Result<f64, FetchError> {
    series
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| FetchError::Parse(format!("missing {field}")))
}

impl Forecast {
    /// Today's values, rounded to whole numbers.
    fn into_weather(self, city: &str) -> Result<WeatherData, FetchError> {
        let humidity = self
            .current
            .relative_humidity_2m
            .ok_or_else(|| FetchError::Parse("missing relative_humidity_2m".to_string()))?;
        Ok(WeatherData {
            city: city.to_string(),
            temp_min: first(&self.daily.temperature_2m_min, "temperature_2m_min")?.round(),
            temp_max: first(&self.daily.temperature_2m_max, "temperature_2m_max")?.round(),
            humidity: humidity.round(),
            rain_chance: first(
                &self.daily.precipitation_probability_max,
                "precipitation_probability_max",
            )?
            .round(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, Scripted};
    use std::sync::Arc;
    use std::time::Duration;

    const FORECAST_URL: &str = "https://forecast.example/v1/forecast";

    fn forecast_body(max: f64, min: f64, rain: f64, humidity: f64) -> String {
        serde_json::json!({
            "latitude": 21.0,
            "daily": {
                "time": ["2026-10-15"],
                "temperature_2m_max": [max],
                "temperature_2m_min": [min],
                "precipitation_probability_max": [rain]
            },
            "current": { "time": "2026-10-15T10:00", "relative_humidity_2m": humidity }
        })
        .to_string()
    }

    fn chain(ai: Scripted, http: Scripted, cities: &'static [City]) -> (WeatherChain, Arc<Scripted>) {
        let http = Arc::new(http);
        let upstreams = Upstreams {
            ai: Arc::new(ai),
            http: http.clone(),
            timeout: Duration::from_secs(5),
            web_search: true,
        };
        let mut chain = WeatherChain::new(
            upstreams,
            FORECAST_URL.to_string(),
            "Asia/Ho_Chi_Minh".to_string(),
        );
        chain.cities = cities;
        (chain, http)
    }

    const TWO_CITIES: &[City] = &[
        City {
            name: "Hà Nội",
            lat: 21.0285,
            lon: 105.8542,
        },
        City {
            name: "Huế",
            lat: 16.4637,
            lon: 107.5909,
        },
    ];

    #[tokio::test]
    async fn test_ai_list_is_used_as_is() {
        let ai = Scripted::new().on(
            "thời tiết",
            Reply::text(
                r#"[{"city":"Hà Nội","tempMin":24,"tempMax":31,"humidity":70,"rainChance":20}]"#,
            ),
        );
        let (chain, http) = chain(ai, Scripted::new(), TWO_CITIES);
        let list = chain.fetch().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].temp_max, 31.0);
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn test_forecast_fallback_rounds_and_drops_failures() {
        let ai = Scripted::new().on("thời tiết", Reply::text("[]"));
        let http = Scripted::new()
            .on("latitude=21.0285", Reply::text(forecast_body(31.6, 24.2, 35.5, 71.4)))
            .on("latitude=16.4637", Reply::Fail);
        let (chain, http) = chain(ai, http, TWO_CITIES);

        let list = chain.fetch().await.unwrap();
        assert_eq!(
            list,
            vec![WeatherData {
                city: "Hà Nội".to_string(),
                temp_min: 24.0,
                temp_max: 32.0,
                humidity: 71.0,
                rain_chance: 36.0,
            }]
        );
        let calls = http.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with(FORECAST_URL));
        assert!(calls[0].contains("current=relative_humidity_2m"));
        assert!(calls[0].contains("timezone=Asia%2FHo_Chi_Minh"));
    }

    #[tokio::test]
    async fn test_total_failure_is_none() {
        let (chain, _) = chain(Scripted::new(), Scripted::new(), TWO_CITIES);
        assert_eq!(chain.fetch().await, None);
    }

    #[test]
    fn test_forecast_missing_values_is_error() {
        let forecast: Forecast = serde_json::from_str(
            r#"{"daily":{"temperature_2m_max":[null],"temperature_2m_min":[20]},"current":{"relative_humidity_2m":50}}"#,
        )
        .unwrap();
        assert!(forecast.into_weather("X").is_err());
    }

    #[test]
    fn test_prompt_lists_cities() {
        let prompt = weather_prompt(&["Hà Nội", "Huế"]);
        assert!(prompt.contains(r#"["Hà Nội","Huế"]"#));
    }
}
