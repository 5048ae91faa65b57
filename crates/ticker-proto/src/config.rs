use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("no API keys configured (set {env_var} to a comma-separated list)")]
    NoCredentials { env_var: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where API keys come from. Keys never live in the config file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Environment variable holding a comma-separated key list.
    #[serde(default = "default_credentials_env_var")]
    pub env_var: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Ask the model to ground answers with web search.
    #[serde(default = "default_web_search")]
    pub web_search: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Syndication feeds used when the AI headline query is skipped or fails.
    #[serde(default = "default_news_feeds")]
    pub feeds: Vec<String>,
    /// Optional pass-through proxy. The feed URL is appended as `?url=`.
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default = "default_headline_count")]
    pub headline_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Timings for refresh, fetch bounding and the rotation/flip cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Duration of each half of a flip transition.
    #[serde(default = "default_flip_half_ms")]
    pub flip_half_ms: u64,
    #[serde(default = "default_weather_city_ms")]
    pub weather_city_ms: u64,
    #[serde(default = "default_category_dwell_ms")]
    pub category_dwell_ms: u64,
    #[serde(default = "default_sub_view_toggle_ms")]
    pub sub_view_toggle_ms: u64,
}

impl ScheduleConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn flip_half(&self) -> Duration {
        Duration::from_millis(self.flip_half_ms)
    }

    pub fn weather_city(&self) -> Duration {
        Duration::from_millis(self.weather_city_ms.max(1))
    }

    pub fn category_dwell(&self) -> Duration {
        Duration::from_millis(self.category_dwell_ms.max(1))
    }

    pub fn sub_view_toggle(&self) -> Duration {
        Duration::from_millis(self.sub_view_toggle_ms.max(1))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: default_credentials_env_var(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            web_search: default_web_search(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: default_news_feeds(),
            proxy_url: None,
            headline_count: default_headline_count(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            timezone: default_timezone(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            flip_half_ms: default_flip_half_ms(),
            weather_city_ms: default_weather_city_ms(),
            category_dwell_ms: default_category_dwell_ms(),
            sub_view_toggle_ms: default_sub_view_toggle_ms(),
        }
    }
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_credentials_env_var() -> String {
    "TICKER_API_KEYS".to_string()
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_web_search() -> bool {
    true
}

fn default_news_feeds() -> Vec<String> {
    [
        "https://baotintuc.vn/tin-moi-nhat.rss",
        "https://baotintuc.vn/thoi-su.rss",
        "https://baotintuc.vn/the-gioi.rss",
        "https://baotintuc.vn/kinh-te.rss",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_headline_count() -> usize {
    10
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_timezone() -> String {
    "Asia/Ho_Chi_Minh".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60 * 60
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_flip_half_ms() -> u64 {
    300
}

fn default_weather_city_ms() -> u64 {
    3000
}

fn default_category_dwell_ms() -> u64 {
    10_000
}

fn default_sub_view_toggle_ms() -> u64 {
    7000
}

/// Split a comma-separated key list, dropping blanks.
pub fn parse_credentials(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Read the API key list from the configured environment variable.
    pub fn credentials(&self) -> Result<Vec<String>, ConfigError> {
        let raw = std::env::var(&self.credentials.env_var).unwrap_or_default();
        let keys = parse_credentials(&raw);
        if keys.is_empty() {
            return Err(ConfigError::NoCredentials {
                env_var: self.credentials.env_var.clone(),
            });
        }
        Ok(keys)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            credentials: CredentialsConfig::default(),
            ai: AiConfig::default(),
            news: NewsConfig::default(),
            weather: WeatherConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 8990);
        assert_eq!(config.http.bind_address, "127.0.0.1");
        assert_eq!(config.news.feeds.len(), 4);
        assert!(config.news.feeds.iter().all(|f| f.starts_with("https://")));
        assert_eq!(config.schedule.flip_half(), Duration::from_millis(300));
        assert_eq!(config.schedule.refresh_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [schedule]
            weather_city_ms = 1500

            [news]
            proxy_url = "https://proxy.example/raw"
            "#,
        )
        .unwrap();
        assert_eq!(config.schedule.weather_city_ms, 1500);
        assert_eq!(config.schedule.category_dwell_ms, 10_000);
        assert_eq!(config.news.proxy_url.as_deref(), Some("https://proxy.example/raw"));
        assert_eq!(config.news.headline_count, 10);
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_parse_credentials() {
        assert_eq!(parse_credentials("a, b,,c ,"), vec!["a", "b", "c"]);
        assert!(parse_credentials("").is_empty());
        assert!(parse_credentials(" , ").is_empty());
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let mut config = Config::default();
        config.credentials.env_var = "TICKER_TEST_KEYS_THAT_ARE_NEVER_SET".to_string();
        let err = config.credentials().unwrap_err();
        assert_eq!(
            err,
            ConfigError::NoCredentials {
                env_var: "TICKER_TEST_KEYS_THAT_ARE_NEVER_SET".to_string()
            }
        );
    }
}
