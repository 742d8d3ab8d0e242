use crate::errors::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chart_base_url: String,
    pub options_base_url: String,
    pub http_timeout_secs: u64,
    pub search_cache_capacity: usize,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> ApiResult<Self> {
        dotenvy::dotenv().ok();

        let http_timeout_secs = env_var_or("HTTP_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| ApiError::Config(format!("HTTP_TIMEOUT_SECS: {e}")))?;

        let search_cache_capacity = env_var_or("SEARCH_CACHE_CAPACITY", "100")
            .parse::<usize>()
            .map_err(|e| ApiError::Config(format!("SEARCH_CACHE_CAPACITY: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ApiError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            chart_base_url: env_var_or(
                "CHART_BASE_URL",
                "https://query1.finance.yahoo.com/v8/finance/chart",
            ),
            options_base_url: env_var_or(
                "OPTIONS_BASE_URL",
                "https://query1.finance.yahoo.com/v7/finance/options",
            ),
            http_timeout_secs,
            search_cache_capacity,
            server_port,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
