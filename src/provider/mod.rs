pub mod yahoo;

use crate::errors::ApiResult;
use serde::{Deserialize, Serialize};

// ── Raw provider payloads ──
// Option-heavy on purpose: upstream feeds omit fields freely, and the
// shaping layer decides the defaults.

/// One daily bar from the provider's price history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: i64,
    pub close: f64,
    pub volume: Option<u64>,
}

/// Static per-symbol metadata (name, previous close, market cap, 52w range).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticInfo {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

/// One raw option contract row as the provider reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContract {
    pub contract_symbol: Option<String>,
    pub strike: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last_price: Option<f64>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
    pub implied_volatility: Option<f64>,
}

/// Call and put sets for a single expiry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawChain {
    pub calls: Vec<RawContract>,
    pub puts: Vec<RawContract>,
}

/// Abstract market-data source. One live impl ([`yahoo::YahooClient`]);
/// tests substitute a canned provider. Calls are independent and safe to
/// issue concurrently.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily price history covering roughly the last `window_days` days,
    /// oldest bar first.
    async fn quote_history(&self, symbol: &str, window_days: u32) -> ApiResult<Vec<PriceBar>>;

    /// Per-symbol metadata. Fails when the symbol is unknown upstream.
    async fn static_info(&self, symbol: &str) -> ApiResult<StaticInfo>;

    /// Ordered list of option expiry dates as `YYYY-MM-DD` strings.
    async fn expiry_list(&self, symbol: &str) -> ApiResult<Vec<String>>;

    /// Full chain (calls and puts) for one expiry date.
    async fn option_chain(&self, symbol: &str, expiry: &str) -> ApiResult<RawChain>;
}
