use crate::errors::{ApiError, ApiResult};
use crate::provider::{PriceBar, StaticInfo};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: Option<f64>,
    #[serde(rename = "high52Week")]
    pub high_52_week: Option<f64>,
    #[serde(rename = "low52Week")]
    pub low_52_week: Option<f64>,
    pub previous_close: f64,
    pub timestamp: String,
}

/// Build a quote from the latest bar plus static metadata. The previous
/// close falls back to the last close when the provider omits it, which
/// pins change and changePercent to zero for such symbols.
pub fn build_quote(
    symbol: &str,
    history: &[PriceBar],
    info: &StaticInfo,
    timestamp: String,
) -> ApiResult<Quote> {
    let last = history
        .last()
        .ok_or_else(|| ApiError::DataUnavailable(symbol.to_string()))?;

    let previous_close = info.previous_close.unwrap_or(last.close);
    let change = last.close - previous_close;
    let change_percent = if previous_close != 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };

    Ok(Quote {
        symbol: symbol.to_string(),
        price: last.close,
        change,
        change_percent,
        volume: last.volume.unwrap_or(0),
        market_cap: info.market_cap,
        high_52_week: info.fifty_two_week_high,
        low_52_week: info.fifty_two_week_low,
        previous_close,
        timestamp,
    })
}
