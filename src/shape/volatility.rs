use crate::errors::{ApiError, ApiResult};
use crate::provider::{PriceBar, RawChain};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Trading days per year, used to annualize the daily return std-dev.
const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilitySnapshot {
    pub symbol: String,
    pub implied_volatility: f64,
    pub historical_volatility: f64,
    pub iv_rank: f64,
    pub iv_percentile: f64,
    pub timestamp: String,
}

/// Estimate volatility from a daily close series plus (optionally) the
/// nearest-expiry call chain. HV is the annualized sample std-dev of
/// day-over-day percentage returns. IV comes from the call whose strike is
/// closest to the last close (first match wins on ties) and degrades to HV
/// when no chain is available -- this path never fails for missing chain
/// data, only for missing history.
///
/// ivRank is a placeholder ratio metric, not a true historical percentile:
/// clamp(iv / hv * 50, 0, 100), with ivPercentile mirroring it.
pub fn estimate_volatility(
    symbol: &str,
    history: &[PriceBar],
    nearest_chain: Option<&RawChain>,
    timestamp: String,
) -> ApiResult<VolatilitySnapshot> {
    if history.len() < 2 {
        return Err(ApiError::InsufficientHistory);
    }

    let returns: Vec<f64> = history
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect();
    if returns.is_empty() {
        return Err(ApiError::InsufficientHistory);
    }

    let hv = returns.iter().std_dev() * TRADING_DAYS.sqrt();

    let current_price = history[history.len() - 1].close;
    let iv = nearest_chain
        .and_then(|chain| atm_implied_vol(chain, current_price))
        .unwrap_or(hv);

    let iv_rank = if hv > 0.0 {
        (iv / hv * 50.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Ok(VolatilitySnapshot {
        symbol: symbol.to_string(),
        implied_volatility: iv,
        historical_volatility: hv,
        iv_rank,
        iv_percentile: iv_rank,
        timestamp,
    })
}

/// Implied vol of the call with the strike closest to `price`. Ties keep
/// the provider's original ordering (first match wins).
fn atm_implied_vol(chain: &RawChain, price: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for call in &chain.calls {
        let dist = (call.strike - price).abs();
        if best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, call.implied_volatility.unwrap_or(0.0)));
        }
    }
    best.map(|(_, iv)| iv)
}
