use crate::provider::{RawChain, RawContract};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub symbol: String,
    pub underlying: String,
    pub strike_price: f64,
    pub expiry_date: String,
    pub option_type: OptionType,
    pub bid: f64,
    pub ask: f64,
    pub last_price: f64,
    pub mark: f64,
    pub volume: i64,
    pub open_interest: i64,
    // Greeks are not available from the upstream feed.
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub rho: Option<f64>,
    pub implied_volatility: f64,
    pub in_the_money: bool,
    pub intrinsic_value: f64,
    pub extrinsic_value: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsChain {
    pub underlying: String,
    pub underlying_price: f64,
    pub timestamp: String,
    pub expiry_dates: Vec<String>,
    pub strikes: Vec<f64>,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

/// Build a full chain for one expiry. The strike filter is inclusive on
/// both bounds and applied to calls and puts independently; the unique
/// strike list is then derived from the filtered calls only, matching the
/// upstream feed's convention that every put strike has a call row.
#[allow(clippy::too_many_arguments)]
pub fn build_chain(
    raw: &RawChain,
    symbol: &str,
    underlying_price: f64,
    expiry_date: &str,
    expiry_dates: Vec<String>,
    min_strike: Option<f64>,
    max_strike: Option<f64>,
    timestamp: String,
) -> OptionsChain {
    let in_range = |strike: f64| {
        min_strike.is_none_or(|lo| strike >= lo) && max_strike.is_none_or(|hi| strike <= hi)
    };

    let calls: Vec<OptionContract> = raw
        .calls
        .iter()
        .filter(|c| in_range(c.strike))
        .map(|c| shape_contract(c, symbol, underlying_price, expiry_date, OptionType::Call, &timestamp))
        .collect();

    let puts: Vec<OptionContract> = raw
        .puts
        .iter()
        .filter(|c| in_range(c.strike))
        .map(|c| shape_contract(c, symbol, underlying_price, expiry_date, OptionType::Put, &timestamp))
        .collect();

    let mut strikes: Vec<f64> = calls.iter().map(|c| c.strike_price).collect();
    strikes.sort_by(|a, b| a.total_cmp(b));
    strikes.dedup();

    OptionsChain {
        underlying: symbol.to_string(),
        underlying_price,
        timestamp,
        expiry_dates,
        strikes,
        calls,
        puts,
    }
}

fn shape_contract(
    raw: &RawContract,
    underlying: &str,
    underlying_price: f64,
    expiry_date: &str,
    option_type: OptionType,
    timestamp: &str,
) -> OptionContract {
    let bid = raw.bid.unwrap_or(0.0);
    let ask = raw.ask.unwrap_or(0.0);
    let last_price = raw.last_price.unwrap_or(0.0);

    let intrinsic = match option_type {
        OptionType::Call => (underlying_price - raw.strike).max(0.0),
        OptionType::Put => (raw.strike - underlying_price).max(0.0),
    };
    let extrinsic = (last_price - intrinsic).max(0.0);

    OptionContract {
        symbol: raw.contract_symbol.clone().unwrap_or_default(),
        underlying: underlying.to_string(),
        strike_price: raw.strike,
        expiry_date: expiry_date.to_string(),
        option_type,
        bid,
        ask,
        last_price,
        mark: (bid + ask) / 2.0,
        volume: raw.volume.unwrap_or(0),
        open_interest: raw.open_interest.unwrap_or(0),
        delta: None,
        gamma: None,
        theta: None,
        vega: None,
        rho: None,
        implied_volatility: raw.implied_volatility.unwrap_or(0.0),
        in_the_money: intrinsic > 0.0,
        intrinsic_value: intrinsic,
        extrinsic_value: extrinsic,
        timestamp: timestamp.to_string(),
    }
}
