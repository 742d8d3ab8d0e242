use super::{MarketDataProvider, PriceBar, RawChain, RawContract, StaticInfo};
use crate::errors::{ApiError, ApiResult};
use reqwest::Client;
use serde::Deserialize;

/// Yahoo Finance REST client. All methods return Result, never panic.
/// History comes from the v8 chart endpoint, everything options-related
/// (expiries, chains, symbol metadata) from the v7 options endpoint.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    chart_base_url: String,
    options_base_url: String,
}

impl YahooClient {
    pub fn new(chart_base_url: &str, options_base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            chart_base_url: chart_base_url.trim_end_matches('/').to_string(),
            options_base_url: options_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn public_get<T: serde::de::DeserializeOwned>(&self, symbol: &str, url: &str) -> ApiResult<T> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        // Upstream 404 is the provider's "symbol not found" signal.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::DataUnavailable(symbol.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Provider(format!("{} {body}", status.as_u16())));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Provider(format!("GET {url}: {e}")))
    }

    async fn fetch_option_chain(&self, symbol: &str, date_ts: Option<i64>) -> ApiResult<OptionChainResult> {
        let mut parts: smallvec::SmallVec<[String; 2]> = smallvec::SmallVec::new();
        if let Some(ts) = date_ts {
            parts.push(format!("date={ts}"));
        }
        let query = if parts.is_empty() { String::new() } else { format!("?{}", parts.join("&")) };
        let url = format!("{}/{symbol}{query}", self.options_base_url);

        let envelope: OptionsEnvelope = self.public_get(symbol, &url).await?;
        envelope
            .option_chain
            .and_then(|c| c.result)
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ApiError::Provider(format!("empty option chain result for {symbol}")))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooClient {
    async fn quote_history(&self, symbol: &str, window_days: u32) -> ApiResult<Vec<PriceBar>> {
        let url = format!(
            "{}/{symbol}?range={window_days}d&interval=1d",
            self.chart_base_url
        );
        let envelope: ChartEnvelope = self.public_get(symbol, &url).await?;

        let result = envelope
            .chart
            .and_then(|c| c.result)
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ApiError::Provider(format!("empty chart result for {symbol}")))?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .and_then(|i| i.quote)
            .and_then(|mut q| if q.is_empty() { None } else { Some(q.remove(0)) })
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            // Yahoo pads indicator arrays with nulls for halted sessions; skip those bars.
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            bars.push(PriceBar {
                timestamp: *ts,
                close,
                volume: quote.volume.get(i).copied().flatten(),
            });
        }
        Ok(bars)
    }

    async fn static_info(&self, symbol: &str) -> ApiResult<StaticInfo> {
        let result = self.fetch_option_chain(symbol, None).await?;
        let quote = result.quote.unwrap_or_default();
        Ok(StaticInfo {
            symbol: quote.symbol,
            long_name: quote.long_name,
            previous_close: quote.regular_market_previous_close,
            market_cap: quote.market_cap,
            fifty_two_week_high: quote.fifty_two_week_high,
            fifty_two_week_low: quote.fifty_two_week_low,
        })
    }

    async fn expiry_list(&self, symbol: &str) -> ApiResult<Vec<String>> {
        let result = self.fetch_option_chain(symbol, None).await?;
        Ok(result
            .expiration_dates
            .unwrap_or_default()
            .iter()
            .filter_map(|ts| format_expiry(*ts))
            .collect())
    }

    async fn option_chain(&self, symbol: &str, expiry: &str) -> ApiResult<RawChain> {
        let ts = parse_expiry(expiry)
            .ok_or_else(|| ApiError::Provider(format!("invalid expiry date: {expiry}")))?;
        let result = self.fetch_option_chain(symbol, Some(ts)).await?;

        let options = result
            .options
            .and_then(|mut o| if o.is_empty() { None } else { Some(o.remove(0)) })
            .ok_or_else(|| ApiError::Provider(format!("no chain for {symbol} {expiry}")))?;

        Ok(RawChain {
            calls: options.calls.unwrap_or_default().into_iter().map(into_raw).collect(),
            puts: options.puts.unwrap_or_default().into_iter().map(into_raw).collect(),
        })
    }
}

/// Yahoo expiry timestamps are midnight UTC of the expiry date.
fn format_expiry(ts: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn parse_expiry(date: &str) -> Option<i64> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn into_raw(c: WireContract) -> RawContract {
    RawContract {
        contract_symbol: c.contract_symbol,
        strike: c.strike.unwrap_or(0.0),
        bid: c.bid,
        ask: c.ask,
        last_price: c.last_price,
        volume: c.volume,
        open_interest: c.open_interest,
        implied_volatility: c.implied_volatility,
    }
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Option<ChartBody>,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Option<Vec<IndicatorQuote>>,
}

#[derive(Debug, Default, Deserialize)]
struct IndicatorQuote {
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct OptionsEnvelope {
    #[serde(rename = "optionChain")]
    option_chain: Option<OptionChainBody>,
}

#[derive(Debug, Deserialize)]
struct OptionChainBody {
    result: Option<Vec<OptionChainResult>>,
}

#[derive(Debug, Deserialize)]
struct OptionChainResult {
    #[serde(rename = "expirationDates")]
    expiration_dates: Option<Vec<i64>>,
    quote: Option<WireQuote>,
    options: Option<Vec<WireOptions>>,
}

#[derive(Debug, Default, Deserialize)]
struct WireQuote {
    symbol: Option<String>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "regularMarketPreviousClose")]
    regular_market_previous_close: Option<f64>,
    #[serde(rename = "marketCap")]
    market_cap: Option<f64>,
    #[serde(rename = "fiftyTwoWeekHigh")]
    fifty_two_week_high: Option<f64>,
    #[serde(rename = "fiftyTwoWeekLow")]
    fifty_two_week_low: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireOptions {
    calls: Option<Vec<WireContract>>,
    puts: Option<Vec<WireContract>>,
}

#[derive(Debug, Deserialize)]
struct WireContract {
    #[serde(rename = "contractSymbol")]
    contract_symbol: Option<String>,
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    volume: Option<i64>,
    #[serde(rename = "openInterest")]
    open_interest: Option<i64>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
}
