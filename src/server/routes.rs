use crate::errors::{ApiError, ApiResult};
use crate::shape;
use crate::shape::chain::OptionsChain;
use crate::shape::expiry::{ExpiryEntry, ExpiryType};
use crate::shape::quote::Quote;
use crate::shape::search::{SearchResult, MAX_RESULTS, STATIC_SYMBOLS};
use crate::shape::validate::ValidationResult;
use crate::shape::volatility::VolatilitySnapshot;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Standard success wrapper for every endpoint under /api.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub status: &'static str,
    pub timestamp: String,
    pub cached: bool,
}

fn fresh<T>(data: T) -> Envelope<T> {
    Envelope { data, status: "success", timestamp: now_iso(), cached: false }
}

fn memoized<T>(data: T) -> Envelope<T> {
    Envelope { data, status: "success", timestamp: now_iso(), cached: true }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ── Query parameters ──

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    #[serde(rename = "includeExtendedHours")]
    pub include_extended_hours: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct VolatilityQuery {
    pub period: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiriesQuery {
    pub include_weeklies: Option<bool>,
    pub include_monthlies: Option<bool>,
    pub include_quarterlies: Option<bool>,
    pub include_leaps: Option<bool>,
    pub min_days_out: Option<i64>,
    pub max_days_out: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuery {
    pub expiry_date: Option<String>,
    pub min_strike: Option<f64>,
    pub max_strike: Option<f64>,
    pub include_greeks: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryListResponse {
    pub symbol: String,
    pub expiry_dates: Vec<ExpiryEntry>,
    pub timestamp: String,
}

// ── Handlers ──

/// GET / -- service liveness payload
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "strikewatch",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": now_iso(),
    }))
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "timestamp": now_iso() }))
}

/// GET /api/stocks/{symbol}/quote
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<QuoteQuery>,
) -> ApiResult<Json<Envelope<Quote>>> {
    let symbol = symbol.to_uppercase();
    if params.include_extended_hours == Some(true) {
        tracing::debug!(symbol = %symbol, "extended-hours data requested but not supplied upstream");
    }

    let history = state.provider.quote_history(&symbol, 1).await?;
    let info = state.provider.static_info(&symbol).await?;
    let quote = shape::quote::build_quote(&symbol, &history, &info, now_iso())?;
    Ok(Json(fresh(quote)))
}

/// GET /api/stocks/{symbol}/volatility
pub async fn get_volatility(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<VolatilityQuery>,
) -> ApiResult<Json<Envelope<VolatilitySnapshot>>> {
    let symbol = symbol.to_uppercase();
    let period = params.period.unwrap_or(30);
    if !(1..=365).contains(&period) {
        return Err(ApiError::BadRequest("period must be between 1 and 365".into()));
    }

    let history = state.provider.quote_history(&symbol, period).await?;

    // Chain lookup failures degrade to the HV fallback, never to an error.
    let nearest_chain = match state.provider.expiry_list(&symbol).await {
        Ok(expiries) => match expiries.first() {
            Some(first) => match state.provider.option_chain(&symbol, first).await {
                Ok(chain) => Some(chain),
                Err(e) => {
                    tracing::debug!(symbol = %symbol, error = %e, "nearest chain unavailable");
                    None
                }
            },
            None => None,
        },
        Err(e) => {
            tracing::debug!(symbol = %symbol, error = %e, "expiry list unavailable");
            None
        }
    };

    let snapshot =
        shape::volatility::estimate_volatility(&symbol, &history, nearest_chain.as_ref(), now_iso())?;
    Ok(Json(fresh(snapshot)))
}

/// GET /api/stocks/{symbol}/validate -- never fails, a broken lookup is the answer
pub async fn validate_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Json<Envelope<ValidationResult>> {
    let symbol = symbol.to_uppercase();
    let info = state.provider.static_info(&symbol).await;
    let expiries = state.provider.expiry_list(&symbol).await;
    Json(fresh(shape::validate::validate_symbol(&symbol, info, expiries)))
}

/// GET /api/stocks/search
pub async fn search_symbols(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Envelope<Vec<SearchResult>>>> {
    if params.q.is_empty() || params.q.len() > 10 {
        return Err(ApiError::BadRequest("q must be between 1 and 10 characters".into()));
    }
    let key = params.q.to_uppercase();

    {
        let mut cache = state.search_cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(&key) {
            return Ok(Json(memoized(hit)));
        }
    }

    let mut results = shape::search::match_static(&key, STATIC_SYMBOLS);

    // No static match: one live lookup for short ticker-like queries.
    if results.is_empty() && key.len() <= 5 {
        match state.provider.static_info(&key).await {
            Ok(info) if info.symbol.is_some() => {
                let name = info.long_name.unwrap_or_else(|| key.clone());
                results.push(SearchResult { symbol: key.clone(), name });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(query = %key, error = %e, "live symbol lookup failed");
            }
        }
    }
    results.truncate(MAX_RESULTS);

    state
        .search_cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(key, results.clone());
    Ok(Json(fresh(results)))
}

/// GET /api/options/{symbol}/expiries
pub async fn get_expiries(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<ExpiriesQuery>,
) -> ApiResult<Json<Envelope<ExpiryListResponse>>> {
    let symbol = symbol.to_uppercase();
    let dates = state.provider.expiry_list(&symbol).await?;
    let entries =
        shape::expiry::classify_expiries(&symbol, &dates, chrono::Utc::now().date_naive())?;

    let filtered: Vec<ExpiryEntry> = entries
        .into_iter()
        .filter(|e| {
            let type_ok = match e.expiry_type {
                ExpiryType::Weekly => params.include_weeklies.unwrap_or(true),
                ExpiryType::Monthly => params.include_monthlies.unwrap_or(true),
                ExpiryType::Quarterly => params.include_quarterlies.unwrap_or(true),
                ExpiryType::Leaps => params.include_leaps.unwrap_or(true),
            };
            type_ok
                && params.min_days_out.is_none_or(|m| e.days_until_expiry >= m)
                && params.max_days_out.is_none_or(|m| e.days_until_expiry <= m)
        })
        .collect();

    Ok(Json(fresh(ExpiryListResponse {
        symbol,
        expiry_dates: filtered,
        timestamp: now_iso(),
    })))
}

/// GET /api/options/{symbol}/chain
pub async fn get_chain(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<ChainQuery>,
) -> ApiResult<Json<Envelope<OptionsChain>>> {
    let symbol = symbol.to_uppercase();
    if params.include_greeks == Some(true) {
        tracing::debug!(symbol = %symbol, "greeks requested but not supplied upstream");
    }

    let expiries = state.provider.expiry_list(&symbol).await?;
    let expiry = match params.expiry_date {
        Some(date) => date,
        None => expiries
            .first()
            .cloned()
            .ok_or_else(|| ApiError::NoOptionsAvailable(symbol.clone()))?,
    };

    let raw = state.provider.option_chain(&symbol, &expiry).await?;
    let history = state.provider.quote_history(&symbol, 1).await?;
    let underlying_price = history.last().map(|b| b.close).unwrap_or(0.0);

    let chain = shape::chain::build_chain(
        &raw,
        &symbol,
        underlying_price,
        &expiry,
        expiries,
        params.min_strike,
        params.max_strike,
        now_iso(),
    );
    Ok(Json(fresh(chain)))
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::errors::{ApiError, ApiResult};
    use crate::provider::{MarketDataProvider, PriceBar, RawChain, RawContract, StaticInfo};
    use crate::server;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::Datelike;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[derive(Default)]
    struct MockProvider {
        history: Vec<PriceBar>,
        info: Option<StaticInfo>,
        expiries: Vec<String>,
        chain: Option<RawChain>,
        fail_all: bool,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        async fn quote_history(&self, _symbol: &str, _window_days: u32) -> ApiResult<Vec<PriceBar>> {
            if self.fail_all {
                return Err(ApiError::Provider("upstream down".into()));
            }
            Ok(self.history.clone())
        }

        async fn static_info(&self, symbol: &str) -> ApiResult<StaticInfo> {
            if self.fail_all {
                return Err(ApiError::Provider("upstream down".into()));
            }
            self.info
                .clone()
                .ok_or_else(|| ApiError::DataUnavailable(symbol.to_string()))
        }

        async fn expiry_list(&self, _symbol: &str) -> ApiResult<Vec<String>> {
            if self.fail_all {
                return Err(ApiError::Provider("upstream down".into()));
            }
            Ok(self.expiries.clone())
        }

        async fn option_chain(&self, symbol: &str, _expiry: &str) -> ApiResult<RawChain> {
            if self.fail_all {
                return Err(ApiError::Provider("upstream down".into()));
            }
            self.chain
                .clone()
                .ok_or_else(|| ApiError::NoOptionsAvailable(symbol.to_string()))
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            chart_base_url: String::new(),
            options_base_url: String::new(),
            http_timeout_secs: 1,
            search_cache_capacity: 100,
            server_port: 0,
        }
    }

    fn app(provider: MockProvider) -> Router {
        server::router(AppState::new(test_config(), Arc::new(provider)))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar { timestamp: i as i64, close, volume: Some(500) })
            .collect()
    }

    fn call(strike: f64, iv: f64) -> RawContract {
        RawContract {
            contract_symbol: Some(format!("C{strike}")),
            strike,
            bid: Some(1.0),
            ask: Some(2.0),
            last_price: Some(1.5),
            volume: Some(3),
            open_interest: Some(4),
            implied_volatility: Some(iv),
        }
    }

    fn date_days_out(days: i64) -> String {
        (chrono::Utc::now().date_naive() + chrono::Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Nearest upcoming date whose day-of-month classifies as monthly.
    fn monthly_date_out() -> String {
        for days in 22..60 {
            let date = chrono::Utc::now().date_naive() + chrono::Duration::days(days);
            if (15..=21).contains(&date.day()) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
        unreachable!("a 15th-21st always falls within 60 days");
    }

    /// Nearest upcoming date that classifies as weekly.
    fn weekly_date_out() -> String {
        for days in 3..30 {
            let date = chrono::Utc::now().date_naive() + chrono::Duration::days(days);
            if !(15..=21).contains(&date.day()) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
        unreachable!();
    }

    fn full_provider() -> MockProvider {
        MockProvider {
            history: bars(&[148.5, 149.2, 150.0]),
            info: Some(StaticInfo {
                symbol: Some("AAPL".into()),
                long_name: Some("Apple Inc.".into()),
                previous_close: Some(148.0),
                market_cap: Some(3.0e12),
                fifty_two_week_high: Some(199.6),
                fifty_two_week_low: Some(124.2),
            }),
            expiries: vec![weekly_date_out(), monthly_date_out(), date_days_out(400)],
            chain: Some(RawChain {
                calls: vec![
                    call(95.0, 0.31),
                    call(100.0, 0.30),
                    call(105.0, 0.29),
                    call(110.0, 0.28),
                    call(115.0, 0.27),
                ],
                puts: vec![call(95.0, 0.33), call(100.0, 0.32), call(105.0, 0.31)],
            }),
            fail_all: false,
        }
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "strikewatch");
    }

    #[tokio::test]
    async fn test_quote_envelope_and_fields() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/stocks/aapl/quote").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["cached"], false);

        let data = &body["data"];
        assert_eq!(data["symbol"], "AAPL");
        assert_eq!(data["price"], 150.0);
        assert_eq!(data["previousClose"], 148.0);
        assert!((data["change"].as_f64().unwrap() - 2.0).abs() < 1e-9);
        let pct = data["changePercent"].as_f64().unwrap();
        assert!((pct - 1.3513513513513513).abs() < 1e-9, "changePercent={pct}");
    }

    #[tokio::test]
    async fn test_quote_no_history_is_404() {
        let mut provider = full_provider();
        provider.history.clear();
        let app = app(provider);
        let (status, body) = get(&app, "/api/stocks/NOPE/quote").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No data available for symbol: NOPE");
    }

    #[tokio::test]
    async fn test_provider_failure_is_500() {
        let app = app(MockProvider { fail_all: true, ..Default::default() });
        let (status, body) = get(&app, "/api/stocks/AAPL/quote").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Internal server error:"), "detail={detail}");
    }

    #[tokio::test]
    async fn test_expiries_classified_and_enveloped() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/options/AAPL/expiries").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["data"]["expiryDates"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["type"], "weekly");
        assert_eq!(entries[1]["type"], "monthly");
        assert_eq!(entries[1]["isStandard"], true);
        assert_eq!(entries[2]["type"], "leaps");
        assert_eq!(body["data"]["symbol"], "AAPL");
    }

    #[tokio::test]
    async fn test_expiries_type_filter() {
        let app = app(full_provider());
        let (status, body) =
            get(&app, "/api/options/AAPL/expiries?includeWeeklies=false&includeLeaps=false").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["data"]["expiryDates"].as_array().unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e["type"] == "monthly"));
    }

    #[tokio::test]
    async fn test_expiries_day_range_filter() {
        let app = app(full_provider());
        let (status, body) =
            get(&app, "/api/options/AAPL/expiries?minDaysOut=300").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["data"]["expiryDates"].as_array().unwrap();
        assert!(entries.iter().all(|e| e["daysUntilExpiry"].as_i64().unwrap() >= 300));

        let (_, body) = get(&app, "/api/options/AAPL/expiries?maxDaysOut=100").await;
        let entries = body["data"]["expiryDates"].as_array().unwrap();
        assert!(entries.iter().all(|e| e["daysUntilExpiry"].as_i64().unwrap() <= 100));
    }

    #[tokio::test]
    async fn test_expiries_empty_is_404() {
        let mut provider = full_provider();
        provider.expiries.clear();
        let app = app(provider);
        let (status, body) = get(&app, "/api/options/XYZ/expiries").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No options available for XYZ");
    }

    #[tokio::test]
    async fn test_chain_defaults_to_first_expiry() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/options/AAPL/chain").await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["underlying"], "AAPL");
        assert_eq!(data["underlyingPrice"], 150.0);
        assert_eq!(data["calls"][0]["expiryDate"], weekly_date_out());
        assert_eq!(data["expiryDates"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_chain_strike_window() {
        let app = app(full_provider());
        let (status, body) =
            get(&app, "/api/options/AAPL/chain?minStrike=100&maxStrike=110").await;
        assert_eq!(status, StatusCode::OK);
        let strikes: Vec<f64> = body["data"]["strikes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(strikes, vec![100.0, 105.0, 110.0]);
    }

    #[tokio::test]
    async fn test_chain_greeks_always_null() {
        let app = app(full_provider());
        let (_, body) = get(&app, "/api/options/AAPL/chain?includeGreeks=true").await;
        let c = &body["data"]["calls"][0];
        for greek in ["delta", "gamma", "theta", "vega", "rho"] {
            assert!(c[greek].is_null(), "{greek} should be null");
        }
    }

    #[tokio::test]
    async fn test_volatility_snapshot() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/stocks/AAPL/volatility?period=30").await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["symbol"], "AAPL");
        // ATM call vs price 150 is the 115 strike (closest) -> iv 0.27
        assert_eq!(data["impliedVolatility"].as_f64().unwrap(), 0.27);
        let rank = data["ivRank"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&rank));
        assert_eq!(data["ivPercentile"], data["ivRank"]);
    }

    #[tokio::test]
    async fn test_volatility_insufficient_history() {
        let mut provider = full_provider();
        provider.history = bars(&[150.0]);
        let app = app(provider);
        let (status, body) = get(&app, "/api/stocks/AAPL/volatility").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Insufficient data for volatility calculation");
    }

    #[tokio::test]
    async fn test_volatility_period_range() {
        let app = app(full_provider());
        let (status, _) = get(&app, "/api/stocks/AAPL/volatility?period=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(&app, "/api/stocks/AAPL/volatility?period=366").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_static_table() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/stocks/search?q=apple").await;
        assert_eq!(status, StatusCode::OK);
        let results = body["data"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["symbol"], "AAPL");
        assert_eq!(results[0]["name"], "Apple Inc.");
        assert_eq!(body["cached"], false);
    }

    #[tokio::test]
    async fn test_search_repeat_query_is_cached() {
        let app = app(full_provider());
        let (_, first) = get(&app, "/api/stocks/search?q=apple").await;
        assert_eq!(first["cached"], false);
        let (_, second) = get(&app, "/api/stocks/search?q=apple").await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["data"], first["data"]);
    }

    #[tokio::test]
    async fn test_search_live_fallback() {
        let mut provider = full_provider();
        provider.info = Some(StaticInfo {
            symbol: Some("PLTR".into()),
            long_name: Some("Palantir Technologies Inc.".into()),
            ..Default::default()
        });
        let app = app(provider);
        let (status, body) = get(&app, "/api/stocks/search?q=pltr").await;
        assert_eq!(status, StatusCode::OK);
        let results = body["data"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["symbol"], "PLTR");
        assert_eq!(results[0]["name"], "Palantir Technologies Inc.");
    }

    #[tokio::test]
    async fn test_search_no_fallback_for_long_query() {
        let mut provider = full_provider();
        provider.fail_all = false;
        let app = app(provider);
        // 6 chars, no static match: fallback is skipped, empty result
        let (status, body) = get(&app, "/api/stocks/search?q=zzzzzz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_query_length_checked() {
        let app = app(full_provider());
        let (status, _) = get(&app, "/api/stocks/search?q=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(&app, "/api/stocks/search?q=elevenchars").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validate_ok() {
        let app = app(full_provider());
        let (status, body) = get(&app, "/api/stocks/AAPL/validate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["valid"], true);
        assert_eq!(body["data"]["optionable"], true);
        assert_eq!(body["data"]["name"], "Apple Inc.");
    }

    #[tokio::test]
    async fn test_validate_never_errors() {
        let app = app(MockProvider { fail_all: true, ..Default::default() });
        let (status, body) = get(&app, "/api/stocks/NOPE/validate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["valid"], false);
        assert_eq!(body["data"]["optionable"], false);
        assert_eq!(body["data"]["name"], "");
    }
}
