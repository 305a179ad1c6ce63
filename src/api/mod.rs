use axum::{
    Router,
    extract::{
        ConnectInfo, Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::core::{
    ContributionFrequency, ContributionSchedule, CustomFund, Holding, Inputs, Mode,
    ProjectionPlan, fund_catalog, normalize_custom_allocations, preset_templates,
    recommended_bond_allocation, run_analysis,
};
use crate::error::InputError;
use crate::quotes::{
    FallbackPriceLookup, PriceResult, QuoteError, QuoteSettings, RateLimiter, RateLimiterConfig,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliMode {
    Preset,
    Custom,
    Rebalance,
}

impl From<CliMode> for Mode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Preset => Mode::Preset,
            CliMode::Custom => Mode::Custom,
            CliMode::Rebalance => Mode::Rebalance,
        }
    }
}

impl From<Mode> for CliMode {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Preset => CliMode::Preset,
            Mode::Custom => CliMode::Custom,
            Mode::Rebalance => CliMode::Rebalance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl From<CliFrequency> for ContributionFrequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Daily => ContributionFrequency::Daily,
            CliFrequency::Weekly => ContributionFrequency::Weekly,
            CliFrequency::Monthly => ContributionFrequency::Monthly,
            CliFrequency::Quarterly => ContributionFrequency::Quarterly,
            CliFrequency::Annually => ContributionFrequency::Annually,
        }
    }
}

impl From<ContributionFrequency> for CliFrequency {
    fn from(value: ContributionFrequency) -> Self {
        match value {
            ContributionFrequency::Daily => CliFrequency::Daily,
            ContributionFrequency::Weekly => CliFrequency::Weekly,
            ContributionFrequency::Monthly => CliFrequency::Monthly,
            ContributionFrequency::Quarterly => CliFrequency::Quarterly,
            ContributionFrequency::Annually => CliFrequency::Annually,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnalyzePayload {
    mode: Option<Mode>,
    #[serde(alias = "investment")]
    investment_amount: Option<f64>,
    age: Option<f64>,
    #[serde(alias = "years", alias = "timeHorizon")]
    horizon_years: Option<u32>,
    #[serde(alias = "usAllocation")]
    us_pct: Option<f64>,
    #[serde(alias = "bondAllocation")]
    bond_pct: Option<f64>,
    #[serde(alias = "recurringAmount")]
    contribution_amount: Option<f64>,
    #[serde(alias = "recurringFrequency")]
    contribution_frequency: Option<String>,
    #[serde(alias = "selectedTemplate")]
    template_index: Option<usize>,
    custom_funds: Option<Vec<CustomFund>>,
    normalize: Option<bool>,
    holdings: Option<Vec<Holding>>,
}

/// Analysis inputs, shared by the `analyze` subcommand and the HTTP API.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, value_enum, default_value_t = CliMode::Preset)]
    pub mode: CliMode,
    #[arg(long, default_value_t = 10_000.0, help = "Lump sum to allocate")]
    pub investment: f64,
    #[arg(long, default_value_t = 30.0)]
    pub age: f64,
    #[arg(long, default_value_t = 10, help = "Projection horizon in years")]
    pub years: u32,
    #[arg(long, default_value_t = 70.0, help = "US stock share in percent")]
    pub us_pct: f64,
    #[arg(
        long,
        help = "Bond share in percent; defaults to the age-based recommendation"
    )]
    pub bond_pct: Option<f64>,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Recurring contribution per period"
    )]
    pub contribution: f64,
    #[arg(long, value_enum, default_value_t = CliFrequency::Monthly)]
    pub frequency: CliFrequency,
    #[arg(long, default_value_t = 0, help = "Preset template index")]
    pub template: usize,
    #[arg(
        long = "fund",
        value_parser = parse_custom_fund,
        help = "Custom-mode fund as TICKER=PERCENT; repeatable"
    )]
    pub funds: Vec<CustomFund>,
    #[arg(long, help = "Spread 100% evenly across the custom funds")]
    pub normalize: bool,
    #[arg(skip)]
    pub holdings: Vec<Holding>,
}

fn parse_custom_fund(raw: &str) -> Result<CustomFund, String> {
    let (ticker, percent) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=PERCENT, got '{raw}'"))?;
    let percent = percent
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid percent in '{raw}': {e}"))?;
    Ok(CustomFund {
        ticker: ticker.trim().to_uppercase(),
        percent,
    })
}

/// HTTP server settings.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        default_value_t = 10,
        help = "Price lookups allowed per client per window"
    )]
    pub rate_limit: u32,
    #[arg(long, default_value_t = 60)]
    pub rate_window_secs: u64,
    #[arg(
        long,
        default_value_t = 300,
        help = "How often expired rate-limit windows are dropped"
    )]
    pub prune_interval_secs: u64,
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    pub finnhub_api_key: Option<String>,
    #[arg(long, default_value_t = 10, help = "Upstream price request timeout")]
    pub quote_timeout_secs: u64,
}

impl ServeArgs {
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests: self.rate_limit,
            window: Duration::from_secs(self.rate_window_secs),
            prune_every: Duration::from_secs(self.prune_interval_secs.max(1)),
        }
    }

    pub fn quote_settings(&self) -> QuoteSettings {
        QuoteSettings {
            finnhub_api_key: self.finnhub_api_key.clone(),
            timeout: Duration::from_secs(self.quote_timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct PriceQuery {
    ticker: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    limiter: Arc<RateLimiter>,
    prices: Arc<FallbackPriceLookup>,
}

impl AppState {
    pub fn new(limiter: Arc<RateLimiter>, prices: FallbackPriceLookup) -> Self {
        Self {
            limiter,
            prices: Arc::new(prices),
        }
    }
}

fn check_finite(flag: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::NotFinite { flag })
    }
}

fn check_range(flag: &'static str, value: f64, min: f64, max: f64) -> Result<(), InputError> {
    check_finite(flag, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InputError::out_of_range(flag, min, max))
    }
}

fn check_non_negative(flag: &'static str, value: f64) -> Result<(), InputError> {
    check_finite(flag, value)?;
    if value < 0.0 {
        return Err(InputError::Negative { flag });
    }
    Ok(())
}

pub fn build_inputs(args: AnalyzeArgs) -> Result<Inputs, InputError> {
    check_non_negative("--investment", args.investment)?;
    check_range("--age", args.age, 18.0, 100.0)?;
    if !(1..=40).contains(&args.years) {
        return Err(InputError::out_of_range("--years", 1.0, 40.0));
    }
    check_range("--us-pct", args.us_pct, 0.0, 100.0)?;
    check_non_negative("--contribution", args.contribution)?;

    let templates = preset_templates();
    let template = templates
        .get(args.template)
        .ok_or(InputError::UnknownTemplate {
            count: templates.len(),
        })?;

    let mode = Mode::from(args.mode);
    let bond_pct = match (mode, args.bond_pct) {
        (Mode::Preset, _) if !template.has_bonds => 0.0,
        (_, Some(bond_pct)) => bond_pct,
        (_, None) => recommended_bond_allocation(args.age),
    };
    check_range("--bond-pct", bond_pct, 0.0, 60.0)?;
    // The US share can never exceed what the bonds leave for stocks.
    let us_pct = args.us_pct.min(100.0 - bond_pct);

    let funds = if args.normalize {
        normalize_custom_allocations(&args.funds)
    } else {
        args.funds
    };
    let mut custom_funds = Vec::with_capacity(funds.len());
    for fund in funds {
        check_range("--fund", fund.percent, 0.0, 100.0)?;
        custom_funds.push(CustomFund {
            ticker: fund.ticker.trim().to_uppercase(),
            percent: fund.percent,
        });
    }

    for holding in &args.holdings {
        check_non_negative("holdings.shares", holding.shares)?;
        check_non_negative("holdings.price", holding.price)?;
    }

    Ok(Inputs {
        mode,
        investment_amount: args.investment,
        age: args.age,
        us_pct,
        bond_pct,
        plan: ProjectionPlan {
            horizon_years: args.years,
            contribution: ContributionSchedule {
                amount: args.contribution,
                frequency: args.frequency.into(),
            },
        },
        template_index: args.template,
        custom_funds,
        holdings: args.holdings,
    })
}

pub async fn run_http_server(args: ServeArgs) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let limiter = Arc::new(RateLimiter::new(args.rate_limiter_config()));
    let prices =
        FallbackPriceLookup::from_settings(&args.quote_settings()).map_err(std::io::Error::other)?;
    tracing::info!(sources = ?prices.source_names(), "price sources ready");

    let limits = limiter.config();
    tracing::info!(
        max_requests = limits.max_requests,
        window_secs = limits.window.as_secs(),
        "price lookups rate limited per client"
    );
    let pruner = limiter.spawn_pruner();
    let app = router(AppState::new(limiter, prices));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("allocator HTTP API listening on http://{addr}");
    tracing::info!("Local access: http://127.0.0.1:{}/", args.port);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await;
    pruner.abort();
    served
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/analyze",
            get(analyze_get_handler).post(analyze_post_handler),
        )
        .route("/api/templates", get(templates_handler))
        .route("/api/funds", get(funds_handler))
        .route("/api/stock-price", get(stock_price_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn templates_handler() -> Response {
    json_response(StatusCode::OK, preset_templates())
}

async fn funds_handler() -> Response {
    json_response(StatusCode::OK, fund_catalog())
}

async fn analyze_get_handler(payload: Result<Query<AnalyzePayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => analyze_handler_impl(payload).await,
        Err(rejection) => payload_error(rejection.body_text()),
    }
}

async fn analyze_post_handler(payload: Result<Json<AnalyzePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => analyze_handler_impl(payload).await,
        Err(rejection) => payload_error(rejection.body_text()),
    }
}

fn payload_error(detail: String) -> Response {
    let err = InputError::Payload(detail);
    tracing::debug!(error = %err, "rejected analysis payload");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

async fn analyze_handler_impl(payload: AnalyzePayload) -> Response {
    let inputs = match api_request_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(err) => {
            tracing::debug!(error = %err, "rejected analysis request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    tracing::debug!(
        mode = ?inputs.mode,
        investment = inputs.investment_amount,
        years = inputs.plan.horizon_years,
        "running analysis"
    );
    json_response(StatusCode::OK, run_analysis(&inputs))
}

async fn stock_price_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<PriceQuery>,
) -> Response {
    let client = client_id(&headers, peer.map(|ConnectInfo(addr)| addr));
    if !state.limiter.check_and_record(&client) {
        return price_error(&QuoteError::RateLimited);
    }

    let ticker = query.ticker.unwrap_or_default();
    match state.prices.lookup(&ticker).await {
        Ok(quote) => json_response(StatusCode::OK, PriceResult::found(quote)),
        Err(err) => price_error(&err),
    }
}

/// First `x-forwarded-for` hop, else the socket peer.
fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn price_error(err: &QuoteError) -> Response {
    let status = match err {
        QuoteError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        QuoteError::InvalidTicker => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    json_response(status, PriceResult::failed(err))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<Inputs, InputError> {
    let payload = serde_json::from_str::<AnalyzePayload>(json)
        .map_err(|e| InputError::Payload(e.to_string()))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: AnalyzePayload) -> Result<Inputs, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.mode {
        cli.mode = v.into();
    }
    if let Some(v) = payload.investment_amount {
        cli.investment = v;
    }
    if let Some(v) = payload.age {
        cli.age = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.years = v;
    }
    if let Some(v) = payload.us_pct {
        cli.us_pct = v;
    }
    if let Some(v) = payload.bond_pct {
        cli.bond_pct = Some(v);
    }
    if let Some(v) = payload.contribution_amount {
        cli.contribution = v;
    }
    if let Some(v) = payload.contribution_frequency {
        cli.frequency = ContributionFrequency::parse_lenient(&v).into();
    }
    if let Some(v) = payload.template_index {
        cli.template = v;
    }
    if let Some(v) = payload.custom_funds {
        cli.funds = v;
    }
    if let Some(v) = payload.normalize {
        cli.normalize = v;
    }
    if let Some(v) = payload.holdings {
        cli.holdings = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> AnalyzeArgs {
    AnalyzeArgs {
        mode: CliMode::Preset,
        investment: 10_000.0,
        age: 30.0,
        years: 10,
        us_pct: 70.0,
        bond_pct: None,
        contribution: 0.0,
        frequency: CliFrequency::Monthly,
        template: 0,
        funds: Vec::new(),
        normalize: false,
        holdings: Vec::new(),
    }
}
