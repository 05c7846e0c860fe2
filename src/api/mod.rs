use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    Allocation, FailurePolicy, HistorySummary, PathId, ReturnSource, SELECTION_STREAM,
    SampleRunSelection, SimulationParams, SimulationPath, SimulationResult, US_HISTORY,
    YearDetail, YearlyBand, YearlyReturn, derive_year_details, run_simulation, seeded_rng,
    select_samples, summarize,
};

const DEFAULT_INITIAL_PORTFOLIO: f64 = 1_000_000.0;
const DEFAULT_ANNUAL_WITHDRAWAL: f64 = 40_000.0;
const DEFAULT_RETIREMENT_YEARS: u32 = 30;
const DEFAULT_STOCK_ALLOCATION: f64 = 60.0;
const DEFAULT_SIMULATIONS: u32 = 1_000;

const MAX_RETIREMENT_YEARS: u32 = 100;
const MAX_SIMULATIONS: u32 = 100_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliReturnSource {
    Parametric,
    Historical,
}

impl From<CliReturnSource> for ReturnSource {
    fn from(value: CliReturnSource) -> Self {
        match value {
            CliReturnSource::Parametric => ReturnSource::Parametric,
            CliReturnSource::Historical => ReturnSource::Historical,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliFailurePolicy {
    Continue,
    Freeze,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(value: CliFailurePolicy) -> Self {
        match value {
            CliFailurePolicy::Continue => FailurePolicy::ContinueCompounding,
            CliFailurePolicy::Freeze => FailurePolicy::FreezeAtZero,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiReturnSource {
    #[serde(alias = "normal", alias = "monte-carlo", alias = "monteCarlo")]
    Parametric,
    #[serde(alias = "bootstrap", alias = "history")]
    Historical,
}

impl From<ApiReturnSource> for CliReturnSource {
    fn from(value: ApiReturnSource) -> Self {
        match value {
            ApiReturnSource::Parametric => CliReturnSource::Parametric,
            ApiReturnSource::Historical => CliReturnSource::Historical,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFailurePolicy {
    #[serde(
        alias = "continueCompounding",
        alias = "continue_compounding",
        alias = "continue-compounding"
    )]
    Continue,
    #[serde(
        alias = "freezeAtZero",
        alias = "freeze_at_zero",
        alias = "freeze-at-zero"
    )]
    Freeze,
}

impl From<ApiFailurePolicy> for CliFailurePolicy {
    fn from(value: ApiFailurePolicy) -> Self {
        match value {
            ApiFailurePolicy::Continue => CliFailurePolicy::Continue,
            ApiFailurePolicy::Freeze => CliFailurePolicy::Freeze,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_portfolio: Option<f64>,
    annual_withdrawal: Option<f64>,
    retirement_years: Option<u32>,
    stock_allocation: Option<f64>,
    bond_allocation: Option<f64>,
    simulations: Option<u32>,
    return_source: Option<ApiReturnSource>,
    failure_policy: Option<ApiFailurePolicy>,
    seed: Option<u64>,
    include_paths: Option<bool>,
}

/// Simulation inputs as entered on the command line; the HTTP API overlays
/// its payload on the same defaults.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_INITIAL_PORTFOLIO,
        help = "Starting portfolio value"
    )]
    pub initial_portfolio: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_ANNUAL_WITHDRAWAL,
        help = "First-year withdrawal; later years grow with inflation"
    )]
    pub annual_withdrawal: f64,
    #[arg(long, default_value_t = DEFAULT_RETIREMENT_YEARS)]
    pub retirement_years: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_STOCK_ALLOCATION,
        help = "Stock allocation in percent, e.g. 60"
    )]
    pub stock_allocation: f64,
    #[arg(
        long,
        help = "Bond allocation in percent, defaults to 100 - stock-allocation"
    )]
    pub bond_allocation: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
    pub simulations: u32,
    #[arg(long, value_enum, default_value_t = CliReturnSource::Parametric)]
    pub return_source: CliReturnSource,
    #[arg(
        long,
        value_enum,
        default_value_t = CliFailurePolicy::Continue,
        help = "Keep compounding a depleted balance, or freeze it at zero"
    )]
    pub failure_policy: CliFailurePolicy,
    #[arg(long, help = "Seed for reproducible runs; OS entropy when omitted")]
    pub seed: Option<u64>,
    #[arg(long, help = "Include every simulated path in the report")]
    pub include_paths: bool,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            initial_portfolio: DEFAULT_INITIAL_PORTFOLIO,
            annual_withdrawal: DEFAULT_ANNUAL_WITHDRAWAL,
            retirement_years: DEFAULT_RETIREMENT_YEARS,
            stock_allocation: DEFAULT_STOCK_ALLOCATION,
            bond_allocation: None,
            simulations: DEFAULT_SIMULATIONS,
            return_source: CliReturnSource::Parametric,
            failure_policy: CliFailurePolicy::Continue,
            seed: None,
            include_paths: false,
        }
    }
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParams,
    include_paths: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleRunView {
    path_index: PathId,
    success: bool,
    failure_year: Option<u32>,
    final_balance: f64,
    years: Vec<YearDetail>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleRuns {
    best_case: SampleRunView,
    worst_case: SampleRunView,
    median: SampleRunView,
    random_success: Option<SampleRunView>,
    random_failure: Option<SampleRunView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    return_source: ReturnSource,
    failure_policy: FailurePolicy,
    seed: Option<u64>,
    initial_portfolio: f64,
    annual_withdrawal: f64,
    retirement_years: u32,
    allocation: Allocation,
    success_rate: f64,
    success_count: u32,
    total_simulations: u32,
    success_ci_half_width: f64,
    median_ending_balance: f64,
    worst_case_balance: f64,
    best_case_balance: f64,
    yearly_bands: Vec<YearlyBand>,
    median_path: SimulationPath,
    samples: SampleRuns,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<SimulationPath>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    summary: Option<HistorySummary>,
    years: &'static [YearlyReturn],
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_params(args: &SimulateArgs) -> Result<SimulationParams, String> {
    if !args.initial_portfolio.is_finite() || args.initial_portfolio < 0.0 {
        return Err("--initial-portfolio must be >= 0".to_string());
    }

    if !args.annual_withdrawal.is_finite() || args.annual_withdrawal < 0.0 {
        return Err("--annual-withdrawal must be >= 0".to_string());
    }

    if args.retirement_years == 0 || args.retirement_years > MAX_RETIREMENT_YEARS {
        return Err(format!(
            "--retirement-years must be between 1 and {MAX_RETIREMENT_YEARS}"
        ));
    }

    if args.simulations == 0 || args.simulations > MAX_SIMULATIONS {
        return Err(format!(
            "--simulations must be between 1 and {MAX_SIMULATIONS}"
        ));
    }

    let bond_allocation = args
        .bond_allocation
        .unwrap_or(100.0 - args.stock_allocation);
    for (name, pct) in [
        ("--stock-allocation", args.stock_allocation),
        ("--bond-allocation", bond_allocation),
    ] {
        if !(0.0..=100.0).contains(&pct) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    let allocation = Allocation::new(args.stock_allocation / 100.0, bond_allocation / 100.0)
        .map_err(|e| format!("--stock-allocation and --bond-allocation: {e}"))?;

    let params = SimulationParams {
        initial_portfolio: args.initial_portfolio,
        annual_withdrawal: args.annual_withdrawal,
        retirement_years: args.retirement_years,
        allocation,
        simulations: args.simulations,
        return_source: args.return_source.into(),
        failure_policy: args.failure_policy.into(),
        seed: args.seed,
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

/// Runs a full simulation and assembles the report shared by the CLI and
/// the HTTP API.
pub fn simulate_report(
    params: &SimulationParams,
    include_paths: bool,
) -> Result<SimulateResponse, String> {
    let result = run_simulation(params).map_err(|e| e.to_string())?;
    let mut rng = seeded_rng(params.seed, SELECTION_STREAM);
    let selection = select_samples(&result, &mut rng);
    Ok(build_simulate_response(
        params,
        result,
        selection,
        include_paths,
    ))
}

pub fn run_cli_report(args: &SimulateArgs) -> Result<SimulateResponse, String> {
    let params = build_params(args)?;
    simulate_report(&params, args.include_paths)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement simulation API listening");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/history", get(history_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn history_handler() -> Response {
    json_response(StatusCode::OK, history_response())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let ApiRequest {
        params,
        include_paths,
    } = request;
    let outcome =
        tokio::task::spawn_blocking(move || simulate_report(&params, include_paths)).await;

    match outcome {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => {
            error!(error = %e, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut args = SimulateArgs::default();

    if let Some(v) = payload.initial_portfolio {
        args.initial_portfolio = v;
    }
    if let Some(v) = payload.annual_withdrawal {
        args.annual_withdrawal = v;
    }
    if let Some(v) = payload.retirement_years {
        args.retirement_years = v;
    }
    if let Some(v) = payload.stock_allocation {
        args.stock_allocation = v;
    }
    if let Some(v) = payload.bond_allocation {
        args.bond_allocation = Some(v);
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.return_source {
        args.return_source = v.into();
    }
    if let Some(v) = payload.failure_policy {
        args.failure_policy = v.into();
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }
    if let Some(v) = payload.include_paths {
        args.include_paths = v;
    }

    let params = build_params(&args)?;
    Ok(ApiRequest {
        params,
        include_paths: args.include_paths,
    })
}

fn sample_run_view(
    result: &SimulationResult,
    id: PathId,
    initial_portfolio: f64,
) -> SampleRunView {
    let path = result.path(id);
    SampleRunView {
        path_index: id,
        success: path.success,
        failure_year: path.failure_year,
        final_balance: path.final_balance,
        years: derive_year_details(path, initial_portfolio),
    }
}

fn build_simulate_response(
    params: &SimulationParams,
    result: SimulationResult,
    selection: SampleRunSelection,
    include_paths: bool,
) -> SimulateResponse {
    let initial = params.initial_portfolio;
    let samples = SampleRuns {
        best_case: sample_run_view(&result, selection.best_case, initial),
        worst_case: sample_run_view(&result, selection.worst_case, initial),
        median: sample_run_view(&result, selection.median, initial),
        random_success: selection
            .random_success
            .map(|id| sample_run_view(&result, id, initial)),
        random_failure: selection
            .random_failure
            .map(|id| sample_run_view(&result, id, initial)),
    };
    let median_path = result.median().clone();

    SimulateResponse {
        return_source: params.return_source,
        failure_policy: params.failure_policy,
        seed: params.seed,
        initial_portfolio: params.initial_portfolio,
        annual_withdrawal: params.annual_withdrawal,
        retirement_years: params.retirement_years,
        allocation: params.allocation,
        success_rate: result.success_rate,
        success_count: result.success_count,
        total_simulations: result.total_simulations,
        success_ci_half_width: result.success_ci_half_width,
        median_ending_balance: result.median_ending_balance,
        worst_case_balance: result.worst_case_balance,
        best_case_balance: result.best_case_balance,
        yearly_bands: result.yearly_bands,
        median_path,
        samples,
        paths: include_paths.then_some(result.paths),
    }
}

fn history_response() -> HistoryResponse {
    HistoryResponse {
        summary: summarize(US_HISTORY),
        years: US_HISTORY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> SimulateArgs {
        SimulateArgs {
            simulations: 200,
            seed: Some(42),
            ..SimulateArgs::default()
        }
    }

    #[test]
    fn build_params_defaults_bond_allocation_to_remainder() {
        let mut args = sample_args();
        args.stock_allocation = 75.0;
        args.bond_allocation = None;

        let params = build_params(&args).expect("valid params");
        assert_approx(params.allocation.stocks(), 0.75);
        assert_approx(params.allocation.bonds(), 0.25);
    }

    #[test]
    fn build_params_rejects_allocations_not_summing_to_100() {
        let mut args = sample_args();
        args.stock_allocation = 60.0;
        args.bond_allocation = Some(60.0);

        let err = build_params(&args).expect_err("must reject 120% allocation");
        assert!(err.contains("sum to 1"), "{err}");
    }

    #[test]
    fn build_params_rejects_out_of_range_allocation() {
        let mut args = sample_args();
        args.stock_allocation = 120.0;

        let err = build_params(&args).expect_err("must reject > 100% stocks");
        assert!(err.contains("--stock-allocation"));
    }

    #[test]
    fn build_params_rejects_zero_simulations_and_years() {
        let mut args = sample_args();
        args.simulations = 0;
        let err = build_params(&args).expect_err("must reject zero simulations");
        assert!(err.contains("--simulations"));

        let mut args = sample_args();
        args.retirement_years = 0;
        let err = build_params(&args).expect_err("must reject zero years");
        assert!(err.contains("--retirement-years"));
    }

    #[test]
    fn build_params_rejects_negative_amounts() {
        let mut args = sample_args();
        args.annual_withdrawal = -1.0;
        let err = build_params(&args).expect_err("must reject negative withdrawal");
        assert!(err.contains("--annual-withdrawal"));

        let mut args = sample_args();
        args.initial_portfolio = f64::NAN;
        let err = build_params(&args).expect_err("must reject NaN portfolio");
        assert!(err.contains("--initial-portfolio"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "initialPortfolio": 750000,
          "annualWithdrawal": 30000,
          "retirementYears": 25,
          "stockAllocation": 80,
          "bondAllocation": 20,
          "simulations": 1234,
          "returnSource": "historical",
          "failurePolicy": "freezeAtZero",
          "seed": 9,
          "includePaths": true
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let params = request.params;

        assert_approx(params.initial_portfolio, 750_000.0);
        assert_approx(params.annual_withdrawal, 30_000.0);
        assert_eq!(params.retirement_years, 25);
        assert_approx(params.allocation.stocks(), 0.8);
        assert_approx(params.allocation.bonds(), 0.2);
        assert_eq!(params.simulations, 1234);
        assert_eq!(params.return_source, ReturnSource::Historical);
        assert_eq!(params.failure_policy, FailurePolicy::FreezeAtZero);
        assert_eq!(params.seed, Some(9));
        assert!(request.include_paths);
    }

    #[test]
    fn api_request_from_empty_json_uses_defaults() {
        let request = api_request_from_json("{}").expect("json should parse");
        let params = request.params;

        assert_approx(params.initial_portfolio, DEFAULT_INITIAL_PORTFOLIO);
        assert_approx(params.annual_withdrawal, DEFAULT_ANNUAL_WITHDRAWAL);
        assert_eq!(params.retirement_years, DEFAULT_RETIREMENT_YEARS);
        assert_approx(params.allocation.stocks(), 0.6);
        assert_eq!(params.simulations, DEFAULT_SIMULATIONS);
        assert_eq!(params.return_source, ReturnSource::Parametric);
        assert_eq!(params.failure_policy, FailurePolicy::ContinueCompounding);
        assert_eq!(params.seed, None);
        assert!(!request.include_paths);
    }

    #[test]
    fn api_request_from_json_rejects_unknown_source() {
        let err = api_request_from_json(r#"{"returnSource": "crystal-ball"}"#)
            .expect_err("unknown source must fail");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn api_request_accepts_source_aliases() {
        let request =
            api_request_from_json(r#"{"returnSource": "bootstrap"}"#).expect("alias parses");
        assert_eq!(request.params.return_source, ReturnSource::Historical);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let params = build_params(&sample_args()).expect("valid params");
        let response = simulate_report(&params, false).expect("simulation runs");
        let json = serde_json::to_string(&response).expect("response should serialize");

        for key in [
            "\"successRate\"",
            "\"successCount\"",
            "\"totalSimulations\"",
            "\"medianEndingBalance\"",
            "\"worstCaseBalance\"",
            "\"bestCaseBalance\"",
            "\"successCiHalfWidth\"",
            "\"yearlyBands\"",
            "\"medianPath\"",
            "\"portfolioValues\"",
            "\"samples\"",
            "\"bestCase\"",
            "\"randomFailure\"",
            "\"marketReturn\"",
            "\"returnSource\":\"parametric\"",
            "\"failurePolicy\":\"continue-compounding\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
        assert!(!json.contains("\"paths\""));
    }

    #[test]
    fn simulate_report_includes_paths_on_request() {
        let mut args = sample_args();
        args.simulations = 12;
        args.retirement_years = 5;
        args.include_paths = true;

        let response = run_cli_report(&args).expect("simulation runs");
        let paths = response.paths.as_ref().expect("paths requested");
        assert_eq!(paths.len(), 12);
        assert_eq!(response.samples.median.years.len(), 5);
        assert_eq!(response.yearly_bands.len(), 6);
    }

    #[test]
    fn seeded_reports_are_reproducible() {
        let params = build_params(&sample_args()).expect("valid params");
        let a = simulate_report(&params, false).expect("simulation runs");
        let b = simulate_report(&params, false).expect("simulation runs");

        assert_eq!(
            serde_json::to_string(&a).expect("serialize"),
            serde_json::to_string(&b).expect("serialize")
        );
    }

    #[test]
    fn history_response_exposes_table_and_summary() {
        let json = serde_json::to_string(&history_response()).expect("serialize");
        assert!(json.contains("\"firstYear\":1928"));
        assert!(json.contains("\"equityReturn\""));
        assert!(json.contains("\"meanInflation\""));
    }
}
