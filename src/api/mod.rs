mod format;
mod report;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    Assumptions, BASE_CLAIM_AGE, BenefitFormula, BenefitRow, CLAIM_MULTIPLIERS,
    DEFAULT_FLAT_GROWTH_RATE, MAX_CLAIM_AGE, SimulationModel, options_from_rows,
    parse_benefit_csv, validate_multiplier_table,
};
use format::FieldValue;
pub use format::{format_currency, format_money, parse_currency, parse_number};
pub use report::{
    BenefitSource, ComparisonInputs, ComparisonReport, ReportStatus, render_series_csv,
    render_text_report, resolve_benefit_rows, run_comparison,
};

const DEFAULT_REFERENCE_MONTHLY: f64 = 2632.0;

// Values used when a client sends a field that cannot be read as a number.
const FALLBACK_REFERENCE_MONTHLY: f64 = 0.0;
const FALLBACK_RATE_PERCENT: f64 = 0.0;
const FALLBACK_START_AGE: f64 = BASE_CLAIM_AGE as f64;
const FALLBACK_THROUGH_AGE: f64 = 85.0;
const FALLBACK_MAX_AGE: f64 = 100.0;
const FALLBACK_STEP_MONTHS: usize = 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliBenefitFormula {
    MultiplierTable,
    FlatGrowth,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliSimulationModel {
    Full,
    Baseline,
}

impl From<CliSimulationModel> for SimulationModel {
    fn from(value: CliSimulationModel) -> Self {
        match value {
            CliSimulationModel::Full => SimulationModel::FULL,
            CliSimulationModel::Baseline => SimulationModel::BASELINE,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiBenefitFormula {
    #[serde(alias = "multiplierTable", alias = "multiplier_table", alias = "multiplier")]
    MultiplierTable,
    #[serde(alias = "flatGrowth", alias = "flat_growth", alias = "flat")]
    FlatGrowth,
}

impl From<ApiBenefitFormula> for CliBenefitFormula {
    fn from(value: ApiBenefitFormula) -> Self {
        match value {
            ApiBenefitFormula::MultiplierTable => CliBenefitFormula::MultiplierTable,
            ApiBenefitFormula::FlatGrowth => CliBenefitFormula::FlatGrowth,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSimulationModel {
    #[serde(alias = "tax-drag", alias = "taxDrag")]
    Full,
    #[serde(alias = "simple")]
    Baseline,
}

impl From<ApiSimulationModel> for CliSimulationModel {
    fn from(value: ApiSimulationModel) -> Self {
        match value {
            ApiSimulationModel::Full => CliSimulationModel::Full,
            ApiSimulationModel::Baseline => CliSimulationModel::Baseline,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    base_benefit: Option<FieldValue>,
    benefit_formula: Option<ApiBenefitFormula>,
    flat_growth_rate: Option<FieldValue>,

    start_age: Option<FieldValue>,
    through_age: Option<FieldValue>,
    max_age: Option<FieldValue>,

    cola: Option<FieldValue>,
    interest: Option<FieldValue>,
    tax: Option<FieldValue>,
    simulation_model: Option<ApiSimulationModel>,
    include_growth_tax: Option<bool>,
    taxable_benefit_fraction: Option<FieldValue>,

    claim_age_a: Option<FieldValue>,
    claim_age_b: Option<FieldValue>,
    step_months: Option<FieldValue>,
}

#[derive(Parser, Debug)]
#[command(
    name = "breakeven",
    about = "Benefit claiming-age calculator: ranked totals and break-even age between two claim ages"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = DEFAULT_REFERENCE_MONTHLY,
        help = "Monthly benefit when claiming at 62"
    )]
    base_benefit: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliBenefitFormula::MultiplierTable,
        help = "How later claim ages are derived from the age-62 benefit"
    )]
    benefit_formula: CliBenefitFormula,
    #[arg(
        long,
        default_value_t = DEFAULT_FLAT_GROWTH_RATE * 100.0,
        help = "Per-year step-up in percent, used when --benefit-formula=flat-growth"
    )]
    flat_growth_rate: f64,
    #[arg(
        long,
        help = "CSV benefit table with headers age,monthly; overrides --base-benefit"
    )]
    csv: Option<PathBuf>,
    #[arg(long, default_value_t = FALLBACK_START_AGE)]
    start_age: f64,
    #[arg(
        long,
        default_value_t = FALLBACK_THROUGH_AGE,
        help = "Rank claim ages by balance reached at this age"
    )]
    through_age: f64,
    #[arg(
        long,
        default_value_t = FALLBACK_MAX_AGE,
        help = "Last age searched for a break-even"
    )]
    max_age: f64,
    #[arg(long, default_value_t = 2.0, help = "Annual COLA in percent, e.g. 2.5")]
    cola: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual return in percent earned on invested benefits"
    )]
    interest: f64,
    #[arg(long, default_value_t = 0.0, help = "Effective tax rate in percent")]
    tax: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliSimulationModel::Full,
        help = "full taxes growth and 85% of benefits; baseline taxes 100% of benefits only"
    )]
    simulation_model: CliSimulationModel,
    #[arg(
        long,
        num_args = 2,
        value_names = ["AGE_A", "AGE_B"],
        help = "Claim ages to compare for break-even"
    )]
    compare: Option<Vec<u32>>,
    #[arg(
        long,
        default_value_t = 12,
        help = "Sampling step for --out, 1 = monthly, 12 = yearly"
    )]
    step_months: usize,
    #[arg(long, help = "Write every option's balance series to this CSV file")]
    out: Option<PathBuf>,
    #[arg(skip)]
    taxable_benefit_fraction: Option<f64>,
    #[arg(skip)]
    include_growth_tax: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BenefitsResponse {
    rows: Vec<BenefitRow>,
    error: Option<String>,
}

fn build_inputs(cli: &Cli, explicit_rows: Option<Vec<BenefitRow>>) -> Result<ComparisonInputs, String> {
    for (name, age) in [
        ("--start-age", cli.start_age),
        ("--through-age", cli.through_age),
        ("--max-age", cli.max_age),
    ] {
        if !age.is_finite() || !(0.0..=150.0).contains(&age) {
            return Err(format!("{name} must be between 0 and 150"));
        }
    }

    if !(0.0..=100.0).contains(&cli.tax) {
        return Err("--tax must be between 0 and 100".to_string());
    }

    for (name, rate) in [
        ("--cola", cli.cola),
        ("--interest", cli.interest),
        ("--flat-growth-rate", cli.flat_growth_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    if cli.step_months == 0 {
        return Err("--step-months must be >= 1".to_string());
    }

    let mut model: SimulationModel = cli.simulation_model.into();
    if let Some(include) = cli.include_growth_tax {
        model.include_growth_tax = include;
    }
    if let Some(fraction) = cli.taxable_benefit_fraction {
        if !(0.0..=1.0).contains(&fraction) {
            return Err("taxableBenefitFraction must be between 0 and 1".to_string());
        }
        model.taxable_benefit_fraction = fraction;
    }

    let benefits = match explicit_rows {
        Some(rows) => BenefitSource::Explicit(rows),
        None => BenefitSource::Derived {
            reference_monthly: cli.base_benefit,
            formula: match cli.benefit_formula {
                CliBenefitFormula::MultiplierTable => BenefitFormula::MultiplierTable,
                CliBenefitFormula::FlatGrowth => BenefitFormula::FlatGrowth {
                    annual_rate: cli.flat_growth_rate / 100.0,
                },
            },
        },
    };

    let (claim_age_a, claim_age_b) = match cli.compare.as_deref() {
        Some([a, b]) => (*a, *b),
        _ => (BASE_CLAIM_AGE, MAX_CLAIM_AGE),
    };

    Ok(ComparisonInputs {
        benefits,
        start_age: cli.start_age,
        through_age: cli.through_age,
        max_age: cli.max_age,
        assumptions: Assumptions::new(cli.cola / 100.0, cli.interest / 100.0, cli.tax / 100.0)
            .with_model(model),
        claim_age_a,
        claim_age_b,
        step_months: cli.step_months,
    })
}

pub fn run_cli() -> Result<(), String> {
    validate_multiplier_table(&CLAIM_MULTIPLIERS).map_err(|e| e.to_string())?;
    let cli = Cli::parse();

    let explicit_rows = match &cli.csv {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            Some(parse_benefit_csv(&text).map_err(|e| e.to_string())?)
        }
        None => None,
    };

    let inputs = build_inputs(&cli, explicit_rows)?;
    debug!(?inputs, "resolved comparison inputs");
    let report = run_comparison(&inputs);
    info!(
        status = ?report.status,
        break_even_age = ?report.break_even_age,
        "comparison complete"
    );
    println!("{}", render_text_report(&report));

    if let Some(path) = &cli.out {
        let rows = resolve_benefit_rows(&inputs.benefits, inputs.assumptions.cola_annual)
            .map_err(|e| e.to_string())?;
        let csv = render_series_csv(
            &options_from_rows(&rows),
            inputs.start_age,
            inputs.max_age,
            &inputs.assumptions,
            inputs.step_months,
        );
        fs::write(path, csv).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        println!("Wrote series to {}", path.display());
    }
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    validate_multiplier_table(&CLAIM_MULTIPLIERS).map_err(std::io::Error::other)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route(
            "/api/benefits",
            get(benefits_get_handler).post(benefits_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "break-even HTTP API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_get_handler(Query(payload): Query<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_handler_impl(payload: ComparePayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            warn!(error = %msg, "rejected compare request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    debug!(?inputs, "running comparison");
    let report = run_comparison(&inputs);
    json_response(StatusCode::OK, report)
}

async fn benefits_get_handler(Query(payload): Query<ComparePayload>) -> Response {
    benefits_handler_impl(payload).await
}

async fn benefits_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    benefits_handler_impl(payload).await
}

async fn benefits_handler_impl(payload: ComparePayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            warn!(error = %msg, "rejected benefits request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let body = match resolve_benefit_rows(&inputs.benefits, inputs.assumptions.cola_annual) {
        Ok(rows) => BenefitsResponse { rows, error: None },
        Err(err) => BenefitsResponse {
            rows: Vec::new(),
            error: Some(err.to_string()),
        },
    };
    json_response(StatusCode::OK, body)
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
fn inputs_from_json(json: &str) -> Result<ComparisonInputs, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload)
}

fn inputs_from_payload(payload: ComparePayload) -> Result<ComparisonInputs, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.base_benefit {
        cli.base_benefit = v.currency().unwrap_or(FALLBACK_REFERENCE_MONTHLY);
    }
    if let Some(v) = payload.benefit_formula {
        cli.benefit_formula = v.into();
    }
    if let Some(v) = payload.flat_growth_rate {
        cli.flat_growth_rate = v.number().unwrap_or(DEFAULT_FLAT_GROWTH_RATE * 100.0);
    }

    if let Some(v) = payload.start_age {
        cli.start_age = v.number().unwrap_or(FALLBACK_START_AGE);
    }
    if let Some(v) = payload.through_age {
        cli.through_age = v.number().unwrap_or(FALLBACK_THROUGH_AGE);
    }
    if let Some(v) = payload.max_age {
        cli.max_age = v.number().unwrap_or(FALLBACK_MAX_AGE);
    }

    if let Some(v) = payload.cola {
        cli.cola = v.number().unwrap_or(FALLBACK_RATE_PERCENT);
    }
    if let Some(v) = payload.interest {
        cli.interest = v.number().unwrap_or(FALLBACK_RATE_PERCENT);
    }
    if let Some(v) = payload.tax {
        cli.tax = v.number().unwrap_or(FALLBACK_RATE_PERCENT);
    }
    if let Some(v) = payload.simulation_model {
        cli.simulation_model = CliSimulationModel::from(v);
    }
    cli.include_growth_tax = payload.include_growth_tax;
    cli.taxable_benefit_fraction = payload.taxable_benefit_fraction.and_then(|v| v.number());

    let claim_age_a = payload
        .claim_age_a
        .map(|v| v.whole_number().unwrap_or(BASE_CLAIM_AGE))
        .unwrap_or(BASE_CLAIM_AGE);
    let claim_age_b = payload
        .claim_age_b
        .map(|v| v.whole_number().unwrap_or(MAX_CLAIM_AGE))
        .unwrap_or(MAX_CLAIM_AGE);
    cli.compare = Some(vec![claim_age_a, claim_age_b]);

    if let Some(v) = payload.step_months {
        cli.step_months = v
            .whole_number()
            .map(|n| n as usize)
            .unwrap_or(FALLBACK_STEP_MONTHS);
    }

    build_inputs(&cli, None)
}

fn default_cli_for_api() -> Cli {
    Cli {
        base_benefit: DEFAULT_REFERENCE_MONTHLY,
        benefit_formula: CliBenefitFormula::MultiplierTable,
        flat_growth_rate: DEFAULT_FLAT_GROWTH_RATE * 100.0,
        csv: None,
        start_age: FALLBACK_START_AGE,
        through_age: FALLBACK_THROUGH_AGE,
        max_age: FALLBACK_MAX_AGE,
        cola: 2.0,
        interest: 4.0,
        tax: 0.0,
        simulation_model: CliSimulationModel::Full,
        compare: None,
        step_months: FALLBACK_STEP_MONTHS,
        out: None,
        taxable_benefit_fraction: None,
        include_growth_tax: None,
    }
}
