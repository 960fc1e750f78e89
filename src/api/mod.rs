use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, trace, warn};

use crate::core::{
    AllocationPlan, PlanError, ProfitMatrix, compute_plan, compute_plan_with_cancel,
};
use crate::input::{self, InputError, Problem};
use crate::report::{self, ReportFormat};

const DEFAULT_UNIT_SIZE: f64 = 1.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliReportFormat {
    Text,
    Json,
}

impl From<CliReportFormat> for ReportFormat {
    fn from(value: CliReportFormat) -> Self {
        match value {
            CliReportFormat::Text => ReportFormat::Text,
            CliReportFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "allotment",
    about = "Optimal distribution of a discrete investment budget over recipients with independent profit tables"
)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the allocation described by a profit matrix file
    Plan(PlanArgs),
    /// Serve the planner over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Matrix file: one row of profits per recipient, then `discretness <unit size>`
    input: PathBuf,
    #[arg(
        long,
        help = "Portions to distribute; defaults to the whole portion axis (row length - 1)"
    )]
    budget: Option<usize>,
    #[arg(long, value_enum, default_value_t = CliReportFormat::Text)]
    format: CliReportFormat,
    #[arg(long, help = "Do not append the report to `<input>[result]`")]
    no_write: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(
        long,
        default_value_t = 2000,
        help = "Abort a single plan computation after this many milliseconds"
    )]
    max_compute_ms: u64,
}

#[derive(Copy, Clone, Debug)]
struct ServerConfig {
    max_compute: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    rows: Vec<Vec<f64>>,
    unit_size: Option<f64>,
    budget: Option<i64>,
}

#[derive(Debug)]
struct PlanRequest {
    table: ProfitMatrix,
    budget: usize,
    unit_size: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("planning task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Plan(PlanError::Cancelled { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Input(_) | ApiError::Plan(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "plan request rejected");
        error_response(status, &self.to_string())
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Plan(args) => run_plan_command(args),
            Command::Serve(args) => {
                let config = ServerConfig {
                    max_compute: Duration::from_millis(args.max_compute_ms),
                };
                run_http_server(args.port, config)
                    .await
                    .context("HTTP server failed")
            }
        }
    }
}

fn run_plan_command(args: PlanArgs) -> anyhow::Result<()> {
    let problem = input::read_problem(&args.input)
        .with_context(|| format!("File {} has invalid content", args.input.display()))?;
    let budget = args.budget.unwrap_or_else(|| problem.full_budget());

    let plan = compute_plan(&problem.table, budget, problem.unit_size)
        .with_context(|| format!("could not plan {budget} portions"))?;
    info!(
        total_profit = plan.total_profit(),
        total_amount = plan.total_amount(),
        "plan ready"
    );
    let text = report::render(&plan, args.format.into())?;
    println!("{text}");

    if !args.no_write {
        let output = report::result_path(&args.input);
        report::write_report(&output, &text)?;
        info!(path = %output.display(), "report saved");
    }
    Ok(())
}

async fn run_http_server(port: u16, config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/plan", post(plan_json_handler))
        .route("/api/plan/text", post(plan_text_handler))
        .fallback(not_found_handler)
        .with_state(config);

    let listener = TcpListener::bind(addr).await?;
    info!("allotment HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_json_handler(
    State(config): State<ServerConfig>,
    Json(payload): Json<PlanPayload>,
) -> Result<Response, ApiError> {
    let request = plan_request_from_payload(payload)?;
    plan_handler_impl(config, request).await
}

async fn plan_text_handler(
    State(config): State<ServerConfig>,
    body: String,
) -> Result<Response, ApiError> {
    let request = plan_request_from_text(&body)?;
    plan_handler_impl(config, request).await
}

async fn plan_handler_impl(
    config: ServerConfig,
    request: PlanRequest,
) -> Result<Response, ApiError> {
    debug!(
        recipients = request.table.rows().len(),
        budget = request.budget,
        "plan request accepted"
    );
    let plan =
        tokio::task::spawn_blocking(move || plan_with_deadline(&request, config.max_compute))
            .await??;
    Ok(json_response(StatusCode::OK, plan))
}

fn plan_with_deadline(
    request: &PlanRequest,
    max_compute: Duration,
) -> Result<AllocationPlan, PlanError> {
    let deadline = Instant::now() + max_compute;
    compute_plan_with_cancel(&request.table, request.budget, request.unit_size, || {
        Instant::now() >= deadline
    })
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
fn plan_request_from_json(json: &str) -> Result<PlanRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    plan_request_from_payload(payload).map_err(|e| e.to_string())
}

fn plan_request_from_payload(payload: PlanPayload) -> Result<PlanRequest, ApiError> {
    let table = ProfitMatrix::new(payload.rows).map_err(InputError::from)?;
    let max_portions = table.max_budget().unwrap_or(0);
    let budget = match payload.budget {
        Some(v) => usize::try_from(v).map_err(|_| PlanError::InvalidBudget {
            budget: v,
            max_portions,
        })?,
        None => max_portions,
    };
    trace!(rows = ?table.rows(), budget, "plan payload decoded");
    Ok(PlanRequest {
        table,
        budget,
        unit_size: payload.unit_size.unwrap_or(DEFAULT_UNIT_SIZE),
    })
}

fn plan_request_from_text(body: &str) -> Result<PlanRequest, ApiError> {
    let Problem { table, unit_size } = input::parse_problem(body)?;
    let budget = table.max_budget().unwrap_or(0);
    Ok(PlanRequest {
        table,
        budget,
        unit_size,
    })
}
