// Payment Recovery - Web Server
// REST API with Axum over the shared recovery state

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use env_logger::Env;
use log::{info, warn};
use payment_recovery::{
    apply_criteria, loader::source_path, AppConfig, BalanceRange, CanonicalRecord,
    CollectionReceipt, Dataset, LoadOutcome, LoadStatus, RecoveryError, RecoveryState,
    SortDirection, SortOrder, Source, YearFilter,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    recovery: Arc<Mutex<RecoveryState>>,
    data_dir: PathBuf,
}

impl AppState {
    /// Single writer: every handler goes through this lock
    fn lock(&self) -> MutexGuard<'_, RecoveryState> {
        self.recovery.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(error),
        }
    }
}

fn error_status(error: &RecoveryError) -> StatusCode {
    match error {
        RecoveryError::InvalidAmount(_)
        | RecoveryError::InvalidRange { .. }
        | RecoveryError::InvalidSortDirection(_)
        | RecoveryError::UnknownColumn(_)
        | RecoveryError::UnknownSource(_) => StatusCode::BAD_REQUEST,
        RecoveryError::RecordNotFound(_) => StatusCode::NOT_FOUND,
        RecoveryError::NotLoaded(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: RecoveryError) -> Response {
    (
        error_status(&error),
        Json(ApiResponse::failed((), error.to_string())),
    )
        .into_response()
}

#[derive(Serialize)]
struct SourceResponse {
    name: &'static str,
    file_name: &'static str,
    active: bool,
}

#[derive(Serialize)]
struct LoadResponse {
    source: Source,
    outcome: LoadOutcome,
    status: LoadStatus,
}

#[derive(Debug, Default, Deserialize)]
struct RecordQuery {
    year: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    search: Option<String>,
    /// Column name; empty or "none" restores export order
    sort: Option<String>,
    dir: Option<String>,
}

#[derive(Serialize)]
struct RecordsResponse {
    source: Source,
    columns: Vec<String>,
    record_count: usize,
    records: Vec<CanonicalRecord>,
}

#[derive(Serialize)]
struct RecordDetailResponse {
    record: CanonicalRecord,
    details: Vec<(&'static str, String)>,
}

/// Amount as typed ("$200") or as a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Text(String),
    Number(f64),
}

#[derive(Deserialize)]
struct CollectRequest {
    amount: AmountInput,
}

#[derive(Serialize)]
struct CollectResponse {
    receipt: CollectionReceipt,
    version: u64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/sources - The three feeds and which one is active
async fn get_sources(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.lock().source();

    let sources: Vec<SourceResponse> = Source::ALL
        .iter()
        .map(|source| SourceResponse {
            name: source.name(),
            file_name: source.file_name(),
            active: *source == active,
        })
        .collect();

    Json(ApiResponse::ok(sources))
}

/// POST /api/sources/:name - Switch source and load its export
async fn switch_source(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let source = match name.parse::<Source>() {
        Ok(source) => source,
        Err(e) => return error_response(e),
    };

    let ticket = state.lock().begin_load(source);

    // The lock is not held across the read; a newer switch may land meanwhile
    let path = source_path(source, &state.data_dir);
    let result = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
        .and_then(|text| Dataset::from_text(source, &text).map_err(anyhow::Error::from));

    let mut recovery = state.lock();
    let outcome = recovery.finish_load(ticket, result);
    if let LoadOutcome::Applied { records } = outcome {
        info!("Switched to {} ({} records)", source, records);
    }

    let response = LoadResponse {
        source,
        outcome,
        status: recovery.status().clone(),
    };

    let status = match outcome {
        LoadOutcome::Applied { .. } => StatusCode::OK,
        LoadOutcome::NoData => StatusCode::NOT_FOUND,
        LoadOutcome::Stale => StatusCode::CONFLICT,
    };

    (status, Json(ApiResponse::ok(response))).into_response()
}

/// GET /api/records - Filtered, sorted record table
///
/// Query parameters override the stored filter for this request only.
async fn get_records(State(state): State<AppState>, Query(query): Query<RecordQuery>) -> Response {
    let recovery = state.lock();
    let mut criteria = recovery.criteria().clone();

    if let Some(year) = &query.year {
        match year.parse::<YearFilter>() {
            Ok(year) => criteria.year = year,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::failed((), format!("Invalid year: {}", year))),
                )
                    .into_response()
            }
        }
    }

    if query.min.is_some() || query.max.is_some() {
        let min = query.min.unwrap_or(criteria.balance_range.min);
        let max = query.max.unwrap_or(criteria.balance_range.max);
        match BalanceRange::new(min, max) {
            Ok(range) => criteria.balance_range = range,
            Err(e) => return error_response(e),
        }
    }

    if let Some(search) = query.search {
        criteria.search = search;
    }

    if let Some(column) = query.sort.as_deref().map(str::trim) {
        if column.is_empty() || column.eq_ignore_ascii_case("none") {
            criteria.sort = None;
        } else if recovery.headers().iter().any(|h| h == column) {
            let direction = criteria.sort.as_ref().map(|o| o.direction).unwrap_or_default();
            criteria.sort = Some(SortOrder::new(column, direction));
        } else {
            return error_response(RecoveryError::UnknownColumn(column.to_string()));
        }
    }

    if let Some(dir) = &query.dir {
        let direction = match dir.parse::<SortDirection>() {
            Ok(direction) => direction,
            Err(e) => return error_response(e),
        };
        if let Some(order) = criteria.sort.as_mut() {
            order.direction = direction;
        }
    }

    let records = apply_criteria(recovery.records(), recovery.source(), &criteria);
    let response = RecordsResponse {
        source: recovery.source(),
        columns: recovery.visible_columns(),
        record_count: records.len(),
        records,
    };

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// GET /api/records/:index - One record with its detail fields
async fn get_record(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    let recovery = state.lock();
    let schema = payment_recovery::schema_for(recovery.source());

    match recovery.record(index) {
        Some(record) => {
            let response = RecordDetailResponse {
                details: schema.detail_fields(record),
                record: record.clone(),
            };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        None => error_response(RecoveryError::RecordNotFound(index)),
    }
}

/// POST /api/records/:index/collect - Record a collection
async fn collect_record(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<CollectRequest>,
) -> Response {
    let input = match request.amount {
        AmountInput::Text(text) => text,
        AmountInput::Number(n) => n.to_string(),
    };

    let mut recovery = state.lock();
    match recovery.collect(index, &input) {
        Ok(receipt) => {
            let response = CollectResponse {
                receipt,
                version: recovery.version(),
            };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            warn!("Rejected collection on record {}: {}", index, e);
            error_response(e)
        }
    }
}

/// GET /api/dashboard - Summary and distributions over the full set
async fn get_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let recovery = state.lock();
    Json(ApiResponse::ok(recovery.dashboard().clone()))
}

/// GET /api/filters - Bounds and selections for the filter controls
async fn get_filters(State(state): State<AppState>) -> impl IntoResponse {
    let recovery = state.lock();
    Json(ApiResponse::ok(recovery.filter_controls()))
}

/// GET /api/columns - Visible table columns for the active source
async fn get_columns(State(state): State<AppState>) -> impl IntoResponse {
    let recovery = state.lock();
    Json(ApiResponse::ok(recovery.visible_columns()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    println!("🌐 Payment Recovery - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::load()?;

    let mut recovery = RecoveryState::for_today(config.default_source);
    match recovery.load_from_dir(config.default_source, &config.data_dir) {
        LoadOutcome::Applied { records } => {
            println!("✓ Loaded {} {} records", records, config.default_source)
        }
        _ => eprintln!(
            "⚠️  No data found for {} in {:?}",
            config.default_source, config.data_dir
        ),
    }

    // Create shared state
    let state = AppState {
        recovery: Arc::new(Mutex::new(recovery)),
        data_dir: config.data_dir.clone(),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/sources", get(get_sources))
        .route("/sources/:name", post(switch_source))
        .route("/records", get(get_records))
        .route("/records/:index", get(get_record))
        .route("/records/:index/collect", post(collect_record))
        .route("/dashboard", get(get_dashboard))
        .route("/filters", get(get_filters))
        .route("/columns", get(get_columns))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/records", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
