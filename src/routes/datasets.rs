use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    services::{
        analysis::{
            self,
            types::{limits, ChartSeries, ChartSpec, ColumnProfile, DatasetProfile, Row},
        },
        ingest,
        insight::InsightReport,
        store::StoredDataset,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/datasets/analyze", post(analyze_dataset))
        .route("/datasets/:id/charts/:index/series", get(chart_series))
        .route("/datasets/:id/insights", post(dataset_insight))
        .route("/datasets/:id/insights/point", post(point_insight))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    name: Option<String>,
    /// Single-character override; sniffed from the header when absent.
    delimiter: Option<String>,
    text: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    dataset_id: String,
    name: String,
    created_at: String,
    row_count: usize,
    column_count: usize,
    column_names: Vec<String>,
    sample_rows: Vec<Row>,
    profile: DatasetProfile,
    charts: Vec<ChartSpec>,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    spec: ChartSpec,
    series: ChartSeries,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointInsightRequest {
    chart_index: usize,
    point: serde_json::Value,
}

#[axum::debug_handler]
async fn analyze_dataset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let start = std::time::Instant::now();
    let name = request.name.as_deref().unwrap_or("dataset");
    tracing::info!("Starting analysis for dataset: {name}");

    let text = match (&request.text, &request.url) {
        (Some(text), _) => {
            if text.len() > state.config.max_upload_bytes {
                return Err(AppError::InvalidInput(format!(
                    "source exceeds the {} byte limit",
                    state.config.max_upload_bytes
                )));
            }
            text.clone()
        }
        (None, Some(url)) => {
            tracing::info!("Fetching source from URL...");
            let fetch_start = std::time::Instant::now();
            let fetched = ingest::fetch_text(url, state.config.max_upload_bytes).await?;
            tracing::info!(
                "Source fetched, size: {}KB, took: {:?}",
                fetched.len() / 1024,
                fetch_start.elapsed()
            );
            fetched
        }
        (None, None) => {
            return Err(AppError::InvalidInput(
                "either text or url is required".to_string(),
            ))
        }
    };

    let delimiter = parse_delimiter_override(request.delimiter.as_deref())?;
    let parse_start = std::time::Instant::now();
    let dataset = ingest::parse_delimited(&text, delimiter)?;
    tracing::info!(
        "Parsed {} rows x {} columns in {:?}",
        dataset.rows.len(),
        dataset.columns.len(),
        parse_start.elapsed()
    );

    let profile_start = std::time::Instant::now();
    let profile = analysis::profile_dataset(&dataset);
    let charts = analysis::plan(&profile);
    tracing::info!(
        "Profiled {} columns and planned {} charts in {:?}",
        profile.total_columns,
        charts.len(),
        profile_start.elapsed()
    );

    let sample_rows: Vec<Row> = dataset.rows.iter().take(limits::SAMPLE_ROWS).cloned().collect();
    let stored = state.store.insert(name, dataset);
    tracing::info!("Total processing completed in {:?}", start.elapsed());

    Ok(Json(AnalyzeResponse {
        dataset_id: stored.id.clone(),
        name: stored.name.clone(),
        created_at: stored.created_at.to_rfc3339(),
        row_count: stored.dataset.rows.len(),
        column_count: stored.dataset.columns.len(),
        column_names: stored.dataset.columns.clone(),
        sample_rows,
        profile,
        charts,
    }))
}

#[axum::debug_handler]
async fn chart_series(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<SeriesResponse>, AppError> {
    let stored = lookup(&state, &id)?;
    let profile = analysis::profile_dataset(&stored.dataset);
    let spec = planned_spec(&profile, index)?;
    let series = analysis::build_series(&stored.dataset, &spec);
    Ok(Json(SeriesResponse { spec, series }))
}

#[axum::debug_handler]
async fn dataset_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InsightReport>, AppError> {
    let stored = lookup(&state, &id)?;
    let profile = analysis::profile_dataset(&stored.dataset);
    // Insight failures degrade inside the agent; this endpoint always 200s.
    let report = state.insight.dataset_insight(&stored.dataset, &profile).await;
    Ok(Json(report))
}

#[axum::debug_handler]
async fn point_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<PointInsightRequest>,
) -> Result<Json<InsightReport>, AppError> {
    let stored = lookup(&state, &id)?;
    let profile = analysis::profile_dataset(&stored.dataset);
    let spec = planned_spec(&profile, request.chart_index)?;
    let column_profile: Option<&ColumnProfile> = spec
        .columns
        .first()
        .and_then(|column| profile.columns.get(column));
    let report = state
        .insight
        .point_insight(&spec, &request.point, stored.dataset.rows.len(), column_profile)
        .await;
    Ok(Json(report))
}

fn lookup(state: &AppState, id: &str) -> Result<Arc<StoredDataset>, AppError> {
    state
        .store
        .get(id)
        .ok_or_else(|| AppError::DatasetNotFound(id.to_string()))
}

/// The plan is deterministic over the profile, so it is recomputed per
/// request instead of being stored with the dataset. Callers profile the
/// dataset once and share it between planning and the rest of the handler.
fn planned_spec(profile: &DatasetProfile, index: usize) -> Result<ChartSpec, AppError> {
    let mut plan = analysis::plan(profile);
    if index >= plan.len() {
        return Err(AppError::InvalidInput(format!(
            "no chart at index {index}, plan has {} entries",
            plan.len()
        )));
    }
    Ok(plan.swap_remove(index))
}

fn parse_delimiter_override(raw: Option<&str>) -> Result<Option<u8>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let mut bytes = s.bytes();
            match (bytes.next(), bytes.next()) {
                (Some(delimiter), None) if delimiter.is_ascii() => Ok(Some(delimiter)),
                _ => Err(AppError::InvalidInput(
                    "delimiter must be a single ASCII character".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planned_spec_indexes_into_a_shared_profile() {
        let dataset = ingest::parse_delimited("dept,salary,bonus\neng,100,5\nsales,200,7\n", None)
            .unwrap();
        let profile = analysis::profile_dataset(&dataset);

        let spec = planned_spec(&profile, 0).unwrap();
        assert_eq!(spec.columns.as_slice(), ["dept"]);
        assert!(planned_spec(&profile, 99).is_err());
    }

    #[test]
    fn delimiter_override_accepts_one_ascii_byte() {
        assert_eq!(parse_delimiter_override(None).unwrap(), None);
        assert_eq!(parse_delimiter_override(Some(";")).unwrap(), Some(b';'));
        assert_eq!(parse_delimiter_override(Some("\t")).unwrap(), Some(b'\t'));
        assert!(parse_delimiter_override(Some(";;")).is_err());
        assert!(parse_delimiter_override(Some("")).is_err());
    }
}
