//! HTTP route handlers.

use std::path::Path as FsPath;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::catalog::{ApiCatalog, DocsCatalog};
use crate::domain::{Area, DirectionFilter, Stop};
use crate::eta::{EtaQuery, prepare_rows, render_eta_csv, render_route_map_csv};
use crate::kmb::KmbSource;
use crate::weather::{RadarReport, WeatherError, WeatherSummary};

use super::dto::*;
use super::error::AppError;
use super::state::AppState;

/// Radar range used when none is requested (64 km).
const DEFAULT_RADAR_RANGE: &str = "2";

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router<S: KmbSource + 'static>(
    state: AppState<S>,
    static_dir: impl AsRef<FsPath>,
) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/apis", get(apis::<S>))
        .route("/docs", get(docs::<S>))
        .route("/kmb/stops/:area", get(kmb_stops::<S>))
        .route("/kmb/bus-etas/:area/:direction", get(bus_etas::<S>))
        .route("/kmb/stop-route-map/:area", get(stop_route_map::<S>))
        .route("/weather/hk", get(weather_summary::<S>))
        .route("/weather/hk/radar", get(weather_radar::<S>))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "HK gateway: KMB bus arrivals and HKO weather. See /apis for endpoints."
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Available endpoints, with the caller's host filled in.
async fn apis<S: KmbSource>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Json<ApiCatalog> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    Json(state.catalog.apis().await.with_host(host))
}

async fn docs<S: KmbSource>(State(state): State<AppState<S>>) -> Json<DocsCatalog> {
    Json(state.catalog.docs().await)
}

/// Cached stops of an area.
async fn kmb_stops<S: KmbSource>(
    State(state): State<AppState<S>>,
    Path(area): Path<String>,
) -> Result<Json<Vec<Stop>>, AppError> {
    let area: Area = area.parse()?;
    let stops: Vec<Stop> = state.eta.area_stops(area).await.into_values().collect();

    if stops.is_empty() {
        return Err(AppError::not_found(format!(
            "No KMB stops found for {area} area. Data might not be synced yet."
        )));
    }
    Ok(Json(stops))
}

/// Live arrivals for an area as CSV (or JSON).
async fn bus_etas<S: KmbSource>(
    State(state): State<AppState<S>>,
    Path((area, direction)): Path<(String, String)>,
    Query(query): Query<BusEtaQuery>,
) -> Result<Response, AppError> {
    let area: Area = area.parse()?;
    let direction: DirectionFilter = direction.parse()?;
    let eta_query = EtaQuery::new(direction, query.destination_stop.as_deref());

    let records = state.eta.bus_etas(area, &eta_query).await;
    let rows = prepare_rows(records, query.show_all.unwrap_or(true));
    if rows.is_empty() {
        return Err(AppError::not_found("No ETA data available based on your criteria."));
    }

    match query.format {
        EtaFormat::Csv => Ok(csv_response(render_eta_csv(&rows)?)),
        EtaFormat::Json => Ok(Json(rows).into_response()),
    }
}

/// Stops reachable from an area and the routes serving them, as CSV.
async fn stop_route_map<S: KmbSource>(
    State(state): State<AppState<S>>,
    Path(area): Path<String>,
    Query(query): Query<RouteMapQuery>,
) -> Result<Response, AppError> {
    let area: Area = area.parse()?;
    let direction: DirectionFilter = query.direction.as_deref().unwrap_or("both").parse()?;

    let entries = state.eta.stop_route_map(area, direction).await;
    if entries.is_empty() {
        return Err(AppError::not_found(format!(
            "No stop route map data available for {area} area."
        )));
    }
    Ok(csv_response(render_route_map_csv(&entries)?))
}

async fn weather_summary<S: KmbSource>(
    State(state): State<AppState<S>>,
) -> Result<Json<WeatherSummary>, AppError> {
    let summary = state.weather.summary().await.map_err(|e| {
        error!(error = %e, "Error fetching HK weather data");
        AppError::internal("Failed to fetch HK weather data", e)
    })?;
    Ok(Json(summary.as_ref().clone()))
}

/// Describe the newest radar image.
async fn weather_radar<S: KmbSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<RadarQuery>,
) -> Result<Json<RadarReport>, AppError> {
    let range = query
        .range
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_RADAR_RANGE.to_string());

    state
        .weather
        .analyze_radar(&range)
        .await
        .map(Json)
        .map_err(radar_error)
}

fn radar_error(e: WeatherError) -> AppError {
    match e {
        WeatherError::UnknownRange { ref available, .. } => {
            let listed = if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            };
            AppError::NotFound {
                message: e.to_string(),
                details: Some(format!(
                    "Please provide a 'range' query parameter. Available ranges are: {listed}."
                )),
            }
        }
        WeatherError::NoImages { .. } => AppError::not_found(e.to_string()),
        WeatherError::RadarIndex(_) => AppError::internal("Failed to parse radar data from HKO", e),
        _ => AppError::internal("Failed to process radar image", e),
    }
}

fn csv_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response()
}
