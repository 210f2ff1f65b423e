//! Request handlers and wire payloads
//!
//! Handlers stay thin: decode the request, call into `AppState`, and shape
//! the result the way clients of the service expect it.

use crate::api::error::ApiError;
use crate::error::RatingError;
use crate::service::app::{AppState, RebuildRequest, RecalculateSource};
use crate::types::{
    Alliance, BatchPrediction, MatchupRequest, SessionContext, SubmittedResult, TeamStanding,
};
use crate::utils::round_to;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Successful response body: a status line plus the operation's fields
#[derive(Debug, Serialize)]
pub struct Status<T> {
    pub status: &'static str,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Status<T> {
    fn new(status: &'static str, body: T) -> Json<Self> {
        Json(Self { status, body })
    }
}

/// Query string of `/predict_team`
#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team: Option<String>,
}

/// One team as returned by `/predict_team`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamView {
    pub team: String,
    pub mu: f64,
    pub sigma: f64,
    pub conservative_mu_3sigma: f64,
    pub confidence_percent: f64,
}

impl From<TeamStanding> for TeamView {
    fn from(standing: TeamStanding) -> Self {
        Self {
            team: standing.team_key,
            mu: standing.mu,
            sigma: standing.sigma,
            conservative_mu_3sigma: standing.conservative_mu_3sigma,
            confidence_percent: standing.confidence_percent,
        }
    }
}

/// Two alliances in the client's `teams1`/`teams2` shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlliancePair {
    #[serde(default)]
    pub teams1: Alliance,
    #[serde(default)]
    pub teams2: Alliance,
}

impl From<AlliancePair> for MatchupRequest {
    fn from(pair: AlliancePair) -> Self {
        MatchupRequest {
            alliance_a: pair.teams1,
            alliance_b: pair.teams2,
        }
    }
}

/// Answer to `/predict_match`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub team1_win_prob: f64,
    pub team2_win_prob: f64,
    pub prediction_confidence_percent: f64,
}

/// One entry of a `/predict_batch` answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOdds {
    pub teams1: Alliance,
    pub teams2: Alliance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team1_win_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team2_win_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchPrediction> for BatchOdds {
    fn from(entry: BatchPrediction) -> Self {
        Self {
            teams1: entry.alliance_a,
            teams2: entry.alliance_b,
            team1_win_prob: entry.prediction.map(|p| p.win_probability_a),
            team2_win_prob: entry.prediction.map(|p| p.win_probability_b),
            error: entry.error,
        }
    }
}

/// Body of `/load_data`
#[derive(Debug, Clone, Deserialize)]
pub struct LoadRequest {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_use_env")]
    pub use_env_from_json: bool,
}

fn default_use_env() -> bool {
    true
}

impl Default for LoadRequest {
    fn default() -> Self {
        Self {
            path: None,
            use_env_from_json: default_use_env(),
        }
    }
}

/// Answer to `/load_data`
#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub file: PathBuf,
    pub use_env_from_json: bool,
    pub teams_indexed: usize,
    pub skipped: usize,
    pub env_applied: bool,
    pub context: SessionContext,
}

/// Body of `/recalculate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecalculateRequest {
    #[serde(default)]
    pub source: RecalculateSource,
}

/// Answer to `/leaderboard`
#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub teams: Vec<TeamStanding>,
    pub teams_indexed: usize,
}

/// Decode an optional JSON body; an empty body means defaults
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| RatingError::validation(format!("Malformed JSON body: {}", e)).into())
}

/// Service information
pub async fn root_handler(State(app): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": app.config().service.name,
        "version": crate::VERSION,
        "endpoints": [
            "/health",
            "/update",
            "/push_results",
            "/predict_team",
            "/predict_match",
            "/predict_batch",
            "/leaderboard",
            "/upload_data",
            "/load_data",
            "/recalculate",
            "/metrics"
        ]
    }))
}

/// Liveness and store size
pub async fn health_handler(State(app): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let health = app.health();
    let status = if health.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// Rebuild all beliefs from an event or a season
pub async fn update_handler(
    State(app): State<Arc<AppState>>,
    Json(request): Json<RebuildRequest>,
) -> ApiResult<impl IntoResponse> {
    let source = request.into_source()?;
    let outcome = app.rebuild(source).await?;
    info!(
        "Rankings updated: {} teams from {} matches",
        outcome.teams_indexed, outcome.applied
    );
    Ok(Status::new("rankings updated", outcome))
}

/// Fold client-submitted results into the current beliefs
pub async fn push_results_handler(
    State(app): State<Arc<AppState>>,
    Json(results): Json<Vec<SubmittedResult>>,
) -> ApiResult<impl IntoResponse> {
    let summary = app.push_results(results)?;
    Ok(Status::new("results incorporated", summary))
}

/// Current belief of one known team
pub async fn predict_team_handler(
    State(app): State<Arc<AppState>>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Json<TeamView>> {
    let team = query
        .team
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| RatingError::validation("Missing team parameter"))?;
    Ok(Json(app.team(&team)?.into()))
}

/// Win probabilities for one matchup
pub async fn predict_match_handler(
    State(app): State<Arc<AppState>>,
    Json(pair): Json<AlliancePair>,
) -> ApiResult<Json<MatchOdds>> {
    if pair.teams1.is_empty() || pair.teams2.is_empty() {
        return Err(RatingError::validation("teams1 and teams2 must be provided").into());
    }
    let prediction = app.predict_match(&pair.teams1, &pair.teams2)?;
    Ok(Json(MatchOdds {
        team1_win_prob: prediction.win_probability_a,
        team2_win_prob: prediction.win_probability_b,
        prediction_confidence_percent: round_to(prediction.prediction_confidence_percent, 2),
    }))
}

/// Win probabilities for several matchups, in request order
pub async fn predict_batch_handler(
    State(app): State<Arc<AppState>>,
    Json(pairs): Json<Vec<AlliancePair>>,
) -> ApiResult<Json<Vec<BatchOdds>>> {
    let requests: Vec<MatchupRequest> = pairs.into_iter().map(MatchupRequest::from).collect();
    let answered = app.predict_batch(&requests)?;
    Ok(Json(answered.into_iter().map(BatchOdds::from).collect()))
}

/// Every team ordered by conservative estimate
pub async fn leaderboard_handler(
    State(app): State<Arc<AppState>>,
) -> ApiResult<Json<Leaderboard>> {
    let teams = app.leaderboard()?;
    Ok(Json(Leaderboard {
        teams_indexed: teams.len(),
        teams,
    }))
}

/// Write the current state to the snapshot file
pub async fn upload_data_handler(
    State(app): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let outcome = app.save().await?;
    Ok(Status::new("saved", outcome))
}

/// Import a snapshot file
pub async fn load_data_handler(
    State(app): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request: LoadRequest = optional_body(&body)?;
    let outcome = app.load(request.path, request.use_env_from_json).await?;
    Ok(Status::new(
        "loaded",
        LoadResponse {
            file: outcome.file,
            use_env_from_json: outcome.use_env_from_snapshot,
            teams_indexed: outcome.teams_indexed,
            skipped: outcome.skipped,
            env_applied: outcome.env_applied,
            context: outcome.context,
        },
    ))
}

/// Refresh derived fields and re-save
pub async fn recalculate_handler(
    State(app): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request: RecalculateRequest = optional_body(&body)?;
    let outcome = app.recalculate(request.source).await?;
    Ok(Status::new("recalculated", outcome))
}

/// Prometheus text exposition
pub async fn metrics_handler(State(app): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Metrics endpoint requested");

    let metrics = app.metrics();
    match metrics.encode_text() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            text,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                "Failed to encode metrics".to_string(),
            )
        }
    }
}
