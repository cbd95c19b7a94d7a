//! REST API handlers for usage recording and status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use reshare_core::providers::QuotaSnapshotProvider;
use reshare_core::status::{build_dashboard, DashboardData};
use reshare_core::store::DailyShare;
use reshare_core::{
    AgentIdentity, AllocationService, Clock, Multipliers, QuotaSnapshot, QuotaStatus,
    Recommendation, Store, UsageIncrement,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditLogger};

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Helper to create JSON error responses
fn json_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(serde_json::json!({"error": message})))
}

fn core_error(err: reshare_core::Error) -> ApiError {
    match err {
        reshare_core::Error::InvalidInput(message) => {
            tracing::warn!("API: rejected request: {}", message);
            json_error(StatusCode::BAD_REQUEST, &message)
        }
        other => {
            tracing::error!("API: storage failure: {}", other);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string())
        }
    }
}

/// Allocation service over the shared store
pub type SharedService = AllocationService<Arc<Store>, Arc<dyn Clock>>;

/// Shared application state for API handlers
pub struct ApiState {
    pub service: SharedService,
    pub audit: Mutex<AuditLogger>,
}

impl ApiState {
    pub fn new(service: SharedService, audit: AuditLogger) -> Self {
        Self {
            service,
            audit: Mutex::new(audit),
        }
    }

    fn store(&self) -> &Store {
        self.service.inputs()
    }

    fn today(&self) -> NaiveDate {
        self.service.clock().now().date_naive()
    }

    fn log_audit(&self, event: AuditEvent) {
        self.audit.lock().log(&event);
    }
}

/// Run a store call off the async runtime
async fn blocking<T, F>(state: &Arc<ApiState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ApiState) -> reshare_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            tracing::error!("API: blocking task failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?
        .map_err(core_error)
}

/// Response to a recorded usage increment
#[derive(Debug, Serialize)]
pub struct IncrementResponse {
    pub status: &'static str,
    pub claude_name: String,
    /// Dollar cost, only when the client reported one
    pub cost_recorded: Option<f64>,
    pub tokens_recorded: u64,
    pub normalized_usage: f64,
    pub recommended_interval: u32,
    pub current_interval: u32,
    pub multipliers: Multipliers,
    pub quota_status: QuotaStatus,
    pub reasons: Vec<String>,
}

/// Record a usage increment and return the agent's next interval
pub async fn record_increment(
    State(state): State<Arc<ApiState>>,
    Json(increment): Json<UsageIncrement>,
) -> Result<Json<IncrementResponse>, ApiError> {
    tracing::debug!(
        "API: increment agent={} mode={}",
        increment.claude_name,
        increment.mode
    );
    let recorded = blocking(&state, move |s| s.service.record_usage(&increment)).await?;
    state.log_audit(AuditEvent::increment_recorded(&recorded));

    Ok(Json(IncrementResponse {
        status: "success",
        cost_recorded: recorded
            .reported_cost
            .then_some(recorded.metrics.cost_delta),
        tokens_recorded: recorded.metrics.cache_read_increment,
        normalized_usage: recorded.metrics.normalized_usage,
        recommended_interval: recorded.recommendation.interval_seconds,
        current_interval: recorded.current_interval,
        multipliers: recorded.recommendation.multipliers,
        quota_status: recorded.recommendation.quota_status,
        reasons: recorded.recommendation.reasons,
        claude_name: recorded.claude_name,
    }))
}

/// Query parameters for a recommendation
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub current_interval: Option<u32>,
}

/// A recommendation served without recording usage
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub claude_name: String,
    pub current_interval: Option<u32>,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

/// Recommend an interval without recording anything
pub async fn get_recommendation(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let current = query.current_interval;
    let agent = name.clone();
    let recommendation =
        blocking(&state, move |s| s.service.recommend_interval(&agent, current)).await?;
    state.log_audit(AuditEvent::interval_recommended(
        &name,
        current,
        &recommendation,
    ));

    Ok(Json(RecommendationResponse {
        claude_name: name,
        current_interval: current,
        recommendation,
    }))
}

/// Quota reading posted by a sampler
#[derive(Debug, Deserialize)]
pub struct QuotaReading {
    pub session_percent_used: u8,
    pub week_percent_used: u8,
    #[serde(default)]
    pub week_sonnet_percent_used: Option<u8>,
    #[serde(default)]
    pub session_reset: Option<String>,
    #[serde(default)]
    pub week_reset: Option<String>,
}

/// Latest quota reading with its derived status
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    #[serde(flatten)]
    pub snapshot: QuotaSnapshot,
    pub quota_status: QuotaStatus,
}

impl From<QuotaSnapshot> for QuotaResponse {
    fn from(snapshot: QuotaSnapshot) -> Self {
        Self {
            quota_status: QuotaStatus::from_week_percent(snapshot.week_percent_used),
            snapshot,
        }
    }
}

/// Store a quota reading observed now
pub async fn record_quota(
    State(state): State<Arc<ApiState>>,
    Json(reading): Json<QuotaReading>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let snapshot = QuotaSnapshot {
        session_percent_used: reading.session_percent_used,
        week_percent_used: reading.week_percent_used,
        week_sonnet_percent_used: reading.week_sonnet_percent_used,
        session_reset: reading.session_reset,
        week_reset: reading.week_reset,
        observed_at: state.service.clock().now(),
    }
    .normalized();

    let stored = snapshot.clone();
    blocking(&state, move |s| s.store().insert_quota_snapshot(&stored)).await?;
    tracing::info!(
        "Recorded quota: session {}%, week {}%",
        snapshot.session_percent_used,
        snapshot.week_percent_used
    );
    state.log_audit(AuditEvent::quota_recorded(&snapshot));

    Ok(Json(snapshot.into()))
}

/// Most recent quota reading
pub async fn get_latest_quota(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<QuotaResponse>, ApiError> {
    match blocking(&state, |s| s.store().latest_quota_snapshot()).await? {
        Some(snapshot) => Ok(Json(snapshot.into())),
        None => Err(json_error(StatusCode::NOT_FOUND, "No quota data available")),
    }
}

/// One agent's token totals for today
#[derive(Debug, Serialize)]
pub struct TodayShareResponse {
    pub claude_name: String,
    pub date: NaiveDate,
    pub autonomous_tokens: u64,
    pub collaborative_tokens: u64,
    pub total_tokens: u64,
}

impl From<DailyShare> for TodayShareResponse {
    fn from(share: DailyShare) -> Self {
        Self {
            claude_name: share.claude_name,
            date: share.date,
            autonomous_tokens: share.autonomous_tokens,
            collaborative_tokens: share.collaborative_tokens,
            total_tokens: share.total_tokens,
        }
    }
}

/// Today's totals for one agent; zeros when it has not reported yet
pub async fn get_today_share(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Result<Json<TodayShareResponse>, ApiError> {
    let today = state.today();
    let agent = name.clone();
    let share = blocking(&state, move |s| s.store().daily_share(&agent, today)).await?;

    Ok(Json(share.map(Into::into).unwrap_or(TodayShareResponse {
        claude_name: name,
        date: today,
        autonomous_tokens: 0,
        collaborative_tokens: 0,
        total_tokens: 0,
    })))
}

/// Today's totals for every agent
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub date: NaiveDate,
    pub claudes: Vec<TodayShareResponse>,
}

/// Today's totals for every agent, busiest first
pub async fn get_summary(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let today = state.today();
    let shares = blocking(&state, move |s| s.store().daily_summary(today)).await?;

    Ok(Json(SummaryResponse {
        date: today,
        claudes: shares.into_iter().map(Into::into).collect(),
    }))
}

/// The status view
pub async fn get_status(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<DashboardData>, ApiError> {
    let dashboard = blocking(&state, |s| {
        let now = s.service.clock().now();
        let snapshot = s.store().latest_quota_snapshot()?;
        let activity = s.store().agent_activity(now.date_naive())?;
        Ok(build_dashboard(snapshot.as_ref(), &activity, now))
    })
    .await?;
    Ok(Json(dashboard))
}

/// Every registered agent
pub async fn get_identities(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<AgentIdentity>>, ApiError> {
    Ok(Json(
        blocking(&state, |s| s.store().list_identities()).await?,
    ))
}

/// Liveness plus registered agent count
pub async fn health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let count = blocking(&state, |s| s.store().count_identities()).await?;
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "claudes_registered": count,
    })))
}
