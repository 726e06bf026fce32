use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use musea::services::discovery::{HiddenGem, ThemeProfileView};
use musea::utils::validation;
use musea::{init_tracing, AppState, Config};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ContextQuery {
    connection_quality: Option<String>,
    time_available: Option<u32>,
    device: Option<String>,
}

impl ContextQuery {
    fn into_signals(self) -> musea::ContextSignals {
        musea::ContextSignals {
            connection_quality: self
                .connection_quality
                .as_deref()
                .and_then(musea::ConnectionQuality::parse),
            time_available_minutes: self.time_available,
            device: self.device.as_deref().and_then(musea::DeviceKind::parse),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OnboardingRequest {
    pseudo: String,
    #[serde(default)]
    ui_language: String,
    #[serde(default)]
    visitor_type: String,
    distance_pref: Option<String>,
    interest_mode: Option<String>,
    #[serde(default)]
    preferred_themes: Vec<String>,
    hub_city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InteractionRequest {
    user_id: String,
    museum_id: i64,
    kind: musea::InteractionKind,
    duration_secs: Option<f64>,
    /// Client-side timestamp, sanity-checked only; the log keeps server time.
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    user_id: String,
    museum_id: i64,
    direction: String,
}

#[derive(Debug, Serialize)]
struct FeedbackResponse {
    outcome: musea::RecordOutcome,
    stats: musea::MuseumStats,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    profile: Option<musea::User>,
    dynamic: ThemeProfileView,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "musea-discovery".to_string());
    status.insert("version".to_string(), "0.1.0".to_string());

    Json(ApiResponse::success(status))
}

async fn create_visitor(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<musea::User>>, StatusCode> {
    let mut guest = musea::User::guest();
    guest.visitor_type = "Guest".to_string();

    match state.store.save_user(&guest).await {
        Ok(()) => Ok(Json(ApiResponse::success(guest))),
        Err(e) => {
            tracing::error!("Failed to create guest visitor: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn submit_onboarding(
    State(state): State<AppState>,
    Json(request): Json<OnboardingRequest>,
) -> Result<Json<ApiResponse<musea::User>>, StatusCode> {
    let pseudo = validation::sanitize_string(request.pseudo.trim(), 100);
    let mut user = musea::User::new(pseudo.clone(), pseudo);
    user.ui_language = request.ui_language;
    user.visitor_type = request.visitor_type;
    user.distance_pref = request
        .distance_pref
        .as_deref()
        .and_then(musea::DistancePref::parse);
    user.interest_mode = request
        .interest_mode
        .as_deref()
        .and_then(musea::InterestMode::parse);
    user.preferred_themes = request.preferred_themes;
    user.hub_city = request.hub_city;

    if let Err(e) = validation::validate_onboarding(&user) {
        return Ok(Json(ApiResponse::error(e.to_string())));
    }

    match state.store.save_user(&user).await {
        Ok(()) => Ok(Json(ApiResponse::success(user))),
        Err(e) => {
            tracing::error!("Failed to save profile: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<ProfileResponse>>, StatusCode> {
    let profile = match state.store.get_user(&user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Failed to load profile {}: {}", user_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match state.discovery_service.theme_profile(&user_id).await {
        Ok(dynamic) => Ok(Json(ApiResponse::success(ProfileResponse {
            profile,
            dynamic,
        }))),
        Err(e) => {
            tracing::error!("Failed to compute theme profile: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_discovery(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ContextQuery>,
) -> Json<ApiResponse<musea::DiscoveryFeed>> {
    let signals = params.into_signals();
    let feed = state.discovery_service.discovery_feed(&user_id, &signals).await;
    Json(ApiResponse::success(feed))
}

async fn get_adaptation(
    State(state): State<AppState>,
    Query(params): Query<ContextQuery>,
) -> Json<ApiResponse<musea::AdaptationSettings>> {
    let signals = params.into_signals();
    let settings = state.discovery_service.compute_adaptation(&signals);
    Json(ApiResponse::success(settings))
}

async fn record_interaction(
    State(state): State<AppState>,
    Json(request): Json<InteractionRequest>,
) -> Result<Json<ApiResponse<musea::RecordOutcome>>, StatusCode> {
    if let Err(e) =
        validation::validate_interaction(&request.user_id, request.museum_id, request.duration_secs)
    {
        return Ok(Json(ApiResponse::error(e.to_string())));
    }

    if let Some(timestamp) = request.timestamp {
        if let Err(e) = validation::validate_timestamp(timestamp) {
            return Ok(Json(ApiResponse::error(e.to_string())));
        }
    }

    // Best-effort contract: the caller gets 200 with an outcome even when
    // storage is down.
    let outcome = state
        .discovery_service
        .record_interaction(
            &request.user_id,
            request.museum_id,
            request.kind,
            request.duration_secs,
        )
        .await;

    Ok(Json(ApiResponse::success(outcome)))
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<FeedbackResponse>>, StatusCode> {
    let kind = match request.direction.trim().to_ascii_lowercase().as_str() {
        "up" | "thumbs_up" => musea::InteractionKind::ThumbsUp,
        "down" | "thumbs_down" => musea::InteractionKind::ThumbsDown,
        _ => {
            return Ok(Json(ApiResponse::error(
                "direction must be 'up' or 'down'".to_string(),
            )))
        }
    };

    if let Err(e) = validation::validate_interaction(&request.user_id, request.museum_id, None) {
        return Ok(Json(ApiResponse::error(e.to_string())));
    }

    let outcome = state
        .discovery_service
        .record_interaction(&request.user_id, request.museum_id, kind, None)
        .await;

    match state.discovery_service.museum_stats(request.museum_id).await {
        Ok(stats) => Ok(Json(ApiResponse::success(FeedbackResponse { outcome, stats }))),
        Err(e) => {
            tracing::error!("Failed to load museum stats: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn list_themes(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, StatusCode> {
    match state.store.distinct_themes().await {
        Ok(themes) => Ok(Json(ApiResponse::success(themes))),
        Err(e) => {
            tracing::error!("Failed to list themes: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn list_museums(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<musea::Museum>>>, StatusCode> {
    match state.store.get_catalog().await {
        Ok(museums) => Ok(Json(ApiResponse::success(museums))),
        Err(e) => {
            tracing::error!("Failed to load catalog: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_museum(
    State(state): State<AppState>,
    Path(museum_id): Path<i64>,
) -> Result<Json<ApiResponse<musea::Museum>>, StatusCode> {
    match state.store.get_museum(museum_id).await {
        Ok(Some(museum)) => Ok(Json(ApiResponse::success(museum))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load museum {}: {}", museum_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_similar_museums(
    State(state): State<AppState>,
    Path(museum_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<musea::Museum>>>, StatusCode> {
    match state.discovery_service.similar_museums(museum_id).await {
        Ok(museums) => Ok(Json(ApiResponse::success(museums))),
        Err(e) => {
            tracing::error!("Failed to find similar museums: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_hidden_gems(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<HiddenGem>>>, StatusCode> {
    match state
        .discovery_service
        .hidden_gems(Some(&user_id), 30)
        .await
    {
        Ok(gems) => Ok(Json(ApiResponse::success(gems))),
        Err(e) => {
            tracing::error!("Failed to find hidden gems: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/visitors", post(create_visitor))
        .route("/users", post(submit_onboarding))
        .route("/users/:user_id", get(get_user_profile))
        .route("/discovery/:user_id", get(get_discovery))
        .route("/adaptation", get(get_adaptation))
        .route("/interactions", post(record_interaction))
        .route("/feedback", post(submit_feedback))
        .route("/themes", get(list_themes))
        .route("/museums", get(list_museums))
        .route("/museums/:museum_id", get(get_museum))
        .route("/museums/:museum_id/similar", get(get_similar_museums))
        .route("/hidden_gems/:user_id", get(get_hidden_gems))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().await;

    let config = Config::default();
    info!("Starting Musea Discovery Server with config: {:?}", config.server);

    let state = AppState::new(config.clone()).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!("Server listening on {}", config.server.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
