use crate::error::ApiError;
use crate::models::{
    LoginRequest, LoginResponse, StatsRequest, StatsResponse, UploadPhotoRequest, UploadResponse,
    UploadVideoRequest,
};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use insta_client::{configure_proxy_from_json, PlatformClient};
use instagate_core::{aggregate_engagement, CoreError, SessionSettings, STATS_POST_LIMIT};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("Login requested for {}", request.username);

    let mut client = state.factory.create()?;
    configure_proxy_from_json(client.as_mut(), request.proxy_config.as_ref());

    client
        .login(
            &request.username,
            &request.password,
            request.verification_code.as_deref(),
        )
        .await?;

    info!("Login succeeded for {}", request.username);
    Ok(Json(LoginResponse {
        success: true,
        settings: client.get_settings(),
    }))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Json(request): Json<UploadPhotoRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let client = restore_session(
        &state,
        request.settings_json,
        request.proxy_config.as_ref(),
    )
    .await?;
    let path = local_media(&state, &request.photo_path).await?;

    let media = client
        .photo_upload(&path, request.caption.as_deref().unwrap_or(""))
        .await?;

    info!("Uploaded photo {} as media {}", path.display(), media.pk);
    Ok(Json(UploadResponse {
        success: true,
        media_pk: media.pk,
        media_id: media.id,
    }))
}

pub async fn upload_video(
    State(state): State<AppState>,
    Json(request): Json<UploadVideoRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let client = restore_session(
        &state,
        request.settings_json,
        request.proxy_config.as_ref(),
    )
    .await?;
    let path = local_media(&state, &request.video_path).await?;

    let media = client
        .video_upload(&path, request.caption.as_deref().unwrap_or(""))
        .await?;

    info!("Uploaded video {} as media {}", path.display(), media.pk);
    Ok(Json(UploadResponse {
        success: true,
        media_pk: media.pk,
        media_id: media.id,
    }))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Json(request): Json<StatsRequest>,
) -> Result<Json<StatsResponse>, ApiError> {
    let client = restore_session(
        &state,
        request.settings_json,
        request.proxy_config.as_ref(),
    )
    .await?;

    let user = client.user_info_by_username(&request.username).await?;
    let posts = client.user_medias(&user.pk, STATS_POST_LIMIT).await?;
    let stats = aggregate_engagement(&posts, Utc::now());

    debug!(
        "Stats for {}: {} posts in 30d, {} in 7d",
        user.username, stats.posts_30d, stats.posts_7d
    );
    Ok(Json(StatsResponse::new(user, stats)))
}

/// Fresh client with the caller's proxy and session applied, after a warm-up
/// call has confirmed the session is still accepted.
async fn restore_session(
    state: &AppState,
    settings: SessionSettings,
    proxy_config: Option<&Value>,
) -> Result<Box<dyn PlatformClient>, CoreError> {
    let mut client = state.factory.create()?;
    configure_proxy_from_json(client.as_mut(), proxy_config);
    client.set_settings(settings);
    client.get_timeline_feed().await?;
    Ok(client)
}

async fn local_media(state: &AppState, requested: &str) -> Result<PathBuf, CoreError> {
    let path = state.resolver.resolve(requested).await?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(CoreError::NotFound {
            resource: path.display().to_string(),
        });
    }

    Ok(path)
}
