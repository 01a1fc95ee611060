use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiResult,
    models::user::{LoginRequest, LoginResponse, RegisterRequest, UserProfile},
    services::auth::AuthService,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let profile = AuthService::register(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    AuthService::login(
        &state.db,
        &body.identifier,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    .map(Json)
}
