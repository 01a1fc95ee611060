use axum::{extract::State, Json};
use chrono::Local;

use crate::{
    error::ApiResult,
    middleware::auth::require_role,
    models::{auth::AuthenticatedUser, dashboard::AdminStats, user::Role},
    services::statistik::StatistikService,
    AppState,
};

pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<AdminStats>> {
    require_role(&user, &[Role::Pengurus])?;
    let stats = StatistikService::admin(&state.db, Local::now().date_naive()).await?;
    Ok(Json(stats))
}
