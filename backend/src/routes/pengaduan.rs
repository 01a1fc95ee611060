use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    middleware::auth::require_role,
    models::{
        auth::AuthenticatedUser,
        pengaduan::{CreateTanggapanRequest, Pengaduan, PengaduanDetail, PengaduanQuery, Tanggapan},
        user::Role,
    },
    services::{
        linkage::LinkageService,
        pengaduan::{normalize_status, PengaduanService},
    },
    AppState,
};

const ALLOWED: [Role; 3] = [Role::Pengurus, Role::TimKesehatan, Role::Orangtua];

/// Guardians only see their linked student's complaints. Staff see all.
async fn santri_scope(state: &AppState, user: &AuthenticatedUser) -> ApiResult<Option<Uuid>> {
    require_role(user, &ALLOWED)?;
    if user.role == Role::Orangtua {
        let link = LinkageService::require(&state.db, user.user_id).await?;
        Ok(Some(link.santri_id))
    } else {
        Ok(None)
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PengaduanQuery>,
) -> ApiResult<Json<Vec<Pengaduan>>> {
    let rows = match santri_scope(&state, &user).await? {
        Some(santri_id) => {
            let status = normalize_status(query.status.as_deref())?;
            PengaduanService::list_for_santri(&state.db, santri_id, None)
                .await?
                .into_iter()
                .filter(|p| status.map_or(true, |s| p.status == s))
                .collect()
        }
        None => PengaduanService::list_all(&state.db, query.status.as_deref()).await?,
    };
    Ok(Json(rows))
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PengaduanDetail>> {
    let scope = santri_scope(&state, &user).await?;
    let detail = PengaduanService::detail(&state.db, id, scope).await?;
    Ok(Json(detail))
}

pub async fn reply(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateTanggapanRequest>,
) -> ApiResult<(StatusCode, Json<Tanggapan>)> {
    let scope = santri_scope(&state, &user).await?;
    let tanggapan =
        PengaduanService::reply(&state.db, id, user.user_id, user.role, scope, &body).await?;
    Ok((StatusCode::CREATED, Json(tanggapan)))
}
