use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};

use crate::{
    error::ApiResult,
    middleware::auth::require_role,
    models::{
        auth::AuthenticatedUser,
        dashboard::GuardianDashboard,
        kegiatan::{KegiatanQuery, KegiatanView},
        keuangan::{KeuanganView, Pembayaran},
        pengaduan::{CreatePengaduanRequest, Pengaduan},
        santri::GuardianLink,
        user::{ChangePasswordRequest, ProfileView, Role, UpdateProfileRequest, UserProfile},
    },
    services::{
        dashboard::DashboardService, kegiatan::KegiatanService, keuangan::KeuanganService,
        linkage::LinkageService, pengaduan::PengaduanService, profile::ProfileService,
    },
    AppState,
};

/// Guardian role check followed by link resolution; no link is a 404.
async fn guardian_link(state: &AppState, user: &AuthenticatedUser) -> ApiResult<GuardianLink> {
    require_role(user, &[Role::Orangtua])?;
    LinkageService::require(&state.db, user.user_id).await
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<GuardianDashboard>> {
    let link = guardian_link(&state, &user).await?;
    let today = Local::now().date_naive();
    let dashboard = DashboardService::guardian(&state.db, &link, today).await?;
    Ok(Json(dashboard))
}

pub async fn keuangan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<KeuanganView>> {
    let link = guardian_link(&state, &user).await?;
    let view = KeuanganService::view(&state.db, &link).await?;
    Ok(Json(view))
}

pub async fn bayar(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Pembayaran>)> {
    let link = guardian_link(&state, &user).await?;
    let pembayaran = KeuanganService::submit_payment(
        &state.db,
        link.santri_id,
        user.user_id,
        &state.config.upload_dir,
        state.config.upload_max_bytes,
        multipart,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(pembayaran)))
}

pub async fn kegiatan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<KegiatanQuery>,
) -> ApiResult<Json<Vec<KegiatanView>>> {
    let link = guardian_link(&state, &user).await?;
    let today = Local::now().date_naive();
    let items = KegiatanService::list_for_student(&state.db, link.santri_id, &query, today).await?;
    Ok(Json(items))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ProfileView>> {
    require_role(&user, &[Role::Orangtua])?;
    let profile = ProfileService::get(&state.db, user.user_id, user.role).await?;
    let santri = match LinkageService::resolve(&state.db, user.user_id).await? {
        Some(link) => Some(LinkageService::summary(&state.db, &link).await?),
        None => None,
    };
    Ok(Json(ProfileView { user: profile, santri }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    require_role(&user, &[Role::Orangtua])?;
    let profile = ProfileService::update(&state.db, user.user_id, user.role, &body).await?;
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&user, &[Role::Orangtua])?;
    ProfileService::change_password(&state.db, user.user_id, &body).await?;
    Ok(Json(json!({ "message": "Password berhasil diubah" })))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    require_role(&user, &[Role::Orangtua])?;
    let url = ProfileService::upload_photo(
        &state.db,
        user.user_id,
        &state.config.upload_dir,
        state.config.upload_max_bytes,
        multipart,
    )
    .await?;
    Ok(Json(json!({ "message": "Foto profil berhasil diperbarui", "foto_profil": url })))
}

pub async fn list_pengaduan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<Pengaduan>>> {
    let link = guardian_link(&state, &user).await?;
    let rows = PengaduanService::list_for_santri(&state.db, link.santri_id, None).await?;
    Ok(Json(rows))
}

pub async fn create_pengaduan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePengaduanRequest>,
) -> ApiResult<(StatusCode, Json<Pengaduan>)> {
    let link = guardian_link(&state, &user).await?;
    let created = PengaduanService::create(&state.db, link.santri_id, user.user_id, &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
