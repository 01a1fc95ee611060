use axum::extract::Multipart;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::user::{ChangePasswordRequest, Role, UpdateProfileRequest, User, UserProfile, USER_COLS},
    services::upload::{self, StoredUpload, UploadKind, UploadedFile},
};

const MIN_PASSWORD_LEN: usize = 6;
const BCRYPT_COST: u32 = 12;

/// Profile changes after validation. Blank optional fields clear the column.
#[derive(Debug, PartialEq)]
pub struct ProfileChanges {
    pub nama: String,
    pub no_hp: Option<String>,
    pub email: Option<String>,
    pub alamat: Option<String>,
}

fn trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn validate_profile(req: &UpdateProfileRequest) -> ApiResult<ProfileChanges> {
    let nama = trimmed(&req.nama).ok_or_else(|| ApiError::bad_request("Nama wajib diisi"))?;
    Ok(ProfileChanges {
        nama,
        no_hp: trimmed(&req.no_hp),
        email: trimmed(&req.email).map(|e| e.to_lowercase()),
        alamat: trimmed(&req.alamat),
    })
}

/// Returns `(password_lama, password_baru)` once both are present and confirmed.
pub fn validate_password_change(req: &ChangePasswordRequest) -> ApiResult<(&str, &str)> {
    let (Some(lama), Some(baru), Some(konfirmasi)) = (
        req.password_lama.as_deref().filter(|s| !s.is_empty()),
        req.password_baru.as_deref().filter(|s| !s.is_empty()),
        req.konfirmasi_password.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Semua field password wajib diisi"));
    };
    if baru != konfirmasi {
        return Err(ApiError::bad_request("Konfirmasi password tidak cocok"));
    }
    if baru.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password minimal {MIN_PASSWORD_LEN} karakter"
        )));
    }
    Ok((lama, baru))
}

pub struct ProfileService;

impl ProfileService {
    async fn find_user(pool: &PgPool, user_id: Uuid) -> ApiResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Pengguna tidak ditemukan"))
    }

    pub async fn get(pool: &PgPool, user_id: Uuid, role: Role) -> ApiResult<UserProfile> {
        let user = Self::find_user(pool, user_id).await?;
        Ok(UserProfile::new(user, role))
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        role: Role,
        req: &UpdateProfileRequest,
    ) -> ApiResult<UserProfile> {
        let changes = validate_profile(req)?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM users
                WHERE id <> $1
                  AND (($2::TEXT IS NOT NULL AND no_hp = $2)
                    OR ($3::TEXT IS NOT NULL AND LOWER(email) = $3))
             )",
        )
        .bind(user_id)
        .bind(&changes.no_hp)
        .bind(&changes.email)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(ApiError::bad_request("Nomor HP atau email sudah digunakan akun lain"));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET nama = $2, no_hp = $3, email = $4, alamat = $5
             WHERE id = $1 AND is_active = TRUE
             RETURNING {USER_COLS}"
        ))
        .bind(user_id)
        .bind(&changes.nama)
        .bind(&changes.no_hp)
        .bind(&changes.email)
        .bind(&changes.alamat)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Pengguna tidak ditemukan"))?;

        tracing::info!("profile updated: user_id={user_id}");
        Ok(UserProfile::new(user, role))
    }

    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        req: &ChangePasswordRequest,
    ) -> ApiResult<()> {
        let (lama, baru) = validate_password_change(req)?;
        let user = Self::find_user(pool, user_id).await?;

        if !bcrypt::verify(lama, &user.password_hash).unwrap_or(false) {
            return Err(ApiError::Unauthorized("Password lama salah".into()));
        }

        let hash = bcrypt::hash(baru, BCRYPT_COST).map_err(anyhow::Error::from)?;
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&hash)
            .bind(user_id)
            .execute(pool)
            .await?;

        tracing::info!("password changed: user_id={user_id}");
        Ok(())
    }

    /// Replaces the profile photo and returns its public URL.
    pub async fn upload_photo(
        pool: &PgPool,
        user_id: Uuid,
        upload_dir: &str,
        max_bytes: usize,
        mut multipart: Multipart,
    ) -> ApiResult<String> {
        let mut stored: Option<StoredUpload> = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Form tidak valid: {e}")))?
        {
            if field.name() != Some("foto") {
                continue;
            }
            let file = UploadedFile::from_field(field)
                .await
                .map_err(|e| ApiError::bad_request(format!("Gagal membaca file: {e}")))?;
            let ext = upload::validate(UploadKind::FotoProfil, &file, max_bytes)?;
            stored = Some(StoredUpload::write(upload_dir, UploadKind::FotoProfil, user_id, ext, &file.bytes).await?);
        }
        let stored = stored.ok_or_else(|| ApiError::bad_request("File foto wajib diunggah"))?;

        // Dropping `stored` on any error below removes the new file.
        let previous: Option<String> = sqlx::query_scalar(
            "SELECT foto_profil FROM users WHERE id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Pengguna tidak ditemukan"))?;

        sqlx::query("UPDATE users SET foto_profil = $1 WHERE id = $2")
            .bind(stored.relative_path())
            .bind(user_id)
            .execute(pool)
            .await?;

        let relative = stored.keep();
        if let Some(old) = previous.filter(|p| *p != relative) {
            upload::remove_stored(upload_dir, &old).await;
        }

        tracing::info!("profile photo updated: user_id={user_id}");
        Ok(upload::public_url(&relative))
    }
}
