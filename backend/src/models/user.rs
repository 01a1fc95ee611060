use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{models::santri::StudentSummary, services::upload::public_url};

/// Roles as stored in `roles.nama`. Tokens carry the lowercase form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "pengurus")]
    Pengurus,
    #[serde(rename = "orangtua")]
    Orangtua,
    #[serde(rename = "santri")]
    Santri,
    #[serde(rename = "pengajar")]
    Pengajar,
    #[serde(rename = "tim kesehatan")]
    TimKesehatan,
}

impl Role {
    /// Name in the `roles` table.
    pub fn db_name(self) -> &'static str {
        match self {
            Role::Pengurus => "Pengurus",
            Role::Orangtua => "Orangtua",
            Role::Santri => "Santri",
            Role::Pengajar => "Pengajar",
            Role::TimKesehatan => "Tim Kesehatan",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.db_name().to_lowercase())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pengurus" => Ok(Role::Pengurus),
            "orangtua" => Ok(Role::Orangtua),
            "santri" => Ok(Role::Santri),
            "pengajar" => Ok(Role::Pengajar),
            "tim kesehatan" | "tim_kesehatan" => Ok(Role::TimKesehatan),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub nama: String,
    pub no_identitas: String,
    pub no_hp: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub jenis_kelamin: Option<String>,
    pub alamat: Option<String>,
    pub foto_profil: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Explicit column list for `User`. `jenis_kelamin` is CHAR(1), cast to TEXT.
pub const USER_COLS: &str =
    "id, nama, no_identitas, no_hp, email, password_hash, jenis_kelamin::TEXT AS jenis_kelamin,
     alamat, foto_profil, is_active, created_at, updated_at";

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// id-number, phone or email
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nama: Option<String>,
    pub no_identitas: Option<String>,
    pub no_hp: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub jenis_kelamin: Option<String>,
    pub alamat: Option<String>,
    pub role: Option<String>,
    /// Orangtua only: the student's id-number to link at registration.
    pub no_identitas_santri: Option<String>,
    pub hubungan: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub nama: String,
    pub no_identitas: String,
    pub no_hp: Option<String>,
    pub email: Option<String>,
    pub jenis_kelamin: Option<String>,
    pub alamat: Option<String>,
    pub foto_profil: Option<String>,
    pub role: Role,
}

impl UserProfile {
    pub fn new(u: User, role: Role) -> Self {
        Self {
            id: u.id,
            nama: u.nama,
            no_identitas: u.no_identitas,
            no_hp: u.no_hp,
            email: u.email,
            jenis_kelamin: u.jenis_kelamin,
            alamat: u.alamat,
            foto_profil: u.foto_profil.as_deref().map(public_url),
            role,
        }
    }
}

/// Own profile plus the linked student, when there is one.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: UserProfile,
    pub santri: Option<StudentSummary>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub nama: Option<String>,
    pub no_hp: Option<String>,
    pub email: Option<String>,
    pub alamat: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password_lama: Option<String>,
    pub password_baru: Option<String>,
    pub konfirmasi_password: Option<String>,
}
