use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pengaduan {
    pub id: Uuid,
    pub santri_id: Uuid,
    pub nama_santri: String,
    pub pelapor_id: Uuid,
    pub nama_pelapor: String,
    pub judul: String,
    pub isi: String,
    pub status: String, // "Pending", "Diproses", "Selesai"
    pub jumlah_tanggapan: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tanggapan {
    pub id: Uuid,
    pub pengaduan_id: Uuid,
    pub user_id: Uuid,
    pub nama: String,
    pub isi: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PengaduanDetail {
    #[serde(flatten)]
    pub pengaduan: Pengaduan,
    pub tanggapan: Vec<Tanggapan>,
}

#[derive(Debug, Deserialize)]
pub struct PengaduanQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePengaduanRequest {
    pub judul: Option<String>,
    pub isi: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTanggapanRequest {
    pub isi: Option<String>,
}
