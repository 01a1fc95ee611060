use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Time-relative label of an activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KegiatanFilter {
    Mendatang,
    Selesai,
}

impl std::str::FromStr for KegiatanFilter {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mendatang" => Ok(KegiatanFilter::Mendatang),
            "Selesai" => Ok(KegiatanFilter::Selesai),
            _ => Err(anyhow::anyhow!("Unknown kegiatan type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Kegiatan {
    pub id: Uuid,
    pub nama_kegiatan: String,
    pub jenis: Option<String>,
    pub tanggal: NaiveDate,
    pub waktu_mulai: Option<NaiveTime>,
    pub waktu_selesai: Option<NaiveTime>,
    pub lokasi: Option<String>,
    pub deskripsi: Option<String>,
    /// Attendance status of the student, if recorded.
    pub status_kehadiran: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KegiatanView {
    #[serde(flatten)]
    pub kegiatan: Kegiatan,
    pub tanggal_format: String,
    pub status_kegiatan: KegiatanFilter,
}

#[derive(Debug, Deserialize)]
pub struct KegiatanQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
