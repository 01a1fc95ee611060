use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::santri::StudentSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TagihanStatus {
    Aktif,
    Lunas,
}

impl std::fmt::Display for TagihanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TagihanStatus::Aktif => "Aktif",
            TagihanStatus::Lunas => "Lunas",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PembayaranStatus {
    Pending,
    Berhasil,
    Ditolak,
}

impl std::fmt::Display for PembayaranStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PembayaranStatus::Pending => "Pending",
            PembayaranStatus::Berhasil => "Berhasil",
            PembayaranStatus::Ditolak => "Ditolak",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tagihan {
    pub id: Uuid,
    pub santri_id: Uuid,
    pub nama_tagihan: String,
    pub nominal: i64,
    pub jatuh_tempo: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pembayaran {
    pub id: Uuid,
    pub tagihan_id: Uuid,
    pub nominal: i64,
    pub tanggal_bayar: NaiveDate,
    pub bukti_bayar: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Bill as shown to a guardian: amounts plus their display strings.
#[derive(Debug, Clone, Serialize)]
pub struct TagihanView {
    pub id: Uuid,
    pub nama_tagihan: String,
    pub nominal: i64,
    pub nominal_format: String,
    pub jatuh_tempo: NaiveDate,
    pub jatuh_tempo_format: String,
    pub status: String,
    pub pembayaran: Vec<Pembayaran>,
}

#[derive(Debug, Serialize)]
pub struct KeuanganView {
    pub santri: StudentSummary,
    /// Most recent active bill; `None` when the student owes nothing.
    pub tagihan_pending: Option<TagihanView>,
    pub tagihan_aktif: i64,
    pub total_tunggakan: i64,
    pub total_tunggakan_format: String,
    pub total_dibayar: i64,
    pub total_dibayar_format: String,
    pub tagihan: Vec<TagihanView>,
}

/// Parsed fields of a payment-evidence upload.
#[derive(Debug, Default)]
pub struct PaymentSubmission {
    pub tagihan_id: Option<Uuid>,
    pub nominal: Option<i64>,
    pub tanggal_bayar: Option<NaiveDate>,
}
