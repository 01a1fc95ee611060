use serde::Serialize;
use uuid::Uuid;

use super::{
    kegiatan::Kegiatan,
    kesehatan::{HealthObservation, ScabiesScreening},
    keuangan::TagihanView,
    pengaduan::Pengaduan,
    santri::StudentSummary,
};

/// GET /orangtua/dashboard
#[derive(Debug, Serialize)]
pub struct GuardianDashboard {
    pub santri: StudentSummary,
    pub tagihan_pending: Option<TagihanView>,
    pub tagihan_aktif: i64,
    pub total_kehadiran: i64,
    pub total_dibayar: i64,
    pub total_dibayar_format: String,
    pub kegiatan_hari_ini: Vec<Kegiatan>,
    pub pengaduan_terbaru: Vec<Pengaduan>,
    pub kesehatan_terakhir: Option<HealthObservation>,
    pub screening_terakhir: Option<ScabiesScreening>,
}

// ── Administrator statistics ─────────────────────────────────────────────────

/// Capacity and occupancy of all rooms of one gender.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Occupancy {
    pub kapasitas: i64,
    pub terisi: i64,
    pub persentase: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoomOccupancy {
    pub putra: Occupancy,
    pub putri: Occupancy,
}

/// Outstanding balance of one student.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DebtorBalance {
    pub santri_id: Uuid,
    pub nama: String,
    pub jumlah_tagihan: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct Receivables {
    pub total_piutang: i64,
    pub total_piutang_format: String,
    pub total_pemasukan: i64,
    pub total_pemasukan_format: String,
    pub piutang_per_santri: Vec<DebtorBalance>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub bulan: String,
    pub label: String,
    pub nominal: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UrgentCounts {
    pub layanan_pending: i64,
    pub pembayaran_pending: i64,
}

/// GET /pengurus/dashboard/stats
#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_santri: i64,
    pub total_pengajar: i64,
    pub kamar: RoomOccupancy,
    pub keuangan: Receivables,
    pub pemasukan_bulanan: Vec<MonthlyRevenue>,
    pub urgent: UrgentCounts,
}
