use chrono::{Datelike, NaiveDate};
use futures_util::future::try_join_all;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    models::{
        dashboard::{
            AdminStats, DebtorBalance, MonthlyRevenue, Occupancy, Receivables, RoomOccupancy,
            UrgentCounts,
        },
        keuangan::{PembayaranStatus, TagihanStatus},
        user::Role,
    },
    services::format,
};

/// Length of the revenue series.
pub const REVENUE_MONTHS: usize = 6;

/// `round(terisi / kapasitas * 100)`, or 0 for rooms without capacity.
pub fn occupancy(kapasitas: i64, terisi: i64) -> Occupancy {
    let persentase = if kapasitas <= 0 {
        0
    } else {
        (terisi as f64 / kapasitas as f64 * 100.0).round() as i64
    };
    Occupancy { kapasitas, terisi, persentase }
}

/// A calendar month as a half-open date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    fn from_index(idx: i32) -> anyhow::Result<Self> {
        let (year, month) = (idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1);
        let (next_year, next_month) = ((idx + 1).div_euclid(12), (idx + 1).rem_euclid(12) as u32 + 1);
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| anyhow::anyhow!("invalid month {year}-{month}"))?;
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or_else(|| anyhow::anyhow!("invalid month {next_year}-{next_month}"))?;
        Ok(Self { year, month, start, end })
    }
}

/// The `count` months ending with the month of `today`, oldest first.
pub fn month_windows(today: NaiveDate, count: usize) -> anyhow::Result<Vec<MonthWindow>> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| MonthWindow::from_index(current - back))
        .collect()
}

#[derive(Debug, Clone, FromRow)]
pub struct DebtRow {
    pub santri_id: Uuid,
    pub nama: String,
    pub nominal: i64,
}

/// Groups active bills per student, keeping the order in which students
/// first appear.
pub fn group_debtors(rows: Vec<DebtRow>) -> Vec<DebtorBalance> {
    let mut out: Vec<DebtorBalance> = Vec::new();
    for row in rows {
        match out.iter_mut().find(|d| d.santri_id == row.santri_id) {
            Some(d) => {
                d.jumlah_tagihan += 1;
                d.total += row.nominal;
            }
            None => out.push(DebtorBalance {
                santri_id: row.santri_id,
                nama: row.nama,
                jumlah_tagihan: 1,
                total: row.nominal,
            }),
        }
    }
    out
}

pub struct StatistikService;

impl StatistikService {
    pub async fn admin(pool: &PgPool, today: NaiveDate) -> anyhow::Result<AdminStats> {
        let (total_santri, total_pengajar, kamar, keuangan, pemasukan_bulanan, urgent) = tokio::try_join!(
            Self::active_role_count(pool, Role::Santri),
            Self::active_role_count(pool, Role::Pengajar),
            Self::room_occupancy(pool),
            Self::receivables(pool),
            Self::monthly_revenue(pool, today),
            Self::urgent_counts(pool),
        )?;

        Ok(AdminStats {
            total_santri,
            total_pengajar,
            kamar,
            keuangan,
            pemasukan_bulanan,
            urgent,
        })
    }

    async fn active_role_count(pool: &PgPool, role: Role) -> anyhow::Result<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT ur.user_id)::BIGINT
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             JOIN users u ON u.id = ur.user_id
             WHERE r.nama = $1 AND ur.is_active = TRUE AND u.is_active = TRUE",
        )
        .bind(role.db_name())
        .fetch_one(pool)
        .await?;
        Ok(n)
    }

    async fn gender_occupancy(pool: &PgPool, jenis_kamar: &str) -> anyhow::Result<Occupancy> {
        let (kapasitas, terisi): (i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COALESCE(SUM(kapasitas), 0)::BIGINT FROM kamar WHERE jenis_kamar = $1),
                (SELECT COUNT(DISTINCT ks.santri_id)::BIGINT
                 FROM kamar_santri ks
                 JOIN kamar k ON k.id = ks.kamar_id
                 WHERE k.jenis_kamar = $1 AND ks.is_active = TRUE)",
        )
        .bind(jenis_kamar)
        .fetch_one(pool)
        .await?;
        Ok(occupancy(kapasitas, terisi))
    }

    async fn room_occupancy(pool: &PgPool) -> anyhow::Result<RoomOccupancy> {
        let (putra, putri) = tokio::try_join!(
            Self::gender_occupancy(pool, "Putra"),
            Self::gender_occupancy(pool, "Putri"),
        )?;
        Ok(RoomOccupancy { putra, putri })
    }

    async fn receivables(pool: &PgPool) -> anyhow::Result<Receivables> {
        let debts = sqlx::query_as::<_, DebtRow>(
            "SELECT t.santri_id, u.nama, t.nominal
             FROM tagihan t
             JOIN users u ON u.id = t.santri_id
             WHERE t.status = $1
             ORDER BY t.created_at, t.id",
        )
        .bind(TagihanStatus::Aktif.to_string())
        .fetch_all(pool);

        let collected = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(nominal), 0)::BIGINT FROM pembayaran WHERE status = $1",
        )
        .bind(PembayaranStatus::Berhasil.to_string())
        .fetch_one(pool);

        let (debts, total_pemasukan) = tokio::try_join!(debts, collected)?;
        let total_piutang = debts.iter().map(|d| d.nominal).sum();

        Ok(Receivables {
            total_piutang,
            total_piutang_format: format::rupiah(total_piutang),
            total_pemasukan,
            total_pemasukan_format: format::rupiah(total_pemasukan),
            piutang_per_santri: group_debtors(debts),
        })
    }

    /// One aggregate query per month; months without payments report 0.
    async fn monthly_revenue(pool: &PgPool, today: NaiveDate) -> anyhow::Result<Vec<MonthlyRevenue>> {
        let windows = month_windows(today, REVENUE_MONTHS)?;
        let totals = try_join_all(windows.iter().map(|w| {
            sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(SUM(nominal), 0)::BIGINT FROM pembayaran
                 WHERE status = $1 AND tanggal_bayar >= $2 AND tanggal_bayar < $3",
            )
            .bind(PembayaranStatus::Berhasil.to_string())
            .bind(w.start)
            .bind(w.end)
            .fetch_one(pool)
        }))
        .await?;

        Ok(windows
            .iter()
            .zip(totals)
            .map(|(w, nominal)| MonthlyRevenue {
                bulan: format!("{:04}-{:02}", w.year, w.month),
                label: format::bulan(w.year, w.month),
                nominal: nominal.max(0),
            })
            .collect())
    }

    async fn urgent_counts(pool: &PgPool) -> anyhow::Result<UrgentCounts> {
        let layanan = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM layanan WHERE status IS NULL OR status = 'Pending'",
        )
        .fetch_one(pool);
        let pembayaran = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM pembayaran WHERE status = $1",
        )
        .bind(PembayaranStatus::Pending.to_string())
        .fetch_one(pool);

        let (layanan_pending, pembayaran_pending) = tokio::try_join!(layanan, pembayaran)?;
        Ok(UrgentCounts { layanan_pending, pembayaran_pending })
    }
}
