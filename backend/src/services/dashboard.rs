use std::future::Future;

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    models::{dashboard::GuardianDashboard, santri::GuardianLink},
    services::{
        format,
        kegiatan::KegiatanService,
        kesehatan::KesehatanService,
        keuangan::{tagihan_view, KeuanganService},
        linkage::LinkageService,
        pengaduan::PengaduanService,
    },
};

const RECENT_PENGADUAN: i64 = 3;

/// Awaits an optional read; a failure is logged and becomes the empty value.
pub async fn optional<T, F>(what: &str, fut: F) -> T
where
    T: Default,
    F: Future<Output = anyhow::Result<T>>,
{
    match fut.await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("dashboard: {what} unavailable: {e:#}");
            T::default()
        }
    }
}

pub struct DashboardService;

impl DashboardService {
    /// Guardian dashboard for the student behind `link`.
    ///
    /// Billing, the attendance counter and the student summary are required:
    /// any failure there fails the request. Activities, complaints and health
    /// records degrade to empty.
    pub async fn guardian(
        pool: &PgPool,
        link: &GuardianLink,
        today: NaiveDate,
    ) -> anyhow::Result<GuardianDashboard> {
        let santri_id = link.santri_id;

        let required = async {
            tokio::try_join!(
                LinkageService::summary(pool, link),
                KeuanganService::latest_active_bill(pool, santri_id),
                KeuanganService::active_bill_count(pool, santri_id),
                KegiatanService::attendance_count(pool, santri_id),
                KeuanganService::collected_total(pool, santri_id),
            )
        };

        let (required, kegiatan_hari_ini, pengaduan_terbaru, kesehatan_terakhir, screening_terakhir) = tokio::join!(
            required,
            optional(
                "kegiatan hari ini",
                KegiatanService::today_for_student(pool, santri_id, today)
            ),
            optional(
                "pengaduan terbaru",
                PengaduanService::list_for_santri(pool, santri_id, Some(RECENT_PENGADUAN))
            ),
            optional(
                "pemeriksaan kesehatan",
                KesehatanService::latest_observation(pool, santri_id)
            ),
            optional(
                "screening scabies",
                KesehatanService::latest_scabies_screening(pool, santri_id)
            ),
        );
        let (santri, bill, tagihan_aktif, total_kehadiran, total_dibayar) = required?;

        Ok(GuardianDashboard {
            santri,
            tagihan_pending: bill.map(|b| tagihan_view(b, Vec::new())),
            tagihan_aktif,
            total_kehadiran,
            total_dibayar,
            total_dibayar_format: format::rupiah(total_dibayar),
            kegiatan_hari_ini,
            pengaduan_terbaru,
            kesehatan_terakhir,
            screening_terakhir,
        })
    }
}
