use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::kegiatan::{Kegiatan, KegiatanFilter, KegiatanQuery, KegiatanView},
    services::format,
};

const KEGIATAN_COLS: &str =
    "k.id, k.nama_kegiatan, k.jenis, k.tanggal, k.waktu_mulai, k.waktu_selesai, k.lokasi,
     k.deskripsi, kh.status AS status_kehadiran";

/// `Mendatang` for today and later, `Selesai` before today.
pub fn classify(tanggal: NaiveDate, today: NaiveDate) -> KegiatanFilter {
    if tanggal >= today {
        KegiatanFilter::Mendatang
    } else {
        KegiatanFilter::Selesai
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct KegiatanService;

impl KegiatanService {
    /// Activities the student is registered for, newest first.
    pub async fn list_for_student(
        pool: &PgPool,
        santri_id: Uuid,
        query: &KegiatanQuery,
        today: NaiveDate,
    ) -> ApiResult<Vec<KegiatanView>> {
        let filter = match query.kind.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(k) => Some(
                k.parse::<KegiatanFilter>()
                    .map_err(|_| ApiError::bad_request("type harus Mendatang atau Selesai"))?,
            ),
            None => None,
        };
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows = sqlx::query_as::<_, Kegiatan>(&format!(
            "SELECT {KEGIATAN_COLS}
             FROM kegiatan k
             JOIN kehadiran kh ON kh.kegiatan_id = k.id
             WHERE kh.santri_id = $1
               AND ($2::TEXT IS NULL OR k.nama_kegiatan ILIKE $2)
               AND ($3::BOOLEAN IS NULL
                    OR ($3 = TRUE AND k.tanggal >= $4)
                    OR ($3 = FALSE AND k.tanggal < $4))
             ORDER BY k.tanggal DESC, k.waktu_mulai DESC NULLS LAST"
        ))
        .bind(santri_id)
        .bind(pattern)
        .bind(filter.map(|f| f == KegiatanFilter::Mendatang))
        .bind(today)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|k| KegiatanView {
                tanggal_format: format::tanggal(k.tanggal),
                status_kegiatan: classify(k.tanggal, today),
                kegiatan: k,
            })
            .collect())
    }

    /// Today's activities the student is registered for, by start time.
    pub async fn today_for_student(
        pool: &PgPool,
        santri_id: Uuid,
        today: NaiveDate,
    ) -> anyhow::Result<Vec<Kegiatan>> {
        let rows = sqlx::query_as::<_, Kegiatan>(&format!(
            "SELECT {KEGIATAN_COLS}
             FROM kegiatan k
             JOIN kehadiran kh ON kh.kegiatan_id = k.id
             WHERE kh.santri_id = $1 AND k.tanggal = $2
             ORDER BY k.waktu_mulai NULLS LAST, k.nama_kegiatan"
        ))
        .bind(santri_id)
        .bind(today)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Number of activities the student attended (`Hadir`).
    pub async fn attendance_count(pool: &PgPool, santri_id: Uuid) -> anyhow::Result<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM kehadiran WHERE santri_id = $1 AND status = 'Hadir'",
        )
        .bind(santri_id)
        .fetch_one(pool)
        .await?;
        Ok(n)
    }
}
