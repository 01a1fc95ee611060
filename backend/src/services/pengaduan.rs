use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        pengaduan::{CreatePengaduanRequest, CreateTanggapanRequest, Pengaduan, PengaduanDetail, Tanggapan},
        user::Role,
    },
    services::metrics::PENGADUAN_COUNTER,
};

const STATUSES: [&str; 3] = ["Pending", "Diproses", "Selesai"];

/// Explicit select list; every query aliases `pengaduan` as `p`.
const PENGADUAN_SELECT: &str =
    "SELECT p.id, p.santri_id, s.nama AS nama_santri, p.pelapor_id, u.nama AS nama_pelapor,
            p.judul, p.isi, p.status,
            (SELECT COUNT(*) FROM tanggapan_pengaduan t WHERE t.pengaduan_id = p.id)::BIGINT
                AS jumlah_tanggapan,
            p.created_at, p.updated_at
     FROM pengaduan p
     JOIN users s ON s.id = p.santri_id
     JOIN users u ON u.id = p.pelapor_id";

fn required_text(v: &Option<String>, field: &str) -> ApiResult<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("{field} wajib diisi")))
}

/// Blank means no filter. Anything outside the known statuses is a 400.
pub fn normalize_status(status: Option<&str>) -> ApiResult<Option<&str>> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) if !STATUSES.contains(&s) => Err(ApiError::bad_request("Status tidak dikenal")),
        other => Ok(other),
    }
}

pub struct PengaduanService;

impl PengaduanService {
    pub async fn list_for_santri(
        pool: &PgPool,
        santri_id: Uuid,
        limit: Option<i64>,
    ) -> anyhow::Result<Vec<Pengaduan>> {
        let rows = sqlx::query_as::<_, Pengaduan>(&format!(
            "{PENGADUAN_SELECT}
             WHERE p.santri_id = $1
             ORDER BY p.created_at DESC
             LIMIT $2"
        ))
        .bind(santri_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(pool: &PgPool, status: Option<&str>) -> ApiResult<Vec<Pengaduan>> {
        let status = normalize_status(status)?;
        let rows = sqlx::query_as::<_, Pengaduan>(&format!(
            "{PENGADUAN_SELECT}
             WHERE ($1::TEXT IS NULL OR p.status = $1)
             ORDER BY p.created_at DESC"
        ))
        .bind(status)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        pool: &PgPool,
        santri_id: Uuid,
        pelapor_id: Uuid,
        req: &CreatePengaduanRequest,
    ) -> ApiResult<Pengaduan> {
        let judul = required_text(&req.judul, "Judul")?;
        let isi = required_text(&req.isi, "Isi pengaduan")?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO pengaduan (santri_id, pelapor_id, judul, isi)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(santri_id)
        .bind(pelapor_id)
        .bind(&judul)
        .bind(&isi)
        .fetch_one(pool)
        .await?;

        PENGADUAN_COUNTER.with_label_values(&["pengaduan"]).inc();
        let created = Self::find(pool, id, None)
            .await?
            .ok_or_else(|| anyhow::anyhow!("pengaduan {id} vanished after insert"))?;
        Ok(created)
    }

    /// Looks up one complaint; `santri_scope` restricts it to that student.
    async fn find(pool: &PgPool, id: Uuid, santri_scope: Option<Uuid>) -> anyhow::Result<Option<Pengaduan>> {
        let row = sqlx::query_as::<_, Pengaduan>(&format!(
            "{PENGADUAN_SELECT}
             WHERE p.id = $1 AND ($2::UUID IS NULL OR p.santri_id = $2)"
        ))
        .bind(id)
        .bind(santri_scope)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn detail(pool: &PgPool, id: Uuid, santri_scope: Option<Uuid>) -> ApiResult<PengaduanDetail> {
        let pengaduan = Self::find(pool, id, santri_scope)
            .await?
            .ok_or_else(|| ApiError::not_found("Pengaduan tidak ditemukan"))?;

        let tanggapan = sqlx::query_as::<_, Tanggapan>(
            "SELECT t.id, t.pengaduan_id, t.user_id, u.nama, t.isi, t.created_at
             FROM tanggapan_pengaduan t
             JOIN users u ON u.id = t.user_id
             WHERE t.pengaduan_id = $1
             ORDER BY t.created_at, t.id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(PengaduanDetail { pengaduan, tanggapan })
    }

    /// Adds a reply. A pengurus reply on a `Pending` complaint moves it to `Diproses`.
    pub async fn reply(
        pool: &PgPool,
        id: Uuid,
        author_id: Uuid,
        author_role: Role,
        santri_scope: Option<Uuid>,
        req: &CreateTanggapanRequest,
    ) -> ApiResult<Tanggapan> {
        let isi = required_text(&req.isi, "Isi tanggapan")?;

        if Self::find(pool, id, santri_scope).await?.is_none() {
            return Err(ApiError::not_found("Pengaduan tidak ditemukan"));
        }

        let mut tx = pool.begin().await?;

        let tanggapan = sqlx::query_as::<_, Tanggapan>(
            "WITH inserted AS (
                 INSERT INTO tanggapan_pengaduan (pengaduan_id, user_id, isi)
                 VALUES ($1, $2, $3)
                 RETURNING *
             )
             SELECT i.id, i.pengaduan_id, i.user_id, u.nama, i.isi, i.created_at
             FROM inserted i
             JOIN users u ON u.id = i.user_id",
        )
        .bind(id)
        .bind(author_id)
        .bind(&isi)
        .fetch_one(&mut *tx)
        .await?;

        if author_role == Role::Pengurus {
            sqlx::query("UPDATE pengaduan SET status = 'Diproses' WHERE id = $1 AND status = 'Pending'")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        PENGADUAN_COUNTER.with_label_values(&["tanggapan"]).inc();
        Ok(tanggapan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text(&Some("  Kamar bocor ".into()), "Judul").unwrap(), "Kamar bocor");
        assert!(required_text(&Some("   ".into()), "Judul").is_err());
        let err = required_text(&None, "Judul").unwrap_err();
        assert_eq!(err.to_string(), "Judul wajib diisi");
    }

    #[test]
    fn status_filter_accepts_known_values_only() {
        assert_eq!(normalize_status(Some(" Diproses ")).unwrap(), Some("Diproses"));
        assert_eq!(normalize_status(Some("  ")).unwrap(), None);
        assert_eq!(normalize_status(None).unwrap(), None);
        let err = normalize_status(Some("Bogus")).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(normalize_status(Some("pending")).is_err());
    }
}
