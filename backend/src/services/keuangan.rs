use axum::extract::Multipart;
use chrono::{Local, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        keuangan::{
            KeuanganView, Pembayaran, PaymentSubmission, PembayaranStatus, Tagihan, TagihanStatus,
            TagihanView,
        },
        santri::GuardianLink,
    },
    services::{
        format,
        linkage::LinkageService,
        metrics::PAYMENT_UPLOADS_COUNTER,
        upload::{self, StoredUpload, UploadKind, UploadedFile},
    },
};

const TAGIHAN_COLS: &str =
    "id, santri_id, nama_tagihan, nominal, jatuh_tempo, status, created_at";

const PEMBAYARAN_COLS: &str =
    "id, tagihan_id, nominal, tanggal_bayar, bukti_bayar, status, created_at";

pub fn tagihan_view(t: Tagihan, pembayaran: Vec<Pembayaran>) -> TagihanView {
    TagihanView {
        id: t.id,
        nominal_format: format::rupiah(t.nominal),
        jatuh_tempo_format: format::tanggal(t.jatuh_tempo),
        nama_tagihan: t.nama_tagihan,
        nominal: t.nominal,
        jatuh_tempo: t.jatuh_tempo,
        status: t.status,
        pembayaran,
    }
}

pub struct KeuanganService;

impl KeuanganService {
    /// Most recent active bill of the student.
    pub async fn latest_active_bill(pool: &PgPool, santri_id: Uuid) -> anyhow::Result<Option<Tagihan>> {
        let bill = sqlx::query_as::<_, Tagihan>(&format!(
            "SELECT {TAGIHAN_COLS} FROM tagihan
             WHERE santri_id = $1 AND status = $2
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(santri_id)
        .bind(TagihanStatus::Aktif.to_string())
        .fetch_optional(pool)
        .await?;
        Ok(bill)
    }

    pub async fn active_bill_count(pool: &PgPool, santri_id: Uuid) -> anyhow::Result<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM tagihan WHERE santri_id = $1 AND status = $2",
        )
        .bind(santri_id)
        .bind(TagihanStatus::Aktif.to_string())
        .fetch_one(pool)
        .await?;
        Ok(n)
    }

    pub async fn outstanding_total(pool: &PgPool, santri_id: Uuid) -> anyhow::Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(nominal), 0)::BIGINT FROM tagihan
             WHERE santri_id = $1 AND status = $2",
        )
        .bind(santri_id)
        .bind(TagihanStatus::Aktif.to_string())
        .fetch_one(pool)
        .await?;
        Ok(total)
    }

    /// Sum of successful payments on the student's bills.
    pub async fn collected_total(pool: &PgPool, santri_id: Uuid) -> anyhow::Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(p.nominal), 0)::BIGINT
             FROM pembayaran p
             JOIN tagihan t ON t.id = p.tagihan_id
             WHERE t.santri_id = $1 AND p.status = $2",
        )
        .bind(santri_id)
        .bind(PembayaranStatus::Berhasil.to_string())
        .fetch_one(pool)
        .await?;
        Ok(total)
    }

    pub async fn list_bills(pool: &PgPool, santri_id: Uuid) -> anyhow::Result<Vec<Tagihan>> {
        let bills = sqlx::query_as::<_, Tagihan>(&format!(
            "SELECT {TAGIHAN_COLS} FROM tagihan
             WHERE santri_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(santri_id)
        .fetch_all(pool)
        .await?;
        Ok(bills)
    }

    pub async fn payments_for(pool: &PgPool, tagihan_ids: &[Uuid]) -> anyhow::Result<Vec<Pembayaran>> {
        if tagihan_ids.is_empty() {
            return Ok(Vec::new());
        }
        let payments = sqlx::query_as::<_, Pembayaran>(&format!(
            "SELECT {PEMBAYARAN_COLS} FROM pembayaran
             WHERE tagihan_id = ANY($1)
             ORDER BY tanggal_bayar DESC, created_at DESC"
        ))
        .bind(tagihan_ids)
        .fetch_all(pool)
        .await?;
        Ok(payments)
    }

    /// Billing overview for the guardian of `link`.
    pub async fn view(pool: &PgPool, link: &GuardianLink) -> anyhow::Result<KeuanganView> {
        let santri_id = link.santri_id;
        let (santri, bills, tagihan_aktif, total_tunggakan, total_dibayar) = tokio::try_join!(
            LinkageService::summary(pool, link),
            Self::list_bills(pool, santri_id),
            Self::active_bill_count(pool, santri_id),
            Self::outstanding_total(pool, santri_id),
            Self::collected_total(pool, santri_id),
        )?;

        let ids: Vec<Uuid> = bills.iter().map(|b| b.id).collect();
        let mut payments = Self::payments_for(pool, &ids).await?;

        // bills arrive newest first, so the first active one is the current bill
        let mut tagihan_pending = None;
        let mut tagihan = Vec::with_capacity(bills.len());
        for bill in bills {
            let (own, rest): (Vec<_>, Vec<_>) =
                payments.into_iter().partition(|p| p.tagihan_id == bill.id);
            payments = rest;
            let is_active = bill.status == TagihanStatus::Aktif.to_string();
            let view = tagihan_view(bill, own);
            if is_active && tagihan_pending.is_none() {
                tagihan_pending = Some(view.clone());
            }
            tagihan.push(view);
        }

        Ok(KeuanganView {
            santri,
            tagihan_pending,
            tagihan_aktif,
            total_tunggakan,
            total_tunggakan_format: format::rupiah(total_tunggakan),
            total_dibayar,
            total_dibayar_format: format::rupiah(total_dibayar),
            tagihan,
        })
    }

    /// Stores a payment-evidence file and records a `Pending` payment.
    ///
    /// The file hits the disk before the bill is checked; every failure after
    /// that point removes it again.
    pub async fn submit_payment(
        pool: &PgPool,
        santri_id: Uuid,
        user_id: Uuid,
        upload_dir: &str,
        max_bytes: usize,
        mut multipart: Multipart,
    ) -> ApiResult<Pembayaran> {
        let mut stored: Option<StoredUpload> = None;
        let mut form = PaymentSubmission::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Form tidak valid: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "bukti_bayar" => {
                    let file = UploadedFile::from_field(field)
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Gagal membaca file: {e}")))?;
                    let ext = upload::validate(UploadKind::BuktiBayar, &file, max_bytes)?;
                    stored = Some(
                        StoredUpload::write(upload_dir, UploadKind::BuktiBayar, user_id, ext, &file.bytes)
                            .await?,
                    );
                }
                "tagihan_id" => {
                    let v = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
                    form.tagihan_id = Some(
                        v.trim()
                            .parse()
                            .map_err(|_| ApiError::bad_request("tagihan_id tidak valid"))?,
                    );
                }
                "nominal" => {
                    let v = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
                    if !v.trim().is_empty() {
                        form.nominal = Some(parse_nominal(&v)?);
                    }
                }
                "tanggal_bayar" => {
                    let v = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
                    if !v.trim().is_empty() {
                        form.tanggal_bayar = Some(
                            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                                .map_err(|_| ApiError::bad_request("Format tanggal_bayar harus YYYY-MM-DD"))?,
                        );
                    }
                }
                _ => {}
            }
        }

        let result = Self::record_payment(pool, santri_id, &form, stored.as_ref()).await;
        match (&result, stored) {
            (Ok(_), Some(file)) => {
                file.keep();
                PAYMENT_UPLOADS_COUNTER.with_label_values(&["success"]).inc();
            }
            // dropping `file` here deletes it from disk
            (_, file) => {
                drop(file);
                PAYMENT_UPLOADS_COUNTER.with_label_values(&["rejected"]).inc();
            }
        }
        result
    }

    async fn record_payment(
        pool: &PgPool,
        santri_id: Uuid,
        form: &PaymentSubmission,
        stored: Option<&StoredUpload>,
    ) -> ApiResult<Pembayaran> {
        let stored = stored.ok_or_else(|| ApiError::bad_request("File bukti_bayar wajib diunggah"))?;
        let tagihan_id = form
            .tagihan_id
            .ok_or_else(|| ApiError::bad_request("tagihan_id wajib diisi"))?;

        let bill = sqlx::query_as::<_, Tagihan>(&format!(
            "SELECT {TAGIHAN_COLS} FROM tagihan WHERE id = $1 AND santri_id = $2"
        ))
        .bind(tagihan_id)
        .bind(santri_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Tagihan tidak ditemukan"))?;

        if bill.status != TagihanStatus::Aktif.to_string() {
            return Err(ApiError::bad_request("Tagihan sudah lunas"));
        }

        let nominal = form.nominal.unwrap_or(bill.nominal);
        let tanggal_bayar = form.tanggal_bayar.unwrap_or_else(|| Local::now().date_naive());

        let payment = sqlx::query_as::<_, Pembayaran>(&format!(
            "INSERT INTO pembayaran (tagihan_id, nominal, tanggal_bayar, bukti_bayar, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PEMBAYARAN_COLS}"
        ))
        .bind(bill.id)
        .bind(nominal)
        .bind(tanggal_bayar)
        .bind(stored.relative_path())
        .bind(PembayaranStatus::Pending.to_string())
        .fetch_one(pool)
        .await?;

        tracing::info!(
            "payment submitted: pembayaran_id={} tagihan_id={} nominal={}",
            payment.id,
            bill.id,
            nominal
        );
        Ok(payment)
    }
}

/// Accepts `150000`, `150.000` and `Rp 150.000`.
pub fn parse_nominal(raw: &str) -> ApiResult<i64> {
    let digits: String = raw
        .trim()
        .trim_start_matches("Rp")
        .chars()
        .filter(|c| !matches!(c, '.' | ' ' | '_'))
        .collect();
    match digits.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ApiError::bad_request("Nominal tidak valid")),
    }
}
