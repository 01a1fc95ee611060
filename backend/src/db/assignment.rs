use sqlx::PgPool;
use uuid::Uuid;

use crate::models::santri::{AssignmentKind, CurrentAssignment};

const CURRENT_KAMAR: &str =
    "SELECT ks.id AS assignment_id, k.id AS target_id, k.nama_kamar AS nama, ks.tanggal_masuk
     FROM kamar_santri ks
     JOIN kamar k ON k.id = ks.kamar_id
     WHERE ks.santri_id = $1 AND ks.is_active = TRUE
     ORDER BY ks.tanggal_masuk DESC, ks.id DESC
     LIMIT 1";

const CURRENT_KELAS: &str =
    "SELECT ks.id AS assignment_id, k.id AS target_id, k.nama_kelas AS nama, ks.tanggal_masuk
     FROM kelas_santri ks
     JOIN kelas k ON k.id = ks.kelas_id
     WHERE ks.santri_id = $1 AND ks.is_active = TRUE
     ORDER BY ks.tanggal_masuk DESC, ks.id DESC
     LIMIT 1";

/// The student's current room or class: the most recent active assignment.
///
/// History rows are kept in the join tables, so several active rows may
/// exist; only the newest by entry date is ever surfaced.
pub async fn current_assignment(
    pool: &PgPool,
    kind: AssignmentKind,
    santri_id: Uuid,
) -> anyhow::Result<Option<CurrentAssignment>> {
    let sql = match kind {
        AssignmentKind::Kamar => CURRENT_KAMAR,
        AssignmentKind::Kelas => CURRENT_KELAS,
    };
    let row = sqlx::query_as::<_, CurrentAssignment>(sql)
        .bind(santri_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
