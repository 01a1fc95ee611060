use sqlx::PgPool;
use uuid::Uuid;

use crate::models::kesehatan::{HealthObservation, ScabiesScreening};

pub struct KesehatanService;

impl KesehatanService {
    /// Most recent observation together with its latest detail note.
    pub async fn latest_observation(
        pool: &PgPool,
        santri_id: Uuid,
    ) -> anyhow::Result<Option<HealthObservation>> {
        let row = sqlx::query_as::<_, HealthObservation>(
            "SELECT ks.id, ks.tanggal, ks.keluhan, ks.diagnosa, ks.status,
                    (SELECT ck.catatan FROM catatan_kesehatan ck
                     WHERE ck.kesehatan_id = ks.id
                     ORDER BY ck.created_at DESC
                     LIMIT 1) AS catatan,
                    ks.created_at
             FROM kesehatan_santri ks
             WHERE ks.santri_id = $1
             ORDER BY ks.tanggal DESC, ks.created_at DESC
             LIMIT 1",
        )
        .bind(santri_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn latest_scabies_screening(
        pool: &PgPool,
        santri_id: Uuid,
    ) -> anyhow::Result<Option<ScabiesScreening>> {
        let row = sqlx::query_as::<_, ScabiesScreening>(
            "SELECT id, tanggal, hasil, catatan, created_at
             FROM screening_scabies
             WHERE santri_id = $1
             ORDER BY tanggal DESC, created_at DESC
             LIMIT 1",
        )
        .bind(santri_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }
}
