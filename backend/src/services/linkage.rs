use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::assignment::current_assignment,
    error::{ApiError, ApiResult},
    models::santri::{AssignmentKind, GuardianLink, StudentSummary},
};

pub struct LinkageService;

impl LinkageService {
    /// The guardian's active student link, or `None`.
    ///
    /// When a guardian has several active links the oldest one wins; the
    /// others are not surfaced.
    pub async fn resolve(pool: &PgPool, guardian_id: Uuid) -> anyhow::Result<Option<GuardianLink>> {
        let link = sqlx::query_as::<_, GuardianLink>(
            "SELECT os.id AS link_id, s.id AS santri_id, s.nama AS nama_santri, s.no_identitas,
                    s.jenis_kelamin::TEXT AS jenis_kelamin, s.foto_profil, os.hubungan
             FROM orangtua_santri os
             JOIN users s ON s.id = os.santri_id
             WHERE os.orangtua_id = $1 AND os.is_active = TRUE AND s.is_active = TRUE
             ORDER BY os.created_at, os.id
             LIMIT 1",
        )
        .bind(guardian_id)
        .fetch_optional(pool)
        .await?;
        Ok(link)
    }

    /// Like [`resolve`](Self::resolve), turning a missing link into 404.
    pub async fn require(pool: &PgPool, guardian_id: Uuid) -> ApiResult<GuardianLink> {
        Self::resolve(pool, guardian_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Data santri tidak ditemukan"))
    }

    /// Student summary with current room and class.
    pub async fn summary(pool: &PgPool, link: &GuardianLink) -> anyhow::Result<StudentSummary> {
        let (kamar, kelas) = tokio::try_join!(
            current_assignment(pool, AssignmentKind::Kamar, link.santri_id),
            current_assignment(pool, AssignmentKind::Kelas, link.santri_id),
        )?;
        Ok(StudentSummary::new(link, kamar, kelas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::Role,
        test_support::{insert_user, link},
    };

    #[sqlx::test]
    async fn guardian_without_link_is_404(pool: PgPool) {
        let ortu = insert_user(&pool, Role::Orangtua, "3201010101", None, None, true).await;
        assert!(LinkageService::resolve(&pool, ortu).await.unwrap().is_none());

        let err = LinkageService::require(&pool, ortu).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Data santri tidak ditemukan");
    }

    #[sqlx::test]
    async fn inactive_link_is_ignored(pool: PgPool) {
        let santri = insert_user(&pool, Role::Santri, "2024001", None, None, true).await;
        let ortu = insert_user(&pool, Role::Orangtua, "3201010101", None, None, true).await;
        let id = link(&pool, ortu, santri, "Ayah").await;
        sqlx::query("UPDATE orangtua_santri SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(LinkageService::resolve(&pool, ortu).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn oldest_active_link_wins(pool: PgPool) {
        let first = insert_user(&pool, Role::Santri, "2024001", None, None, true).await;
        let second = insert_user(&pool, Role::Santri, "2024002", None, None, true).await;
        let ortu = insert_user(&pool, Role::Orangtua, "3201010101", None, None, true).await;
        let newer = link(&pool, ortu, second, "Wali").await;
        let older = link(&pool, ortu, first, "Ayah").await;
        sqlx::query("UPDATE orangtua_santri SET created_at = NOW() - INTERVAL '1 day' WHERE id = $1")
            .bind(older)
            .execute(&pool)
            .await
            .unwrap();

        let resolved = LinkageService::require(&pool, ortu).await.unwrap();
        assert_eq!(resolved.link_id, older);
        assert_ne!(resolved.link_id, newer);
        assert_eq!(resolved.santri_id, first);
        assert_eq!(resolved.hubungan, "Ayah");
    }
}
