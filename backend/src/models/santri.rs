use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::upload::public_url;

/// Active guardian → student link, as resolved for an authenticated guardian.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GuardianLink {
    pub link_id: Uuid,
    pub santri_id: Uuid,
    pub nama_santri: String,
    pub no_identitas: String,
    pub jenis_kelamin: Option<String>,
    pub foto_profil: Option<String>,
    pub hubungan: String, // "Ayah", "Ibu", "Wali"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentKind {
    Kamar,
    Kelas,
}

/// The room or class a student currently sits in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurrentAssignment {
    pub assignment_id: Uuid,
    pub target_id: Uuid,
    pub nama: String,
    pub tanggal_masuk: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub id: Uuid,
    pub nama: String,
    pub no_identitas: String,
    pub jenis_kelamin: Option<String>,
    pub foto_profil: Option<String>,
    pub hubungan: String,
    pub kamar: Option<CurrentAssignment>,
    pub kelas: Option<CurrentAssignment>,
}

impl StudentSummary {
    pub fn new(
        link: &GuardianLink,
        kamar: Option<CurrentAssignment>,
        kelas: Option<CurrentAssignment>,
    ) -> Self {
        Self {
            id: link.santri_id,
            nama: link.nama_santri.clone(),
            no_identitas: link.no_identitas.clone(),
            jenis_kelamin: link.jenis_kelamin.clone(),
            foto_profil: link.foto_profil.as_deref().map(public_url),
            hubungan: link.hubungan.clone(),
            kamar,
            kelas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_exposes_public_photo_url() {
        let link = GuardianLink {
            link_id: Uuid::new_v4(),
            santri_id: Uuid::new_v4(),
            nama_santri: "Muhammad Rizki".into(),
            no_identitas: "2024001".into(),
            jenis_kelamin: Some("L".into()),
            foto_profil: Some("foto_profil/1700000000000-b.png".into()),
            hubungan: "Ayah".into(),
        };
        let summary = StudentSummary::new(&link, None, None);
        assert_eq!(
            summary.foto_profil.as_deref(),
            Some("/uploads/foto_profil/1700000000000-b.png")
        );
        assert_eq!(summary.id, link.santri_id);
    }
}
