use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Latest health observation, joined with its most recent detail note.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealthObservation {
    pub id: Uuid,
    pub tanggal: NaiveDate,
    pub keluhan: Option<String>,
    pub diagnosa: Option<String>,
    pub status: Option<String>,
    pub catatan: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScabiesScreening {
    pub id: Uuid,
    pub tanggal: NaiveDate,
    pub hasil: String, // "Negatif", "Suspek", "Positif"
    pub catatan: Option<String>,
    pub created_at: DateTime<Utc>,
}
