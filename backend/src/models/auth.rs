use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub nama: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT by the axum extractor in `middleware::auth`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub nama: String,
    pub role: Role,
}
