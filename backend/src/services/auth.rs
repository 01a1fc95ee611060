use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        auth::Claims,
        user::{LoginResponse, RegisterRequest, Role, User, UserProfile, USER_COLS},
    },
    services::metrics::{LOGINS_COUNTER, REGISTRATIONS_COUNTER},
};

const MIN_PASSWORD_LEN: usize = 6;
const BCRYPT_COST: u32 = 12;

/// Registration input after validation.
#[derive(Debug)]
pub struct NewUser {
    pub nama: String,
    pub no_identitas: String,
    pub no_hp: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub jenis_kelamin: Option<String>,
    pub alamat: Option<String>,
    pub role: Role,
    /// (student id-number, relationship label)
    pub link: Option<(String, String)>,
}

fn trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn validate_registration(req: &RegisterRequest) -> ApiResult<NewUser> {
    let (Some(nama), Some(no_identitas), Some(password)) = (
        trimmed(&req.nama),
        trimmed(&req.no_identitas),
        req.password.clone().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Nama, nomor identitas, dan password wajib diisi"));
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password minimal {MIN_PASSWORD_LEN} karakter"
        )));
    }

    let role = match trimmed(&req.role) {
        Some(r) => r
            .parse::<Role>()
            .map_err(|_| ApiError::bad_request("Role tidak dikenal"))?,
        None => Role::Orangtua,
    };
    if role == Role::Pengurus {
        return Err(ApiError::Forbidden("Role pengurus tidak dapat mendaftar sendiri".into()));
    }

    let jenis_kelamin = trimmed(&req.jenis_kelamin).map(|s| s.to_uppercase());
    if let Some(jk) = &jenis_kelamin {
        if jk != "L" && jk != "P" {
            return Err(ApiError::bad_request("Jenis kelamin harus L atau P"));
        }
    }

    let link = match (role, trimmed(&req.no_identitas_santri)) {
        (Role::Orangtua, Some(nis)) => {
            let hubungan = trimmed(&req.hubungan).unwrap_or_else(|| "Wali".to_string());
            if !matches!(hubungan.as_str(), "Ayah" | "Ibu" | "Wali") {
                return Err(ApiError::bad_request("Hubungan harus Ayah, Ibu, atau Wali"));
            }
            Some((nis, hubungan))
        }
        _ => None,
    };

    Ok(NewUser {
        nama,
        no_identitas,
        no_hp: trimmed(&req.no_hp),
        email: trimmed(&req.email).map(|e| e.to_lowercase()),
        password,
        jenis_kelamin,
        alamat: trimmed(&req.alamat),
        role,
        link,
    })
}

pub struct AuthService;

impl AuthService {
    /// Authenticates by id-number, phone or email (whichever matches).
    pub async fn login(
        pool: &PgPool,
        identifier: &str,
        password: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> ApiResult<LoginResponse> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(ApiError::bad_request("Identifier dan password wajib diisi"));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users
             WHERE no_identitas = $1 OR no_hp = $1 OR LOWER(email) = LOWER($1)
             ORDER BY created_at
             LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(pool)
        .await?;

        let Some(user) = user else {
            LOGINS_COUNTER.with_label_values(&["invalid"]).inc();
            return Err(ApiError::Unauthorized("Identifier atau password salah".into()));
        };

        let valid = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
        if !valid {
            LOGINS_COUNTER.with_label_values(&["invalid"]).inc();
            return Err(ApiError::Unauthorized("Identifier atau password salah".into()));
        }

        if !user.is_active {
            LOGINS_COUNTER.with_label_values(&["inactive"]).inc();
            return Err(ApiError::Forbidden("Akun tidak aktif".into()));
        }

        let role = Self::primary_role(pool, user.id)
            .await?
            .ok_or_else(|| ApiError::Forbidden("Akun belum memiliki role aktif".into()))?;

        let token = Self::generate_access_token(user.id, &user.nama, role, jwt_secret, ttl_seconds)?;
        LOGINS_COUNTER.with_label_values(&["success"]).inc();
        tracing::info!("login: user_id={} role={}", user.id, role);

        Ok(LoginResponse {
            token,
            user: UserProfile::new(user, role),
        })
    }

    /// First active role of the user, by role id.
    pub async fn primary_role(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Role>> {
        let name: Option<String> = sqlx::query_scalar(
            "SELECT r.nama FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = $1 AND ur.is_active = TRUE
             ORDER BY r.id
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        name.map(|n| n.parse()).transpose()
    }

    pub fn generate_access_token(
        user_id: Uuid,
        nama: &str,
        role: Role,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            nama: nama.to_string(),
            role,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub async fn register(pool: &PgPool, req: &RegisterRequest) -> ApiResult<UserProfile> {
        let new_user = validate_registration(req)?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM users
                WHERE no_identitas = $1
                   OR ($2::TEXT IS NOT NULL AND no_hp = $2)
                   OR ($3::TEXT IS NOT NULL AND LOWER(email) = $3)
             )",
        )
        .bind(&new_user.no_identitas)
        .bind(&new_user.no_hp)
        .bind(&new_user.email)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(ApiError::bad_request(
                "Nomor identitas, nomor HP, atau email sudah terdaftar",
            ));
        }

        let santri_id = match &new_user.link {
            Some((nis, _)) => Some(
                sqlx::query_scalar::<_, Uuid>(
                    "SELECT u.id FROM users u
                     JOIN user_roles ur ON ur.user_id = u.id AND ur.is_active = TRUE
                     JOIN roles r ON r.id = ur.role_id AND r.nama = 'Santri'
                     WHERE u.no_identitas = $1 AND u.is_active = TRUE",
                )
                .bind(nis)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| ApiError::not_found("Santri tidak ditemukan"))?,
            ),
            None => None,
        };

        let hash = bcrypt::hash(&new_user.password, BCRYPT_COST).map_err(anyhow::Error::from)?;

        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (nama, no_identitas, no_hp, email, password_hash, jenis_kelamin, alamat)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLS}"
        ))
        .bind(&new_user.nama)
        .bind(&new_user.no_identitas)
        .bind(&new_user.no_hp)
        .bind(&new_user.email)
        .bind(&hash)
        .bind(&new_user.jenis_kelamin)
        .bind(&new_user.alamat)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE nama = $2",
        )
        .bind(user.id)
        .bind(new_user.role.db_name())
        .execute(&mut *tx)
        .await?;

        if let (Some(santri_id), Some((_, hubungan))) = (santri_id, &new_user.link) {
            sqlx::query(
                "INSERT INTO orangtua_santri (orangtua_id, santri_id, hubungan)
                 VALUES ($1, $2, $3)",
            )
            .bind(user.id)
            .bind(santri_id)
            .bind(hubungan)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        REGISTRATIONS_COUNTER
            .with_label_values(&[&new_user.role.to_string()])
            .inc();
        tracing::info!("register: user_id={} role={}", user.id, new_user.role);

        Ok(UserProfile::new(user, new_user.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        middleware::auth::decode_access_token,
        test_support::{insert_user, PASSWORD},
    };

    const SECRET: &str = "test-secret";

    fn request() -> RegisterRequest {
        RegisterRequest {
            nama: Some("  Siti Aminah ".into()),
            no_identitas: Some("3201010101010001".into()),
            no_hp: Some("081234567890".into()),
            email: Some("Siti@Example.com".into()),
            password: Some(PASSWORD.into()),
            jenis_kelamin: Some("p".into()),
            alamat: None,
            role: None,
            no_identitas_santri: Some("S-2024-001".into()),
            hubungan: Some("Ibu".into()),
        }
    }

    #[test]
    fn registration_defaults_to_orangtua_and_normalises() {
        let u = validate_registration(&request()).unwrap();
        assert_eq!(u.nama, "Siti Aminah");
        assert_eq!(u.role, Role::Orangtua);
        assert_eq!(u.email.as_deref(), Some("siti@example.com"));
        assert_eq!(u.jenis_kelamin.as_deref(), Some("P"));
        assert_eq!(u.link, Some(("S-2024-001".into(), "Ibu".into())));
    }

    #[test]
    fn registration_rejects_missing_or_invalid_fields() {
        let mut r = request();
        r.no_identitas = Some("   ".into());
        assert_eq!(validate_registration(&r).unwrap_err().status(), axum::http::StatusCode::BAD_REQUEST);

        let mut r = request();
        r.password = Some("123".into());
        assert!(validate_registration(&r).is_err());

        let mut r = request();
        r.hubungan = Some("Paman".into());
        assert!(validate_registration(&r).is_err());

        let mut r = request();
        r.role = Some("superuser".into());
        assert!(validate_registration(&r).is_err());
    }

    #[test]
    fn pengurus_cannot_self_register() {
        let mut r = request();
        r.role = Some("Pengurus".into());
        let err = validate_registration(&r).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn link_is_ignored_for_non_guardians() {
        let mut r = request();
        r.role = Some("Pengajar".into());
        let u = validate_registration(&r).unwrap();
        assert_eq!(u.role, Role::Pengajar);
        assert!(u.link.is_none());
    }

    #[test]
    fn token_carries_user_name_and_lowercase_role() {
        let id = Uuid::new_v4();
        let token =
            AuthService::generate_access_token(id, "Ahmad", Role::TimKesehatan, "secret", 86_400).unwrap();
        let user = decode_access_token(&token, "secret").unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.nama, "Ahmad");
        assert_eq!(user.role, Role::TimKesehatan);

        assert!(decode_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            nama: "Ahmad".into(),
            role: Role::Orangtua,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_access_token(&token, "secret").is_err());
    }

    #[sqlx::test]
    async fn login_accepts_id_number_phone_or_email(pool: PgPool) {
        let id = insert_user(
            &pool,
            Role::Orangtua,
            "3201010101010001",
            Some("081234567890"),
            Some("siti@example.com"),
            true,
        )
        .await;

        for identifier in ["3201010101010001", "081234567890", "Siti@Example.com", " siti@example.com "] {
            let res = AuthService::login(&pool, identifier, PASSWORD, SECRET, 3600)
                .await
                .unwrap();
            assert_eq!(res.user.id, id);
            assert_eq!(res.user.role, Role::Orangtua);
            let user = decode_access_token(&res.token, SECRET).unwrap();
            assert_eq!(user.user_id, id);
        }
    }

    #[sqlx::test]
    async fn login_rejects_wrong_password_and_unknown_account(pool: PgPool) {
        insert_user(&pool, Role::Orangtua, "3201010101010001", None, None, true).await;

        let err = AuthService::login(&pool, "3201010101010001", "salah", SECRET, 3600)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = AuthService::login(&pool, "0000", PASSWORD, SECRET, 3600)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[sqlx::test]
    async fn inactive_account_is_forbidden(pool: PgPool) {
        insert_user(&pool, Role::Orangtua, "3201010101010001", None, None, false).await;

        let err = AuthService::login(&pool, "3201010101010001", PASSWORD, SECRET, 3600)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.to_string(), "Akun tidak aktif");
    }

    #[sqlx::test]
    async fn registration_links_guardian_to_student(pool: PgPool) {
        let santri = insert_user(&pool, Role::Santri, "S-2024-001", None, None, true).await;

        let profile = AuthService::register(&pool, &request()).await.unwrap();
        assert_eq!(profile.role, Role::Orangtua);
        assert_eq!(profile.email.as_deref(), Some("siti@example.com"));

        let hubungan: String = sqlx::query_scalar(
            "SELECT hubungan FROM orangtua_santri WHERE orangtua_id = $1 AND santri_id = $2",
        )
        .bind(profile.id)
        .bind(santri)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(hubungan, "Ibu");

        let again = AuthService::register(&pool, &request()).await.unwrap_err();
        assert!(matches!(again, ApiError::BadRequest(_)));
    }

    #[sqlx::test]
    async fn registration_with_unknown_student_creates_nothing(pool: PgPool) {
        let err = AuthService::register(&pool, &request()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }
}
