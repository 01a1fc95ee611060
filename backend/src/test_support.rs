//! Fixtures shared by the database-backed tests.

use std::path::Path;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, Request},
};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::Role;

pub const PASSWORD: &str = "rahasia123";
const BOUNDARY: &str = "pesantren-test-boundary";

pub fn temp_upload_dir() -> String {
    std::env::temp_dir()
        .join(format!("pesantren-upload-test-{}", Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

/// Number of files under `<upload_dir>/<kind>`; a missing directory counts as empty.
pub fn stored_files(upload_dir: &str, kind: &str) -> usize {
    std::fs::read_dir(Path::new(upload_dir).join(kind))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Inserts an account holding `role`, with [`PASSWORD`] as its password.
pub async fn insert_user(
    pool: &PgPool,
    role: Role,
    no_identitas: &str,
    no_hp: Option<&str>,
    email: Option<&str>,
    is_active: bool,
) -> Uuid {
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (nama, no_identitas, no_hp, email, password_hash, is_active)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(format!("{} {no_identitas}", role.db_name()))
    .bind(no_identitas)
    .bind(no_hp)
    .bind(email)
    .bind(&hash)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE nama = $2")
        .bind(id)
        .bind(role.db_name())
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn link(pool: &PgPool, orangtua_id: Uuid, santri_id: Uuid, hubungan: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO orangtua_santri (orangtua_id, santri_id, hubungan)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(orangtua_id)
    .bind(santri_id)
    .bind(hubungan)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn insert_tagihan(pool: &PgPool, santri_id: Uuid, nama: &str, nominal: i64) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO tagihan (santri_id, nama_tagihan, nominal, jatuh_tempo)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(santri_id)
    .bind(nama)
    .bind(nominal)
    .bind(NaiveDate::from_ymd_opt(2026, 10, 10).unwrap())
    .fetch_one(pool)
    .await
    .unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// `multipart/form-data` body and its content type.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn multipart(parts: &[Part<'_>]) -> Multipart {
    let (content_type, body) = multipart_body(parts);
    let req = Request::post("/")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    Multipart::from_request(req, &()).await.unwrap()
}
