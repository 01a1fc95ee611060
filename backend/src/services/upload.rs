use std::path::{Component, Path, PathBuf};

use axum::extract::multipart::Field;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use uuid::Uuid;

use crate::error::ApiError;

/// URL prefix under which `UPLOAD_DIR` is served.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    BuktiBayar,
    FotoProfil,
}

impl UploadKind {
    pub fn dir(self) -> &'static str {
        match self {
            UploadKind::BuktiBayar => "bukti_bayar",
            UploadKind::FotoProfil => "foto_profil",
        }
    }

    fn allowed(self) -> &'static [(&'static str, &'static str)] {
        match self {
            UploadKind::BuktiBayar => &[
                ("jpg", "image/jpeg"),
                ("jpeg", "image/jpeg"),
                ("png", "image/png"),
                ("pdf", "application/pdf"),
            ],
            UploadKind::FotoProfil => &[
                ("jpg", "image/jpeg"),
                ("jpeg", "image/jpeg"),
                ("png", "image/png"),
            ],
        }
    }
}

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub async fn from_field(field: Field<'_>) -> anyhow::Result<Self> {
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        Ok(Self { file_name, content_type, bytes })
    }
}

/// Checks extension, MIME type and size. Returns the normalised extension.
///
/// A missing content type is guessed from the file name.
pub fn validate(kind: UploadKind, file: &UploadedFile, max_bytes: usize) -> Result<&'static str, ApiError> {
    if file.bytes.is_empty() {
        return Err(ApiError::bad_request("File kosong"));
    }
    if file.bytes.len() > max_bytes {
        return Err(ApiError::bad_request(format!(
            "Ukuran file maksimal {} MB",
            max_bytes / (1024 * 1024)
        )));
    }

    let ext = Path::new(&file.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let (ext, expected_mime) = kind
        .allowed()
        .iter()
        .find(|(e, _)| *e == ext)
        .copied()
        .ok_or_else(|| ApiError::bad_request(invalid_type_message(kind)))?;

    let declared: Option<mime::Mime> = match &file.content_type {
        Some(ct) => ct.parse().ok(),
        None => mime_guess::from_ext(ext).first(),
    };
    match declared {
        Some(m) if m.essence_str() == expected_mime => Ok(ext),
        _ => Err(ApiError::bad_request(invalid_type_message(kind))),
    }
}

fn invalid_type_message(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::BuktiBayar => "Format file harus JPG, PNG, atau PDF",
        UploadKind::FotoProfil => "Format foto harus JPG atau PNG",
    }
}

/// Attempts at finding a free name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// `{timestamp_millis}-{user_id}.{ext}`, with `-{attempt}` appended after a
/// collision.
pub fn stored_filename(user_id: Uuid, ext: &str, now: DateTime<Utc>, attempt: u32) -> String {
    match attempt {
        0 => format!("{}-{}.{}", now.timestamp_millis(), user_id, ext),
        n => format!("{}-{}-{}.{}", now.timestamp_millis(), user_id, n, ext),
    }
}

pub fn public_url(relative: &str) -> String {
    format!("{PUBLIC_PREFIX}/{relative}")
}

/// A file written under `UPLOAD_DIR` that is removed again on drop unless
/// [`StoredUpload::keep`] is called once the database write has succeeded.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
    relative: String,
    keep: bool,
}

impl StoredUpload {
    pub async fn write(
        upload_dir: &str,
        kind: UploadKind,
        user_id: Uuid,
        ext: &str,
        bytes: &[u8],
    ) -> anyhow::Result<Self> {
        Self::write_at(upload_dir, kind, user_id, ext, bytes, Utc::now()).await
    }

    /// Never overwrites: an existing name moves on to the next attempt.
    async fn write_at(
        upload_dir: &str,
        kind: UploadKind,
        user_id: Uuid,
        ext: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let dir = PathBuf::from(upload_dir).join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = stored_filename(user_id, ext, now, attempt);
            let path = dir.join(&filename);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            // From here on the guard owns the file, so a failed write removes it.
            let upload = Self {
                path,
                relative: format!("{}/{}", kind.dir(), filename),
                keep: false,
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            return Ok(upload);
        }
        anyhow::bail!("no free upload name in {} after {MAX_NAME_ATTEMPTS} attempts", dir.display())
    }

    /// Path relative to `UPLOAD_DIR`, as stored in the database.
    pub fn relative_path(&self) -> &str {
        &self.relative
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keep(mut self) -> String {
        self.keep = true;
        std::mem::take(&mut self.relative)
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        // Drop cannot await; a single unlink runs inline on the current thread.
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!("removed orphaned upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove orphaned upload {}: {e}", self.path.display()),
        }
    }
}

/// Best-effort removal of a previously stored file, by its relative path.
pub async fn remove_stored(upload_dir: &str, relative: &str) {
    let rel = Path::new(relative);
    if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        tracing::warn!("refusing to remove upload outside upload dir: {relative}");
        return;
    }
    let path = PathBuf::from(upload_dir).join(rel);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("failed to remove upload {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_upload_dir;

    fn file(name: &str, ct: Option<&str>, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.into(),
            content_type: ct.map(str::to_string),
            bytes: Bytes::from(vec![1u8; len]),
        }
    }

    #[test]
    fn accepts_allowed_extension_and_mime() {
        let f = file("bukti.PNG", Some("image/png"), 10);
        assert_eq!(validate(UploadKind::BuktiBayar, &f, 1024).unwrap(), "png");

        let f = file("transfer.pdf", Some("application/pdf"), 10);
        assert_eq!(validate(UploadKind::BuktiBayar, &f, 1024).unwrap(), "pdf");

        let f = file("foto.jpeg", None, 10);
        assert_eq!(validate(UploadKind::FotoProfil, &f, 1024).unwrap(), "jpeg");
    }

    #[test]
    fn rejects_bad_type_or_size() {
        let f = file("script.exe", Some("application/octet-stream"), 10);
        assert!(validate(UploadKind::BuktiBayar, &f, 1024).is_err());

        // extension says png, MIME says pdf
        let f = file("bukti.png", Some("application/pdf"), 10);
        assert!(validate(UploadKind::BuktiBayar, &f, 1024).is_err());

        // pdf is fine for payment evidence, not for profile photos
        let f = file("foto.pdf", Some("application/pdf"), 10);
        assert!(validate(UploadKind::FotoProfil, &f, 1024).is_err());

        let f = file("bukti.jpg", Some("image/jpeg"), 2048);
        assert!(validate(UploadKind::BuktiBayar, &f, 1024).is_err());

        let f = file("bukti.jpg", Some("image/jpeg"), 0);
        assert!(validate(UploadKind::BuktiBayar, &f, 1024).is_err());
    }

    #[test]
    fn stored_filename_is_timestamp_and_user() {
        let user = Uuid::nil();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            stored_filename(user, "png", now, 0),
            "1700000000000-00000000-0000-0000-0000-000000000000.png"
        );
        assert_eq!(
            stored_filename(user, "png", now, 2),
            "1700000000000-00000000-0000-0000-0000-000000000000-2.png"
        );
        assert_eq!(public_url("bukti_bayar/a.png"), "/uploads/bukti_bayar/a.png");
    }

    #[tokio::test]
    async fn dropped_upload_is_removed_from_disk() {
        let dir = temp_upload_dir();
        let upload = StoredUpload::write(&dir, UploadKind::BuktiBayar, Uuid::new_v4(), "png", b"img")
            .await
            .unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert!(upload.relative_path().starts_with("bukti_bayar/"));

        drop(upload);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn kept_upload_survives() {
        let dir = temp_upload_dir();
        let upload = StoredUpload::write(&dir, UploadKind::FotoProfil, Uuid::new_v4(), "jpg", b"img")
            .await
            .unwrap();
        let path = upload.path().to_path_buf();
        let rel = upload.keep();
        assert!(path.exists());
        assert!(rel.starts_with("foto_profil/"));

        remove_stored(&dir, &rel).await;
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn same_millisecond_uploads_never_share_a_file() {
        let dir = temp_upload_dir();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let first = StoredUpload::write_at(&dir, UploadKind::BuktiBayar, user, "png", b"first", now)
            .await
            .unwrap();
        let second = StoredUpload::write_at(&dir, UploadKind::BuktiBayar, user, "png", b"second", now)
            .await
            .unwrap();
        assert_ne!(first.path(), second.path());

        let kept = first.path().to_path_buf();
        first.keep();
        // the failing request's guard only removes its own file
        drop(second);

        assert_eq!(std::fs::read(&kept).unwrap(), b"first");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn remove_stored_ignores_escaping_paths() {
        let dir = temp_upload_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let outside = std::env::temp_dir().join(format!("pesantren-keep-{}", Uuid::new_v4()));
        std::fs::write(&outside, b"x").unwrap();

        let name = outside.file_name().unwrap().to_string_lossy().into_owned();
        remove_stored(&dir, &format!("../{name}")).await;
        assert!(outside.exists());

        let _ = std::fs::remove_file(&outside);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
