use crate::error::{AppError, AppResult};
use actix_web::web;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::PathBuf;
use uuid::Uuid;

/// Verification photos larger than this are refused.
pub const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Stores a JPEG snapshot and returns its object key.
    async fn put(&self, employee_id: u64, bytes: Vec<u8>) -> AppResult<String>;
}

/// Decodes a camera snapshot sent as plain base64 or as a `data:` URL.
pub fn decode_photo(encoded: &str) -> AppResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::bad_request("Photo is not valid base64"))?;

    if bytes.is_empty() {
        return Err(AppError::bad_request("Photo is empty"));
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::bad_request("Photo exceeds 2 MiB"));
    }

    Ok(bytes)
}

/// Photos kept on the local filesystem under `<root>/<employee_id>/<uuid>.jpg`.
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn put(&self, employee_id: u64, bytes: Vec<u8>) -> AppResult<String> {
        let key = format!("{}/{}.jpg", employee_id, Uuid::new_v4());
        let dir = self.root.join(employee_id.to_string());
        let path = self.root.join(&key);

        web::block(move || {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, bytes)
        })
        .await
        .map_err(|e| AppError::Internal(format!("photo write aborted: {e}")))??;

        tracing::debug!(employee_id, key = %key, "Stored verification photo");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_data_url_base64() {
        assert_eq!(decode_photo("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_photo("data:image/jpeg;base64,aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(matches!(decode_photo("%%%"), Err(AppError::BadRequest(_))));
        assert!(matches!(decode_photo(""), Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn fs_store_writes_under_employee_dir() {
        let root = std::env::temp_dir().join(format!("photos-{}", Uuid::new_v4()));
        let store = FsPhotoStore::new(&root);

        let key = store.put(12, b"jpeg".to_vec()).await.unwrap();

        assert!(key.starts_with("12/"));
        assert_eq!(std::fs::read(root.join(&key)).unwrap(), b"jpeg");
        let _ = std::fs::remove_dir_all(root);
    }
}
