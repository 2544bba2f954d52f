use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

/// A file received in a multipart request, not yet written to disk.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub url: String,
    pub key: String,
}

/// Stages incoming files in a local temp directory and forwards them to the
/// hosted object store.
pub struct MediaUploader {
    storage: Arc<dyn StorageClient>,
    temp_dir: PathBuf,
}

impl MediaUploader {
    pub fn new(storage: Arc<dyn StorageClient>, temp_dir: PathBuf) -> Self {
        Self { storage, temp_dir }
    }

    /// Writes `file` under the temp directory and returns its local path.
    pub async fn stage(&self, file: &PendingFile) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| format!("create temp dir {}", self.temp_dir.display()))?;

        let ext = file
            .file_name
            .as_deref()
            .and_then(ext_from_file_name)
            .or_else(|| {
                file.content_type
                    .as_deref()
                    .and_then(ext_from_mime)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "bin".to_string());

        let path = self.temp_dir.join(format!("{}.{}", Uuid::new_v4(), ext));
        tokio::fs::write(&path, &file.body)
            .await
            .with_context(|| format!("write temp file {}", path.display()))?;
        Ok(path)
    }

    /// Uploads the file at `local_path`. The local file is removed afterwards,
    /// whether or not the upload succeeded.
    pub async fn upload(&self, local_path: &Path) -> anyhow::Result<UploadedMedia> {
        let result = self.put_local_file(local_path).await;
        match &result {
            Ok(media) => info!(key = %media.key, url = %media.url, "file uploaded"),
            Err(e) => warn!(error = %e, path = %local_path.display(), "upload failed"),
        }
        remove_temp(local_path).await;
        result
    }

    async fn put_local_file(&self, local_path: &Path) -> anyhow::Result<UploadedMedia> {
        let body = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("read {}", local_path.display()))?;

        let ext = local_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".to_string());
        let key = format!("media/{}.{}", Uuid::new_v4(), ext);

        self.storage
            .put_object(&key, Bytes::from(body), mime_from_ext(&ext))
            .await
            .with_context(|| format!("put_object {}", key))?;

        Ok(UploadedMedia {
            url: self.storage.object_url(&key),
            key,
        })
    }
}

async fn remove_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %e, path = %path.display(), "failed to remove temp file");
        }
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        "video/mp4" => Some("mp4"),
        _ => None,
    }
}

fn mime_from_ext(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Extension of a client-supplied file name, only if it is short and alphanumeric.
fn ext_from_file_name(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    let ok = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}
