use std::path::Path;

use anyhow::Context;

use crate::{
    api::{media_file_name, now, BlobPath, MediaCategory, MediaType, Uuid},
    Backend,
};

#[derive(Clone)]
pub struct MediaRepository(Backend);

impl MediaRepository {
    pub fn new(backend: Backend) -> MediaRepository {
        MediaRepository(backend)
    }

    /// Fresh blob name for every call, even for the same local file
    pub fn generate_media_file_name(name: &str, media_type: MediaType) -> String {
        media_file_name(name, media_type, now(), Uuid::new_v4())
    }

    /// Uploads the local file and returns its download uri
    pub async fn upload(
        &self,
        category: MediaCategory,
        file_name: &str,
        local_path: &Path,
    ) -> anyhow::Result<String> {
        let bytes = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("reading media file {local_path:?}"))?;
        let path = BlobPath::new(category, file_name);
        let uri = self
            .0
            .storage
            .upload(&path, bytes)
            .await
            .with_context(|| format!("uploading {path}"))?;
        tracing::debug!(%path, "uploaded media");
        Ok(uri)
    }

    /// Same as `upload`, for uploads whose failure must not fail the caller
    pub async fn upload_or_log(
        &self,
        category: MediaCategory,
        file_name: &str,
        local_path: &Path,
    ) -> Option<String> {
        match self.upload(category, file_name, local_path).await {
            Ok(uri) => Some(uri),
            Err(error) => {
                tracing::warn!(file_name, "media upload failed: {error:#}");
                None
            }
        }
    }

    pub async fn download_uri(&self, category: MediaCategory, file_name: &str) -> anyhow::Result<String> {
        let path = BlobPath::new(category, file_name);
        self.0
            .storage
            .download_uri(&path)
            .await
            .with_context(|| format!("resolving download uri of {path}"))
    }

    pub async fn delete(&self, category: MediaCategory, file_name: &str) -> anyhow::Result<()> {
        let path = BlobPath::new(category, file_name);
        self.0
            .storage
            .delete(&path)
            .await
            .with_context(|| format!("deleting {path}"))
    }
}

/// Final path component, used as the base of generated media names
pub(crate) fn local_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
