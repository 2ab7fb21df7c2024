// Storage module for counsel-review
//
// Session recordings and voice feedback live in an opaque object store with
// two operations: upload a blob under bucket/path, and resolve a public URL
// for playback. A filesystem store backs local use and tests; the HTTP store
// speaks a hosted bucket/path storage API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::{ReviewError, ReviewResult};

/// Bucket holding uploaded session recordings
pub const SESSION_RECORDINGS_BUCKET: &str = "session-recordings";
/// Bucket holding supervisor voice feedback
pub const FEEDBACK_RECORDINGS_BUCKET: &str = "feedback-recordings";

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `bucket`/`path`, overwriting any previous object
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ReviewResult<()>;

    /// Public URL for a stored object
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Object store backed by a local directory tree (`root/bucket/path`)
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, path: &str) -> PathBuf {
        let mut full = self.root.join(bucket);
        // Storage paths use '/' separators regardless of platform
        for part in path.split('/') {
            full.push(part);
        }
        full
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> ReviewResult<()> {
        let full = self.object_path(bucket, path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ReviewError::UploadError(format!("create dir: {}", e)))?;
        }

        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| ReviewError::UploadError(format!("write {}: {}", full.display(), e)))?;

        info!("Stored object {}/{}", bucket, path);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("file://{}", self.object_path(bucket, path).display())
    }
}

/// Object store speaking the hosted storage HTTP API
/// (`{base}/object/{bucket}/{path}` uploads, `/object/public/` reads).
pub struct HttpObjectStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, api_key: &str) -> ReviewResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| ReviewError::UploadError(format!("http client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ReviewResult<()> {
        let url = format!("{}/object/{}/{}", self.base_url, bucket, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReviewError::UploadError("upload timed out".to_string())
                } else {
                    ReviewError::UploadError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Upload to {}/{} failed: {} {}", bucket, path, status, body);
            return Err(ReviewError::UploadError(format!(
                "server returned {}",
                status
            )));
        }

        info!("Uploaded object {}/{}", bucket, path);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, bucket, path)
    }
}

/// Storage path for a session recording upload
pub fn session_recording_path(user_id: &str, session_id: &str, file_name: &str) -> String {
    let name = sanitize_file_name(file_name);
    format!("{}/{}/{}", user_id, session_id, name)
}

/// Storage path for a voice feedback blob; the timestamp keeps re-records
/// from clobbering each other so superseded objects stay addressable
pub fn feedback_recording_path(user_id: &str, session_id: &str) -> String {
    format!(
        "{}/{}/feedback_{}.wav",
        user_id,
        session_id,
        chrono::Utc::now().timestamp_millis()
    )
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    cleaned.replace(['\\', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .upload(
                FEEDBACK_RECORDINGS_BUCKET,
                "u1/s1/feedback_1.wav",
                vec![1, 2, 3],
                "audio/wav",
            )
            .await
            .unwrap();

        let on_disk = dir
            .path()
            .join(FEEDBACK_RECORDINGS_BUCKET)
            .join("u1")
            .join("s1")
            .join("feedback_1.wav");
        assert_eq!(std::fs::read(on_disk).unwrap(), vec![1, 2, 3]);

        let url = store.public_url(FEEDBACK_RECORDINGS_BUCKET, "u1/s1/feedback_1.wav");
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("feedback_1.wav"));
    }

    #[tokio::test]
    async fn test_fs_store_overwrites() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .upload("b", "one.bin", vec![1], "application/octet-stream")
            .await
            .unwrap();
        store
            .upload("b", "one.bin", vec![2, 2], "application/octet-stream")
            .await
            .unwrap();

        let on_disk = dir.path().join("b").join("one.bin");
        assert_eq!(std::fs::read(on_disk).unwrap(), vec![2, 2]);
    }

    #[test]
    fn test_http_store_public_url_shape() {
        let store = HttpObjectStore::new("https://store.example.com/storage/v1/", "key").unwrap();
        assert_eq!(
            store.public_url(SESSION_RECORDINGS_BUCKET, "u/s/rec.wav"),
            "https://store.example.com/storage/v1/object/public/session-recordings/u/s/rec.wav"
        );
    }

    #[test]
    fn test_session_recording_path_strips_directories() {
        let path = session_recording_path("u1", "s1", "../../etc/passwd");
        assert_eq!(path, "u1/s1/passwd");

        let plain = session_recording_path("u1", "s1", "session one.mp3");
        assert_eq!(plain, "u1/s1/session one.mp3");
    }

    #[test]
    fn test_feedback_recording_path_shape() {
        let path = feedback_recording_path("u1", "s1");
        assert!(path.starts_with("u1/s1/feedback_"));
        assert!(path.ends_with(".wav"));
    }
}
