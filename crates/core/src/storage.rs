//! Durable Report Storage
//!
//! The finished report is handed to a [`ReportStore`] exactly once per session.
//! Storage is best-effort from the session's point of view: the caller logs a
//! failed `put` and carries on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// A blob store that accepts one object per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str)
    -> Result<()>;
}

/// Writes reports under `<root>/<bucket>/<key>` on the local filesystem.
pub struct LocalReportStore {
    root: PathBuf,
}

impl LocalReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ReportStore for LocalReportStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(key);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Report written to local store");
        Ok(())
    }
}

/// Uploads reports with an HTTP `PUT` to `<endpoint>/<bucket>/<key>`, as accepted
/// by path-style S3-compatible object stores.
pub struct HttpReportStore {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpReportStore {
    /// Creates a new HTTP store.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the object store, without a trailing bucket.
    /// * `bearer_token` - Optional token sent as `Authorization: Bearer <token>`.
    pub fn new(endpoint: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }
}

#[async_trait]
impl ReportStore for HttpReportStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.object_url(bucket, key);
        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .with_context(|| format!("Failed to reach object store at {}", url))?
            .error_for_status()
            .with_context(|| format!("Object store rejected upload of {}", key))?;
        debug!(%url, "Report uploaded to object store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_writes_bucket_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReportStore::new(dir.path());

        store
            .put(
                "englishly-reports",
                "english_feedback_report_room-1.json",
                "{\"ok\":true}".as_bytes().to_vec(),
                "application/json",
            )
            .await
            .unwrap();

        let written = std::fs::read_to_string(
            dir.path()
                .join("englishly-reports")
                .join("english_feedback_report_room-1.json"),
        )
        .unwrap();
        assert_eq!(written, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_local_store_reports_unwritable_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let store = LocalReportStore::new(&file);
        let result = store
            .put("bucket", "key.json", Vec::new(), "application/json")
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_http_store_object_url() {
        let store = HttpReportStore::new("https://objects.example.com/", None);
        assert_eq!(
            store.object_url("englishly-reports", "english_feedback_report_r.json"),
            "https://objects.example.com/englishly-reports/english_feedback_report_r.json"
        );
    }
}
