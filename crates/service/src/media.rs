//! Image hosting for listing pictures.

use async_trait::async_trait;
use chrono::Utc;
use configs::CloudinaryConfig;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image host not configured")]
    NotConfigured,
    #[error("image host request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image host rejected request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload `source` (URL or data URI) into `folder`; returns the secure URL.
    async fn upload(&self, source: &str, folder: &str) -> Result<String, MediaError>;
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

/// `<folder>/<last path segment without extension>`
pub fn public_id_from_url(url: &str, folder: &str) -> Option<String> {
    let last = url.split('?').next()?.rsplit('/').next()?;
    let stem = last.split('.').next()?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}/{}", folder, stem))
}

/// Hex SHA-256 over `k=v&k=v` (keys sorted) followed by the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: Option<String>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Cloudinary upload API with signed requests.
pub struct CloudinaryHost {
    http: reqwest::Client,
    cfg: CloudinaryConfig,
    api_base: String,
}

impl CloudinaryHost {
    pub fn new(cfg: CloudinaryConfig) -> Self {
        Self::with_base(cfg, "https://api.cloudinary.com/v1_1")
    }

    pub fn with_base(cfg: CloudinaryConfig, api_base: &str) -> Self {
        Self { http: reqwest::Client::new(), cfg, api_base: api_base.trim_end_matches('/').to_string() }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.cfg.cloud_name, action)
    }

    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        params.push(("timestamp", Utc::now().timestamp().to_string()));
        let signature = sign_params(&params, &self.cfg.api_secret);
        params.push(("api_key", self.cfg.api_key.clone()));
        params.push(("signature_algorithm", "sha256".into()));
        params.push(("signature", signature));
        params
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, source: &str, folder: &str) -> Result<String, MediaError> {
        let mut form = self.signed_form(vec![("folder", folder.to_string())]);
        form.push(("file", source.to_string()));
        let body: UploadResponse = self.http.post(self.endpoint("upload")).form(&form).send().await?.json().await?;
        if let Some(err) = body.error {
            return Err(MediaError::Rejected(err.message));
        }
        let url = body.secure_url.ok_or_else(|| MediaError::Rejected("missing secure_url".into()))?;
        debug!(%url, "image uploaded");
        Ok(url)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let form = self.signed_form(vec![("public_id", public_id.to_string())]);
        let body: DestroyResponse = self.http.post(self.endpoint("destroy")).form(&form).send().await?.json().await?;
        if let Some(err) = body.error {
            return Err(MediaError::Rejected(err.message));
        }
        match body.result.as_deref() {
            Some("ok") | Some("not found") => Ok(()),
            other => Err(MediaError::Rejected(format!("destroy result {:?}", other))),
        }
    }
}

/// Used when no image host is configured; every call fails.
#[derive(Debug, Default)]
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _source: &str, _folder: &str) -> Result<String, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn destroy(&self, _public_id: &str) -> Result<(), MediaError> {
        Err(MediaError::NotConfigured)
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Returns deterministic URLs and records destroyed ids.
    #[derive(Default)]
    pub struct RecordingImageHost {
        uploaded: Mutex<Vec<String>>,
        destroyed: Mutex<Vec<String>>,
    }

    impl RecordingImageHost {
        pub fn uploaded(&self) -> Vec<String> { self.uploaded.lock().unwrap().clone() }
        pub fn destroyed(&self) -> Vec<String> { self.destroyed.lock().unwrap().clone() }
    }

    #[async_trait]
    impl ImageHost for RecordingImageHost {
        async fn upload(&self, source: &str, folder: &str) -> Result<String, MediaError> {
            let mut uploaded = self.uploaded.lock().unwrap();
            uploaded.push(source.to_string());
            Ok(format!("https://images.test/{}/img{}.jpg", folder, uploaded.len()))
        }

        async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
            self.destroyed.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_strips_extension_and_query() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1/services/abc123.jpg", "services").as_deref(),
            Some("services/abc123")
        );
        assert_eq!(public_id_from_url("https://x/y/pic.png?v=2", "services").as_deref(), Some("services/pic"));
        assert_eq!(public_id_from_url("https://x/y/", "services"), None);
    }

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        let a = sign_params(&[("timestamp", "1".into()), ("folder", "services".into())], "secret");
        let b = sign_params(&[("folder", "services".into()), ("timestamp", "1".into())], "secret");
        assert_eq!(a, b);
        let expected = hex::encode(Sha256::digest(b"folder=services&timestamp=1secret"));
        assert_eq!(a, expected);
    }

    #[tokio::test]
    async fn disabled_host_refuses() {
        assert!(matches!(DisabledImageHost.upload("x", "services").await, Err(MediaError::NotConfigured)));
    }
}
