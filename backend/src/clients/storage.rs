//! Object storage over HTTP
//!
//! Speaks the storage REST dialect of the hosted backend:
//! `POST/DELETE {base}/object/{bucket}/{path}` with a service key, and public
//! reads at `{base}/object/public/{bucket}/{path}`.

use super::{build_http_client, reject_unless_success, transport_error, ObjectStorage};
use crate::config::StorageConfig;
use async_trait::async_trait;
use nutriscan_shared::errors::{PipelineError, UpstreamService};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

const SERVICE: UpstreamService = UpstreamService::ObjectStorage;

pub struct HttpObjectStorage {
    base_url: Option<String>,
    bucket: String,
    service_key: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            base_url: config
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
            client: build_http_client(config.timeout())?,
        })
    }

    fn credentials(&self) -> Result<(&str, &str), PipelineError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| PipelineError::Configuration("storage base URL is not configured".to_string()))?;
        let key = self
            .service_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .ok_or_else(|| PipelineError::Configuration("storage service key is not configured".to_string()))?;
        Ok((base, key))
    }

    fn public_prefix(&self) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/object/public/{}/", base, self.bucket))
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, PipelineError> {
        let (base, key) = self.credentials()?;
        let url = format!("{}/object/{}/{}", base, self.bucket, path);
        debug!(path = %path, size = bytes.len(), "Uploading object");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        reject_unless_success(SERVICE, response).await?;

        Ok(format!("{}/object/public/{}/{}", base, self.bucket, path))
    }

    async fn delete(&self, path: &str) -> Result<(), PipelineError> {
        let (base, key) = self.credentials()?;
        let url = format!("{}/object/{}/{}", base, self.bucket, path);
        debug!(path = %path, "Deleting object");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        reject_unless_success(SERVICE, response).await?;
        Ok(())
    }

    fn object_path_from_url(&self, url: &str) -> Option<String> {
        let prefix = self.public_prefix()?;
        url.strip_prefix(&prefix)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }
}
