// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Avatar storage in a Cloud Storage bucket.

use crate::error::AppError;
use async_trait::async_trait;
use tokio::sync::OnceCell;

const STORAGE_HOST: &str = "https://storage.googleapis.com";
/// Longest file name kept from an upload.
const MAX_FILE_NAME_LEN: usize = 100;

/// Binary object store addressed by public URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes under `name` and return the public URL.
    async fn upload(&self, name: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<String, AppError>;

    /// Delete the object behind a public URL.
    async fn delete_by_url(&self, url: &str) -> Result<(), AppError>;
}

/// Cloud Storage JSON API client for one bucket.
pub struct GcsBlobStore {
    http: reqwest::Client,
    bucket: String,
    api_root: String,
    auth: OnceCell<gcloud_sdk::GoogleAuthTokenGenerator>,
}

impl GcsBlobStore {
    pub fn new(bucket: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bucket,
            api_root: STORAGE_HOST.to_string(),
            auth: OnceCell::new(),
        }
    }

    fn public_url(&self, name: &str) -> String {
        let path: Vec<_> = name.split('/').map(urlencoding::encode).collect();
        format!("{}/{}/{}", STORAGE_HOST, self.bucket, path.join("/"))
    }

    async fn authorization(&self) -> Result<String, AppError> {
        let generator = self
            .auth
            .get_or_try_init(|| async {
                gcloud_sdk::GoogleAuthTokenGenerator::new(
                    gcloud_sdk::TokenSourceType::Default,
                    gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
                )
                .await
                .map_err(|e| AppError::Storage(format!("Failed to load credentials: {}", e)))
            })
            .await?;

        let token = generator
            .create_token()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to obtain access token: {}", e)))?;
        Ok(token.header_value())
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]` so it can sit in
/// an object name and a URL unchanged.
pub fn safe_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "avatar".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Object name inside `bucket` for a public URL, if the URL points there.
pub fn object_name_from_url(url: &str, bucket: &str) -> Option<String> {
    let prefix = format!("{}/{}/", STORAGE_HOST, bucket);
    let name = url.strip_prefix(&prefix)?;
    let name = name.split(['?', '#']).next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    urlencoding::decode(name).ok().map(|n| n.into_owned())
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_root,
            self.bucket,
            urlencoding::encode(name)
        );

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization().await?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("HTTP {}: {}", status, body)));
        }

        tracing::info!(bucket = %self.bucket, object = name, "Uploaded blob");
        Ok(self.public_url(name))
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
        let name = object_name_from_url(url, &self.bucket)
            .ok_or_else(|| AppError::Storage(format!("Not an object in this bucket: {}", url)))?;

        let response = self
            .http
            .delete(format!(
                "{}/storage/v1/b/{}/o/{}",
                self.api_root,
                self.bucket,
                urlencoding::encode(&name)
            ))
            .header(reqwest::header::AUTHORIZATION, self.authorization().await?)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        // Already gone counts as deleted
        if response.status().is_success() || response.status().as_u16() == 404 {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
    }
}
