//! Google Drive v3 client.
//!
//! Every upload is four requests:
//!
//! ```text
//! POST {token_url}                                  refresh token → access token
//! POST {api_base}/upload/drive/v3/files             multipart/related, fields=id
//! POST {token_url}                                  refresh token → access token
//! POST {api_base}/drive/v3/files/{id}/permissions   reader / anyone
//! ```
//!
//! `put` and `grant_public_read` are retried independently, so each one
//! exchanges the refresh token itself. Access tokens are never cached. Non-2xx responses
//! are reported with their real status and body.

use super::{ObjectStore, UploadError};
use crate::config::DriveConfig;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const PUBLIC_URL_BASE: &str = "https://drive.google.com/uc?id=";
const THUMBNAIL_URL_BASE: &str = "https://drive.google.com/thumbnail?id=";

/// OAuth client credentials plus a long-lived refresh token.
#[derive(Clone)]
pub struct DriveCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for DriveCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl DriveCredentials {
    /// Read credentials from the environment variables named in `config`.
    pub fn from_env(config: &DriveConfig) -> Result<Self, UploadError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`, which maps a variable name to
    /// its value.
    pub fn resolve(
        config: &DriveConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, UploadError> {
        Ok(Self {
            client_id: required(&lookup, &config.client_id_env)?,
            client_secret: required(&lookup, &config.client_secret_env)?,
            refresh_token: required(&lookup, &config.refresh_token_env)?,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, UploadError> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| UploadError::Config(format!("environment variable {name} is not set")))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct FileResponse {
    id: String,
}

/// Uploads into one Drive folder.
pub struct DriveStore {
    client: Client,
    credentials: DriveCredentials,
    folder_id: String,
    api_base: String,
    token_url: String,
}

impl DriveStore {
    pub fn new(
        client: Client,
        credentials: DriveCredentials,
        folder_id: impl Into<String>,
        api_base: &str,
        token_url: &str,
    ) -> Self {
        Self {
            client,
            credentials,
            folder_id: folder_id.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
        }
    }

    /// Build from config, reading secrets and the folder id from the
    /// environment.
    pub fn from_config(config: &DriveConfig, timeout_secs: u64) -> Result<Self, UploadError> {
        let credentials = DriveCredentials::from_env(config)?;
        let folder_id = required(&|name: &str| std::env::var(name).ok(), &config.folder_id_env)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self::new(
            client,
            credentials,
            folder_id,
            &config.api_base,
            &config.token_url,
        ))
    }

    fn access_token(&self) -> Result<String, UploadError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()?;
        let token: TokenResponse = parse_json(check_status(resp, "token refresh")?, "token refresh")?;
        Ok(token.access_token)
    }
}

/// Build a `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related(metadata: &serde_json::Value, bytes: &[u8], mime_type: &str) -> (String, Vec<u8>) {
    let boundary = format!("storefront-{}", Uuid::new_v4().simple());
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/related; boundary={boundary}"), body)
}

fn check_status(resp: Response, during: &'static str) -> Result<Response, UploadError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(UploadError::Status {
        during,
        status: status.as_u16(),
        body,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    resp: Response,
    during: &'static str,
) -> Result<T, UploadError> {
    let text = resp.text()?;
    serde_json::from_str(&text).map_err(|e| UploadError::Response {
        during,
        message: e.to_string(),
    })
}

impl ObjectStore for DriveStore {
    fn put(&self, name: &str, bytes: &[u8], mime_type: &str) -> Result<String, UploadError> {
        let token = self.access_token()?;
        let metadata = json!({
            "name": name,
            "parents": [self.folder_id],
            "mimeType": mime_type,
        });
        let (content_type, body) = multipart_related(&metadata, bytes, mime_type);

        debug!(name, size = bytes.len(), "Uploading to Drive");
        let resp = self
            .client
            .post(format!("{}/upload/drive/v3/files", self.api_base))
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()?;
        let file: FileResponse = parse_json(check_status(resp, "upload")?, "upload")?;
        Ok(file.id)
    }

    fn grant_public_read(&self, remote_id: &str) -> Result<(), UploadError> {
        let token = self.access_token()?;
        let resp = self
            .client
            .post(format!(
                "{}/drive/v3/files/{remote_id}/permissions",
                self.api_base
            ))
            .bearer_auth(&token)
            .json(&json!({"role": "reader", "type": "anyone"}))
            .send()?;
        check_status(resp, "permission grant")?;
        Ok(())
    }

    fn public_url(&self, remote_id: &str) -> String {
        format!("{PUBLIC_URL_BASE}{remote_id}")
    }

    fn thumbnail_url(&self, remote_id: &str, width: u32) -> String {
        format!("{THUMBNAIL_URL_BASE}{remote_id}&sz=w{width}")
    }
}
