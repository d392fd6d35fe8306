//! Google Cloud Storage
//!
//! Artifacts are sent with the JSON API's simple media upload, one request per
//! file, and named after their local path (so `bin/app-1.0-linux-amd64` ends up
//! at `gs://<bucket>/bin/app-1.0-linux-amd64`).

use axoasset::LocalAsset;
use axoprocess::Cmd;
use camino::{Utf8Component, Utf8Path};
use itertools::Itertools;
use reqwest::header::CONTENT_TYPE;
use tracing::info;

use super::{UploadedUrls, Uploader};
use crate::{
    build::BuildResults,
    errors::{ReleaseError, ReleaseResult},
};

/// Where uploads go unless told otherwise
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
/// Where public URLs point
pub const PUBLIC_HOST: &str = "https://storage.googleapis.com";
/// An access token to use instead of asking gcloud for one
pub const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Uploads to one bucket
#[derive(Debug, Clone)]
pub struct GcsUploader {
    bucket: String,
    endpoint: String,
    token: Option<String>,
    client: reqwest::blocking::Client,
}

impl GcsUploader {
    /// Upload to `bucket`
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            token: None,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Talk to a different server (an emulator, for instance)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Send requests with this client
    pub fn with_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.client = client;
        self
    }

    /// Use this token instead of looking one up
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The bucket being uploaded to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn access_token(&self) -> ReleaseResult<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_owned());
            }
        }
        let output = Cmd::new("gcloud", "get an access token for Google Cloud Storage")
            .arg("auth")
            .arg("print-access-token")
            .output()
            .map_err(|details| ReleaseError::UploadCredentials { details })?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    fn upload_one(&self, path: &Utf8Path, token: &str) -> ReleaseResult<String> {
        let object = object_name(path);
        let contents = LocalAsset::load_bytes(path)?;
        info!("uploading {path} to gs://{}/{object}", self.bucket);

        let upload_url = format!("{}/upload/storage/v1/b/{}/o", self.endpoint, self.bucket);
        let response = self
            .client
            .post(upload_url)
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(contents)
            .send()
            .map_err(|details| ReleaseError::Upload {
                path: path.to_owned(),
                bucket: self.bucket.clone(),
                details,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::UploadRejected {
                path: path.to_owned(),
                bucket: self.bucket.clone(),
                status,
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(public_url(&self.bucket, &object))
    }
}

impl Uploader for GcsUploader {
    fn upload(&self, artifacts: &BuildResults) -> ReleaseResult<UploadedUrls> {
        let mut urls = UploadedUrls::new();
        if artifacts.is_empty() {
            return Ok(urls);
        }
        let token = self.access_token()?;
        for path in artifacts.keys() {
            let url = self.upload_one(path, &token)?;
            eprintln!("  {url}");
            urls.insert(path.clone(), url);
        }
        Ok(urls)
    }
}

/// The object an output path is stored as: `/`-separated, relative
pub fn object_name(path: &Utf8Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Utf8Component::Normal(part) => Some(part),
            Utf8Component::ParentDir => Some(".."),
            Utf8Component::Prefix(_) | Utf8Component::RootDir | Utf8Component::CurDir => None,
        })
        .join("/")
}

/// The public URL of an object
pub fn public_url(bucket: &str, object: &str) -> String {
    format!("{PUBLIC_HOST}/{bucket}/{object}")
}
