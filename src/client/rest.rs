//! # Vault REST Client
//!
//! Default [`VaultApi`] implementation over the Vault HTTP API v1.
//! Hand-written request/response structs over `reqwest`; no vendor SDK.
//!
//! Endpoints used:
//! - `GET /v1/sys/mounts`, `POST /v1/sys/mounts/{path}`,
//!   `POST /v1/sys/mounts/{path}/tune`, `DELETE /v1/sys/mounts/{path}`
//! - `GET /v1/sys/auth`
//! - `GET|PUT /v1/{path}` for logical reads and writes
//!
//! Requests authenticate with the `X-Vault-Token` header. Connecting and
//! token acquisition are the caller's concern; this client only needs an
//! address and a token that already works.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{ClientError, MountConfig, MountInfo, MountInput, Secret, SecretData, VaultApi};

const TOKEN_HEADER: &str = "X-Vault-Token";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`VaultApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct RestVaultClient {
    http: Client,
    address: String,
    token: String,
}

/// Listing responses wrap the path map in a `data` envelope.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: HashMap<String, MountInfo>,
}

/// Error body shape: `{"errors": ["..."]}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

impl RestVaultClient {
    /// Create a client for the server at `address` (e.g.
    /// `https://vault.example.com:8200`) using `token` for every request.
    pub fn new(
        address: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            address: address.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ClientError> {
        request
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.to_string(),
                source,
            })
    }

    /// Turn a non-success response into [`ClientError::Api`], pulling the
    /// error messages out of the body when there are any.
    async fn api_error(path: &str, response: Response) -> ClientError {
        let status = response.status().as_u16();
        let errors = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.errors)
            .unwrap_or_default();

        ClientError::Api {
            path: path.to_string(),
            status,
            errors,
        }
    }

    async fn list(&self, path: &str) -> Result<HashMap<String, MountInfo>, ClientError> {
        let url = self.url(path);
        let response = self.send(self.http.get(&url), &url).await?;

        if !response.status().is_success() {
            return Err(Self::api_error(path, response).await);
        }

        let listing: ListResponse =
            response
                .json()
                .await
                .map_err(|source| ClientError::Decode { url, source })?;

        Ok(listing.data)
    }

    /// Issue a write-shaped request and discard the response body.
    async fn write_unit(&self, path: &str, request: RequestBuilder) -> Result<(), ClientError> {
        let url = self.url(path);
        let response = self.send(request, &url).await?;

        if !response.status().is_success() {
            return Err(Self::api_error(path, response).await);
        }

        Ok(())
    }
}

#[async_trait]
impl VaultApi for RestVaultClient {
    async fn list_mounts(&self) -> Result<HashMap<String, MountInfo>, ClientError> {
        self.list("sys/mounts").await
    }

    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), ClientError> {
        let mount_path = format!("sys/mounts/{path}");
        let url = self.url(&mount_path);
        self.write_unit(&mount_path, self.http.post(&url).json(input))
            .await
    }

    async fn tune_mount(&self, path: &str, config: &MountConfig) -> Result<(), ClientError> {
        let tune_path = format!("sys/mounts/{path}/tune");
        let url = self.url(&tune_path);
        self.write_unit(&tune_path, self.http.post(&url).json(config))
            .await
    }

    async fn unmount(&self, path: &str) -> Result<(), ClientError> {
        let mount_path = format!("sys/mounts/{path}");
        let url = self.url(&mount_path);
        self.write_unit(&mount_path, self.http.delete(&url)).await
    }

    async fn list_auth(&self) -> Result<HashMap<String, MountInfo>, ClientError> {
        self.list("sys/auth").await
    }

    async fn read(&self, path: &str) -> Result<Option<Secret>, ClientError> {
        let url = self.url(path);
        let response = self.send(self.http.get(&url), &url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(path, response).await);
        }

        let secret: Secret =
            response
                .json()
                .await
                .map_err(|source| ClientError::Decode { url, source })?;

        Ok(Some(secret))
    }

    async fn write(
        &self,
        path: &str,
        data: Option<&SecretData>,
    ) -> Result<Option<Secret>, ClientError> {
        let url = self.url(path);
        let mut request = self.http.put(&url);
        if let Some(data) = data {
            request = request.json(data);
        }

        let response = self.send(request, &url).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Self::api_error(path, response).await);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let secret: Secret =
            response
                .json()
                .await
                .map_err(|source| ClientError::Decode { url, source })?;

        Ok(Some(secret))
    }

    async fn status(&self, path: &str) -> Result<u16, ClientError> {
        let url = self.url(path);
        let response = self.send(self.http.get(&url), &url).await?;
        let status = response.status().as_u16();
        debug!("status probe for {path} returned {status}");

        Ok(status)
    }
}
