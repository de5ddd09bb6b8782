//! Credential shim: turns whatever the environment provides into one bearer token per store.
//!
//! Tokens are fetched once at startup and used for the whole run. Nothing here refreshes
//! a token mid-batch.

use std::env;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

pub const OAUTH_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const METADATA_TOKEN_ENDPOINT: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const STORAGE_WRITE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

#[derive(Clone)]
pub enum Credentials {
    AccessToken(String),
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    /// Ask the compute metadata server for the default service account's token.
    MetadataServer,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Credentials::RefreshToken { client_id, .. } => f
                .debug_struct("RefreshToken")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::MetadataServer => f.write_str("MetadataServer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint {endpoint} returned HTTP {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Where tokens are minted. Overridable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct TokenEndpoints {
    pub oauth: String,
    pub metadata: String,
}

impl Default for TokenEndpoints {
    fn default() -> Self {
        Self {
            oauth: OAUTH_TOKEN_ENDPOINT.to_string(),
            metadata: METADATA_TOKEN_ENDPOINT.to_string(),
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Credentials {
    /// `DRIVE_ACCESS_TOKEN`, else the `OAUTH_CLIENT_ID` / `OAUTH_CLIENT_SECRET` /
    /// `OAUTH_REFRESH_TOKEN` trio, else the metadata server.
    pub fn drive_from_env() -> Self {
        if let Some(token) = var("DRIVE_ACCESS_TOKEN") {
            return Credentials::AccessToken(token);
        }
        match (
            var("OAUTH_CLIENT_ID"),
            var("OAUTH_CLIENT_SECRET"),
            var("OAUTH_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Credentials::RefreshToken {
                    client_id,
                    client_secret,
                    refresh_token,
                }
            }
            _ => Credentials::MetadataServer,
        }
    }

    /// `GCS_ACCESS_TOKEN`, else the metadata server.
    pub fn bucket_from_env() -> Self {
        var("GCS_ACCESS_TOKEN")
            .map(Credentials::AccessToken)
            .unwrap_or(Credentials::MetadataServer)
    }

    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        scope: &str,
        endpoints: &TokenEndpoints,
    ) -> Result<String, AuthError> {
        let (endpoint, request) = match self {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => (
                &endpoints.oauth,
                http.post(&endpoints.oauth).form(&[
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ]),
            ),
            Credentials::MetadataServer => (
                &endpoints.metadata,
                http.get(&endpoints.metadata)
                    .header("Metadata-Flavor", "Google")
                    .query(&[("scopes", scope)]),
            ),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%endpoint, status = status.as_u16(), "Token request rejected");
            return Err(AuthError::Rejected {
                endpoint: endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        info!(%endpoint, "Access token acquired");
        Ok(token.access_token)
    }
}
