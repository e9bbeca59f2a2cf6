use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::{ClientCredentials, Endpoints};
use crate::error::{MailFetchError, Result};

/// Bearer credential for the mail API, valid for one run. There is no refresh.
#[derive(Clone)]
pub struct AuthContext {
    pub access_token: String,
    pub scope: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("access_token", &"<redacted>")
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn acquire_context(&self, credentials: &ClientCredentials) -> Result<AuthContext>;
}

/// OAuth2 client-credential grant against the identity provider's v2.0 token endpoint.
pub struct ClientCredentialAuthenticator {
    client: Client,
    authority_url: Url,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ClientCredentialAuthenticator {
    pub fn new(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            authority_url: endpoints.authority_url.clone(),
            scope: endpoints.scope.clone(),
        }
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_url(&self, organization_id: &str) -> String {
        let mut url = self.authority_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend([organization_id, "oauth2", "v2.0", "token"]);
        }
        url.into()
    }
}

#[async_trait]
impl Authenticator for ClientCredentialAuthenticator {
    #[instrument(skip_all, fields(app_id = %credentials.app_id, tenant = %credentials.organization_id))]
    async fn acquire_context(&self, credentials: &ClientCredentials) -> Result<AuthContext> {
        let url = self.token_url(&credentials.organization_id);
        debug!(%url, scope = %self.scope, "requesting client-credential token");

        let resp = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.app_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MailFetchError::Auth {
                message: format!("token request to {url} failed"),
                source: Some(e),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| MailFetchError::Auth {
            message: "failed to read token response".to_string(),
            source: Some(e),
        })?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(MailFetchError::Auth {
                message: format!("token endpoint returned {status}: {detail}"),
                source: None,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| MailFetchError::Auth {
                message: format!("unexpected token response: {e}"),
                source: None,
            })?;
        let expires_at = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        debug!(?expires_at, "token acquired");

        Ok(AuthContext {
            access_token: token.access_token,
            scope: self.scope.clone(),
            expires_at,
        })
    }
}
