use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// What the identity provider hands back for a valid code.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub user_id: String,
    pub access_token: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Rejected(String),

    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed identity provider response: {0}")]
    Malformed(String),
}

/// One-time authorization code exchange.
///
/// `Ok(None)` means the provider accepted the request but returned no usable
/// session. Codes are single-use; replaying one must come back as an error.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<Option<ProviderSession>, ProviderError>;
}

/// Provider reached over HTTP with a GoTrue-style token endpoint.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    auth_code: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    user: Option<ProviderUser>,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<Option<ProviderSession>, ProviderError> {
        let url = format!(
            "{}/token?grant_type=authorization_code",
            self.base_url.trim_end_matches('/')
        );

        let mut request = self.client.post(&url).json(&TokenRequest { auth_code: code });
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("Identity provider answered {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let message = rejection_message(&body).unwrap_or_else(|| status.to_string());
            return Err(ProviderError::Rejected(message));
        }

        session_from_body(&body)
    }
}

/// Pulls a human-readable reason out of an error body, trying the field names
/// the common providers use.
fn rejection_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn session_from_body(body: &[u8]) -> Result<Option<ProviderSession>, ProviderError> {
    let parsed: TokenResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let user_id = parsed.user.and_then(|u| u.id).filter(|id| !id.is_empty());
    let access_token = parsed.access_token.filter(|t| !t.is_empty());

    Ok(match (user_id, access_token) {
        (Some(user_id), Some(access_token)) => Some(ProviderSession { user_id, access_token }),
        _ => None,
    })
}
