// OAuth code exchange through the token proxy
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Token proxy rejected the request with status {0}")]
    ProxyStatus(u16),

    #[error("GitHub refused the code: {error} ({description})")]
    Provider { error: String, description: String },

    #[error("Token proxy answered without an access token")]
    MissingToken,

    #[error("Authorization code must not be empty")]
    EmptyCode,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OAuthError>;

/// What the proxy sends back. Exactly one of the two shapes is filled in.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(OAuthError::Provider {
                error,
                description: self.error_description.unwrap_or_default(),
            });
        }

        self.access_token
            .filter(|t| !t.is_empty())
            .ok_or(OAuthError::MissingToken)
    }
}

/// Exchanges GitHub OAuth codes for tokens.
///
/// The exchange always goes through a server-side proxy that holds the client
/// secret; this client never sees or sends the secret itself.
pub struct OAuthClient {
    client: reqwest::Client,
    proxy_url: String,
}

impl OAuthClient {
    pub fn new(proxy_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Grapevine/0.1.0")
            .build()?;

        Ok(Self {
            client,
            proxy_url,
        })
    }

    /// URL the user opens to grant access. `state` must be stored and
    /// checked again on the callback.
    pub fn authorize_url(client_id: &str, redirect_uri: &str, scope: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            GITHUB_AUTHORIZE_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(state),
        )
    }

    /// `POST {proxy}?code={code}` and hand back the access token
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let code = code.trim();
        if code.is_empty() {
            return Err(OAuthError::EmptyCode);
        }

        let separator = if self.proxy_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}code={}", self.proxy_url, separator, urlencoding::encode(code));

        // Codes are single use, so a failed exchange is never retried
        debug!("Exchanging OAuth code through proxy");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // The proxy forwards GitHub's error payload on 4xx, so try to read it
        // before giving up on the status alone.
        let parsed = match serde_json::from_str::<TokenResponse>(&body) {
            Ok(parsed) if parsed.error.is_some() || status.is_success() => parsed,
            Ok(_) => return Err(OAuthError::ProxyStatus(status.as_u16())),
            Err(_) if !status.is_success() => {
                return Err(OAuthError::ProxyStatus(status.as_u16()))
            }
            Err(e) => return Err(OAuthError::ParseError(e)),
        };

        parsed.into_token().inspect_err(|e| warn!("OAuth exchange failed: {}", e))
    }
}
