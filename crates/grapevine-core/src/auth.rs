// GitHub OAuth web flow with CSRF state. The code exchange always goes
// through the configured proxy.
use grapevine_api::OAuthClient;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{config::AuthConfig, session::SessionStore, Error, Result};

pub struct AuthFlow {
    config: AuthConfig,
    session: SessionStore,
    client: Option<OAuthClient>,
}

impl AuthFlow {
    pub fn new(config: AuthConfig, session: SessionStore) -> Result<Self> {
        let client = match &config.proxy_url {
            Some(url) => Some(OAuthClient::new(url.clone())?),
            None => None,
        };
        Ok(Self {
            config,
            session,
            client,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Start a login: store a fresh state value and return the URL to open
    pub fn begin(&self) -> Result<String> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| Error::ConfigError("auth.client_id is not set".into()))?;

        let state = Uuid::new_v4().to_string();
        if !self.session.set_oauth_state(&state) {
            // Without the stored state the callback could never be verified
            return Err(Error::StorageError("Could not persist OAuth state".into()));
        }

        Ok(OAuthClient::authorize_url(
            client_id,
            &self.config.redirect_uri,
            &self.config.scope,
            &state,
        ))
    }

    /// Finish a login from the redirect's `code` and `state`.
    ///
    /// A missing or different state stops the flow before any request is
    /// made. On success the token is stored in the session and returned.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<String> {
        match self.session.oauth_state() {
            Some(expected) if !state.is_empty() && expected == state => {}
            _ => {
                warn!("OAuth callback state does not match, aborting login");
                return Err(Error::CsrfMismatch);
            }
        }
        // Single use
        self.session.clear_oauth_state();

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::ConfigError("auth.proxy_url is not set".into()))?;

        let token = client.exchange_code(code).await?;
        self.session.set_token(&token);
        info!("Logged in");
        Ok(token)
    }

    pub fn logout(&self) {
        self.session.clear_token();
        self.session.clear_oauth_state();
        info!("Logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::post;
    use axum::{Json, Router};
    use grapevine_store::{MemoryStore, StorageAdapter};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn_proxy(hits: Arc<AtomicUsize>) -> String {
        let app = Router::new().route(
            "/token",
            post(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let code = params.get("code").cloned().unwrap_or_default();
                    Json(json!({ "access_token": format!("token-for-{}", code) }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        format!("http://{address}/token")
    }

    fn flow(proxy_url: Option<String>) -> AuthFlow {
        let config = AuthConfig {
            client_id: Some("client-1".into()),
            proxy_url,
            ..AuthConfig::default()
        };
        let session = SessionStore::new(StorageAdapter::new(Arc::new(MemoryStore::new())));
        AuthFlow::new(config, session).unwrap()
    }

    fn state_param(url: &str) -> String {
        url.split("state=").nth(1).unwrap().to_string()
    }

    #[tokio::test]
    async fn test_full_login() {
        let hits = Arc::new(AtomicUsize::new(0));
        let flow = flow(Some(spawn_proxy(hits.clone()).await));

        let url = flow.begin().unwrap();
        assert!(url.contains("client_id=client-1"));
        let state = state_param(&url);

        let token = flow.handle_callback("abc", &state).await.unwrap();
        assert_eq!(token, "token-for-abc");
        assert_eq!(flow.session().token().as_deref(), Some("token-for-abc"));
        assert_eq!(flow.session().oauth_state(), None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        flow.logout();
        assert!(!flow.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_state_mismatch_is_a_hard_stop() {
        let hits = Arc::new(AtomicUsize::new(0));
        let flow = flow(Some(spawn_proxy(hits.clone()).await));
        flow.begin().unwrap();

        let result = flow.handle_callback("abc", "forged").await;
        assert!(matches!(result, Err(Error::CsrfMismatch)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!flow.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_callback_without_begin_is_rejected() {
        let flow = flow(None);
        let result = flow.handle_callback("abc", "").await;
        assert!(matches!(result, Err(Error::CsrfMismatch)));
    }

    #[tokio::test]
    async fn test_state_cannot_be_replayed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let flow = flow(Some(spawn_proxy(hits).await));
        let state = state_param(&flow.begin().unwrap());

        flow.handle_callback("one", &state).await.unwrap();
        let replay = flow.handle_callback("two", &state).await;
        assert!(matches!(replay, Err(Error::CsrfMismatch)));
    }

    #[test]
    fn test_begin_needs_client_id() {
        let session = SessionStore::new(StorageAdapter::new(Arc::new(MemoryStore::new())));
        let flow = AuthFlow::new(AuthConfig::default(), session).unwrap();
        assert!(matches!(flow.begin(), Err(Error::ConfigError(_))));
    }
}
