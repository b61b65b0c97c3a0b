use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::token::{Token, TokenContext};
use crate::cache::token_store::FileTokenStore;
use crate::error::AuthError;
use crate::helpers::time::now_i64;
use crate::observability::metrics::get_metrics;
use crate::sources::oauth2::OAuth2Source;

static CACHED_MSG: &'static str = "cached";
static REFRESHED_MSG: &'static str = "refreshed";
static PASSWORD_MSG: &'static str = "password";
static FAILED_MSG: &'static str = "failed";

/// Owns the token lifecycle: load, validate, refresh, re-authenticate, persist.
pub struct TokenManager {
    store: FileTokenStore,
    oauth2: OAuth2Source,
    safety_margin_seconds: u64,
    // load -> decide -> exchange -> persist runs for one caller at a time
    lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: FileTokenStore, oauth2: OAuth2Source, safety_margin_seconds: u64) -> Self {
        Self { store, oauth2, safety_margin_seconds, lock: Mutex::new(()) }
    }

    pub fn store(&self) -> &FileTokenStore {
        &self.store
    }

    /// Return a token that stays valid for at least the safety margin.
    ///
    /// 1. persisted token still valid -> returned without any network call
    /// 2. persisted token expired -> refresh grant
    /// 3. nothing usable or refresh failed -> password grant
    pub async fn acquire_token(&self) -> Result<Token, AuthError> {
        let _guard = self.lock.lock().await;
        let metrics = get_metrics().await;

        if let Some(token_context) = self.store.load().await {
            let now = now_i64();
            if token_context.is_valid_at(now, self.safety_margin_seconds) {
                debug!(
                    "using persisted token, valid until {}",
                    token_context.valid_until(self.safety_margin_seconds)
                );
                metrics.token_acquisitions.with_label_values(&[CACHED_MSG]).inc();
                return Ok(token_context.token);
            }

            info!(
                "persisted token expired at {} (now {}), refreshing",
                token_context.valid_until(self.safety_margin_seconds),
                now
            );
            if token_context.token.refresh_token.is_empty() {
                warn!("persisted token carries no refresh token");
            } else {
                let issued_at = now_i64();
                match self.oauth2.refresh_grant(&token_context.token.refresh_token).await {
                    Ok(token) => return Ok(self.persist(token, issued_at, REFRESHED_MSG).await),
                    Err(err) => warn!("refresh failed, falling back to password grant: {}", err),
                }
            }
        }

        let issued_at = now_i64();
        let token = self.oauth2.password_grant().await.inspect_err(|err| {
            metrics.token_acquisitions.with_label_values(&[FAILED_MSG]).inc();
            error!("could not get a valid token: {}", err);
        })?;
        Ok(self.persist(token, issued_at, PASSWORD_MSG).await)
    }

    /// Access-token string ready for an `Authorization: Bearer` header.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.acquire_token().await.map(|token| token.access_token)
    }

    async fn persist(&self, token: Token, issued_at: i64, outcome: &str) -> Token {
        let metrics = get_metrics().await;
        let token_context = TokenContext::new(token, issued_at);

        // persist failures are logged only, the fresh token is still handed out
        if let Err(err) = self.store.save(&token_context).await {
            error!(
                "could not persist token to '{}': {}",
                self.store.token_path().display(),
                err
            );
        }

        metrics.token_acquisitions.with_label_values(&[outcome]).inc();
        metrics
            .token_valid_until_unix
            .set(token_context.valid_until(self.safety_margin_seconds));
        token_context.token
    }
}
