use std::fmt;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::config::service::{AccountConfig, ApiConfig};
use crate::error::AuthError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;

static ERROR_MSG: &'static str = "error";
static STATUS_MSG: &'static str = "status";
static PAYLOAD_MSG: &'static str = "payload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client of the OAuth2 token endpoint (password and refresh grants).
#[derive(Debug, Clone)]
pub struct OAuth2Source {
    client: Client,
    token_url: String,
    account: AccountConfig,
}

impl OAuth2Source {
    pub fn new(client: Client, api: &ApiConfig, account: AccountConfig) -> Self {
        Self { client, token_url: api.token_url(), account }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange the account credentials for a new token.
    pub async fn password_grant(&self) -> Result<Token, AuthError> {
        let form = [
            ("client_id", self.account.client_id.as_str()),
            ("client_secret", self.account.client_secret.as_str()),
            ("username", self.account.username.as_str()),
            ("password", self.account.password.as_str()),
            ("grant_type", GrantType::Password.as_str()),
        ];
        self.exchange(GrantType::Password, &form).await
    }

    /// Exchange a refresh token for a new token.
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let form = [
            ("client_id", self.account.client_id.as_str()),
            ("client_secret", self.account.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", GrantType::RefreshToken.as_str()),
        ];
        self.exchange(GrantType::RefreshToken, &form).await
    }

    async fn exchange(&self, grant: GrantType, form: &[(&str, &str)]) -> Result<Token, AuthError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.token_exchange_requests.with_label_values(&[grant.as_str()]).inc();
        info!("oauth2: '{}' grant against {}", grant, self.token_url);

        let result = self.send(grant, form).await;
        metrics
            .token_exchange_duration
            .with_label_values(&[grant.as_str()])
            .observe(start.elapsed().as_secs_f64());

        result.inspect_err(|err| {
            let reason = match err {
                AuthError::Network(_) => ERROR_MSG,
                AuthError::Rejected { .. } => STATUS_MSG,
                AuthError::MalformedResponse(_) => PAYLOAD_MSG,
            };
            metrics.token_exchange_failures.with_label_values(&[grant.as_str(), reason]).inc();
            warn!("oauth2: '{}' grant failed: {}", grant, err);
        })
    }

    async fn send(&self, grant: GrantType, form: &[(&str, &str)]) -> Result<Token, AuthError> {
        let response = self.client.post(&self.token_url).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected { grant, status: status.as_u16() });
        }

        let body = response.text().await?;
        let token: Token = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(AuthError::MalformedResponse("empty access_token".to_string()));
        }
        debug!("oauth2: '{}' grant issued a token valid for {}s", grant, token.expires_in);
        Ok(token)
    }
}
