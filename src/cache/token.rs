use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token body as returned by the authorization endpoint.
///
/// Only the three named fields are interpreted; everything else the server
/// sends (`token_type`, `scope`, ...) is kept as-is and written back on persist.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// lifetime in seconds, counted from the issuance timestamp
    pub expires_in: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    pub fn new(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self { access_token, refresh_token, expires_in, extra: Map::new() }
    }
}

// token values never reach the logs
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_in", &self.expires_in)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Token paired with the moment it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenContext {
    pub token: Token,
    /// unix seconds
    pub issued_at_unix_ts: i64,
}

impl TokenContext {
    pub fn new(token: Token, issued_at_unix_ts: i64) -> Self {
        Self { token, issued_at_unix_ts }
    }

    /// Last second (exclusive) at which the token is still handed out.
    pub fn valid_until(&self, safety_margin_seconds: u64) -> i64 {
        self.issued_at_unix_ts
            .saturating_add(self.token.expires_in as i64)
            .saturating_sub(safety_margin_seconds as i64)
    }

    /// `issued_at + expires_in - safety_margin > now`
    pub fn is_valid_at(&self, now_unix_ts: i64, safety_margin_seconds: u64) -> bool {
        self.valid_until(safety_margin_seconds) > now_unix_ts
    }
}
