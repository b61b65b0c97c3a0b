// src/tests/common/mod.rs
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpmock::MockServer;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::api::dispatcher::Dispatcher;
use crate::api::smappee::SmappeeApi;
use crate::cache::token::{Token, TokenContext};
use crate::cache::token_manager::TokenManager;
use crate::cache::token_store::FileTokenStore;
use crate::config::service::{AccountConfig, ApiConfig};
use crate::error::TransportError;
use crate::helpers::time::now_i64;
use crate::sinks::publish::{PublishSink, Topics};
use crate::sources::oauth2::OAuth2Source;

pub const TOKEN_PATH: &str = "/oauth2/token";
pub const BASE_TOPIC: &str = "smappee/";

pub fn build_reqwest_client() -> Client {
    build_reqwest_client_with_timeout(Duration::from_secs(5))
}

pub fn build_reqwest_client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

pub fn account() -> AccountConfig {
    AccountConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        username: "user@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig { base_url: server.base_url(), token_path: TOKEN_PATH.to_string() }
}

pub fn token_store(dir: &TempDir) -> FileTokenStore {
    FileTokenStore::new(dir.path().join("token.json"), dir.path().join("tokenBirth.txt"))
}

pub fn token_manager(server: &MockServer, store: FileTokenStore) -> Arc<TokenManager> {
    token_manager_with_client(server, store, build_reqwest_client())
}

pub fn token_manager_with_client(server: &MockServer, store: FileTokenStore, client: Client) -> Arc<TokenManager> {
    let oauth2 = OAuth2Source::new(client, &api_config(server), account());
    Arc::new(TokenManager::new(store, oauth2, 60))
}

pub fn smappee_api(server: &MockServer, tokens: Arc<TokenManager>, sink: RecordingSink) -> SmappeeApi<RecordingSink> {
    let dispatcher = Dispatcher::new(build_reqwest_client(), server.base_url(), tokens);
    SmappeeApi::new(dispatcher, sink, Topics::new(BASE_TOPIC))
}

/// Authorization endpoint response body.
pub fn token_body(access_token: &str, refresh_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": expires_in,
        "token_type": "bearer"
    })
}

/// Persist a token issued `age_seconds` ago.
pub async fn persist_token(store: &FileTokenStore, access_token: &str, refresh_token: &str, expires_in: u64, age_seconds: i64) {
    let token = Token::new(access_token.to_string(), refresh_token.to_string(), expires_in);
    store
        .save(&TokenContext::new(token, now_i64() - age_seconds))
        .await
        .expect("persist token");
}

pub fn storage_paths(dir: &TempDir) -> (PathBuf, PathBuf) {
    (dir.path().join("token.json"), dir.path().join("tokenBirth.txt"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Published {
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).expect("utf8 payload")
    }
}

/// In-memory publish sink; optionally refuses every publish.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    published: Arc<Mutex<Vec<Published>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self { published: Arc::default(), fail: true }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

impl PublishSink for RecordingSink {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Publish("broker unavailable".to_string()));
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }
}
