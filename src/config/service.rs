use serde::Deserialize;
use std::path::PathBuf;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::*;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// ================================
/// Smappee application + account credentials
/// ================================
#[derive(Clone, Deserialize)]
pub struct AccountConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

// secrets stay out of debug output
impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// ================================
/// REST endpoints
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// authorization endpoint, relative to `base_url`
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), token_path: default_token_path() }
    }
}

impl ApiConfig {
    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.token_path)
    }
}

/// ================================
/// Durable token storage
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// serialized token body (JSON)
    #[serde(default = "default_token_file")]
    pub token_path: PathBuf,
    /// issuance timestamp, seconds since epoch as text
    #[serde(default = "default_token_birth_file")]
    pub token_birth_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { token_path: default_token_file(), token_birth_path: default_token_birth_file() }
    }
}

/// ================================
/// Publish sink
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// every published topic is namespaced under this prefix, e.g. "smappee/"
    #[serde(default)]
    pub base_topic: String,
    #[serde(default = "default_mqtt_client_id")]
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_mqtt_keep_alive")]
    pub keep_alive_seconds: u64,
    /// upper bound for connect + publish + disconnect
    #[serde(default = "default_mqtt_publish_timeout")]
    pub publish_timeout_ms: u64,
}

/// ================================
/// `run` mode
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_seconds: u64,
    pub service_location_id: Option<u64>,
    pub charging_station_serial: Option<String>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval(),
            service_location_id: None,
            charging_station_serial: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_token_file() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_FILE)
}

fn default_token_birth_file() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_BIRTH_FILE)
}

fn default_mqtt_port() -> u16 {
    DEFAULT_MQTT_PORT
}

fn default_mqtt_client_id() -> String {
    DEFAULT_MQTT_CLIENT_ID.to_string()
}

fn default_mqtt_keep_alive() -> u64 {
    DEFAULT_MQTT_KEEP_ALIVE_SECS
}

fn default_mqtt_publish_timeout() -> u64 {
    DEFAULT_MQTT_PUBLISH_TIMEOUT_MS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
