//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_API_BASE_URL: &str = "https://app1pub.smappee.net/dev/v3";
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";

pub const DEFAULT_TOKEN_FILE: &str = "./token.json";
pub const DEFAULT_TOKEN_BIRTH_FILE: &str = "./tokenBirth.txt";

pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_MQTT_CLIENT_ID: &str = "smappee-agent";
pub const DEFAULT_MQTT_KEEP_ALIVE_SECS: u64 = 30;
pub const DEFAULT_MQTT_PUBLISH_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

// Published topics, relative to mqtt.base_topic
pub const TOPIC_CONSUMPTIONS: &str = "consumptions";
pub const TOPIC_CURRENT_CHARGING_SESSION: &str = "currentChargingSession";

// Published instead of an empty result
pub const NO_CONSUMPTIONS: &str = "no consumptions";
pub const NO_SESSION: &str = "no session";

/// Lower bound of the charging session search range (UTC ms).
pub const CHARGING_SESSION_RANGE_START_MS: &str = "1635721200000";
pub const DEFAULT_EVENTS_MAX_NUMBER: u32 = 10;
