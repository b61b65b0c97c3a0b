//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks credentials, endpoint URLs, storage paths, MQTT and poll settings

use tracing::{error, info};

use crate::config::service::{AccountConfig, ApiConfig, MqttConfig, PollConfig, ServiceConfig, StorageConfig};
use crate::config::settings::SettingsConfig;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_account(&cfg.account, &mut errors);
    validate_api(&cfg.api, &mut errors);
    validate_storage(&cfg.storage, &mut errors);
    validate_mqtt(&cfg.mqtt, &mut errors);
    validate_poll(&cfg.poll, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.http_timeout_ms == 0 {
        errors.push("settings.http_timeout_ms must be > 0".to_string());
    }
    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' is not a valid port",
            settings.server.port
        ));
    }
    if let Some(logging) = &settings.logging {
        let level = logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            errors.push(format!("settings.logging.level '{}' is not supported", logging.level));
        }
    }
}

fn validate_account(account: &AccountConfig, errors: &mut Vec<String>) {
    let fields = [
        ("client_id", &account.client_id),
        ("client_secret", &account.client_secret),
        ("username", &account.username),
        ("password", &account.password),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            errors.push(format!("account.{} must not be empty", name));
        }
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    if !(api.base_url.starts_with("http://") || api.base_url.starts_with("https://")) {
        errors.push(format!(
            "api.base_url '{}' must start with http:// or https://",
            api.base_url
        ));
    }
    if !api.token_path.starts_with('/') {
        errors.push(format!("api.token_path '{}' must start with '/'", api.token_path));
    }
}

fn validate_storage(storage: &StorageConfig, errors: &mut Vec<String>) {
    if storage.token_path.as_os_str().is_empty() {
        errors.push("storage.token_path must not be empty".to_string());
    }
    if storage.token_birth_path.as_os_str().is_empty() {
        errors.push("storage.token_birth_path must not be empty".to_string());
    }
    if !storage.token_path.as_os_str().is_empty() && storage.token_path == storage.token_birth_path {
        errors.push(format!(
            "storage.token_path and storage.token_birth_path both point to '{}'",
            storage.token_path.display()
        ));
    }
}

fn validate_mqtt(mqtt: &MqttConfig, errors: &mut Vec<String>) {
    if mqtt.host.trim().is_empty() {
        errors.push("mqtt.host must not be empty".to_string());
    }
    if mqtt.port == 0 {
        errors.push("mqtt.port must be > 0".to_string());
    }
    if mqtt.client_id.trim().is_empty() {
        errors.push("mqtt.client_id must not be empty".to_string());
    }
    if mqtt.base_topic.contains('#') || mqtt.base_topic.contains('+') {
        errors.push(format!(
            "mqtt.base_topic '{}' must not contain wildcards",
            mqtt.base_topic
        ));
    }
    if mqtt.password.is_some() && mqtt.username.is_none() {
        errors.push("mqtt.password requires mqtt.username".to_string());
    }
    if mqtt.publish_timeout_ms == 0 {
        errors.push("mqtt.publish_timeout_ms must be > 0".to_string());
    }
}

fn validate_poll(poll: &PollConfig, errors: &mut Vec<String>) {
    if poll.interval_seconds == 0 {
        errors.push("poll.interval_seconds must be > 0".to_string());
    }
    if let Some(serial) = &poll.charging_station_serial {
        if serial.trim().is_empty() {
            errors.push("poll.charging_station_serial must not be empty when set".to_string());
        }
    }
}
