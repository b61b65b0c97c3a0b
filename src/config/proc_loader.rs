use std::path::Path;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::service::ServiceConfig;
use crate::config::proc_validator;
use crate::observability::metrics::get_metrics;
use anyhow::{anyhow, Result};
use regex::Regex;
use serde_yaml::Value;
use tracing::{debug, error};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("cannot read config '{}': {}", path.display(), e))?;

    let expanded = expand_env_in_yaml(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_validation_errors.inc();
        })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .map_err(|errors| {
            metrics.config_validation_errors.inc_by(errors.len() as u64);
            anyhow!("config is not valid: {}", errors.join("; "))
        })?;

    Ok(service_config)
}

/// Expand placeholders inside the parsed document's scalar values only, so
/// substituted text is never re-read as YAML syntax (`#`, `: `, quotes, anchors).
///
/// A value that is a single placeholder resolving to a number or boolean keeps
/// that type; one resolving to nothing becomes `null`.
pub fn expand_env_in_yaml(content: &str) -> Result<String> {
    let mut document: Value = serde_yaml::from_str(content)
        .map_err(|e| anyhow!("parse config error: {}", e))?;
    expand_value(&mut document)?;
    Ok(serde_yaml::to_string(&document)?)
}

fn expand_value(value: &mut Value) -> Result<()> {
    match value {
        Value::String(raw) => {
            if let Some(resolved) = expand_scalar(raw)? {
                *value = resolved;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                expand_value(item)?;
            }
        }
        Value::Mapping(mapping) => {
            for (_, item) in mapping.iter_mut() {
                expand_value(item)?;
            }
        }
        Value::Tagged(tagged) => expand_value(&mut tagged.value)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn expand_scalar(raw: &str) -> Result<Option<Value>> {
    if !raw.contains("${") {
        return Ok(None);
    }
    let expanded = expand_env_vars(raw)?;
    let whole_placeholder = Regex::new(r"^\$\{\w+(?::[^\}]+)?\}$")?.is_match(raw.trim());
    if whole_placeholder {
        if expanded.is_empty() {
            return Ok(Some(Value::Null));
        }
        if let Ok(typed @ (Value::Number(_) | Value::Bool(_))) = serde_yaml::from_str::<Value>(&expanded) {
            return Ok(Some(typed));
        }
    }
    Ok(Some(Value::String(expanded)))
}

/// Replace `${VAR}` / `${VAR:default}` with values from the environment.
/// Unset variables without a default become empty strings.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}
