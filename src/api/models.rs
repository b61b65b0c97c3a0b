//! Smappee API payloads. Transient: nothing here is persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLocations {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub service_locations: Vec<ServiceLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLocation {
    pub service_location_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_location_uuid: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_serial_number: Option<String>,
}

/// Details of one service location: appliances, actuators, tariff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLocationInfo {
    pub service_location_id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electricity_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electricity_currency: Option<String>,
    #[serde(default)]
    pub appliances: Vec<Appliance>,
    #[serde(default)]
    pub actuators: Vec<Actuator>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appliance {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub appliance_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actuator {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_location_id: Option<u64>,
    #[serde(default)]
    pub consumptions: Vec<Consumption>,
}

/// One aggregated reading. Energy values are Wh for the aggregation period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    /// UTC milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_on: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_import: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_export: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_sufficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_consumption: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactive: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltages: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceEvent {
    pub active_power: f64,
    pub appliance_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_power: Option<f64>,
    /// UTC milliseconds
    pub timestamp: i64,
}

/// Body of the actuator on/off calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuatorCommand {
    /// seconds
    pub duration: u64,
}

/// Charging sessions are republished verbatim, so they stay untyped.
pub type ChargingSession = serde_json::Value;
