use chrono::Duration;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::aggregation::Aggregation;
use crate::api::dispatcher::Dispatcher;
use crate::api::models::{
    ActuatorCommand, ApplianceEvent, ChargingSession, Consumption, ConsumptionReport, ServiceLocationInfo,
    ServiceLocations,
};
use crate::error::{ApiError, TransportError};
use crate::helpers::time::{millis_from_now, now_millis};
use crate::sinks::publish::{PublishSink, Topics};
use crate::utils::constants::{CHARGING_SESSION_RANGE_START_MS, NO_CONSUMPTIONS, NO_SESSION};

/// Smappee REST operations. The consumption and charging-session calls also
/// republish their result, retained, on the sink.
pub struct SmappeeApi<P: PublishSink> {
    dispatcher: Dispatcher,
    sink: P,
    topics: Topics,
}

impl<P: PublishSink> SmappeeApi<P> {
    pub fn new(dispatcher: Dispatcher, sink: P, topics: Topics) -> Self {
        Self { dispatcher, sink, topics }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub async fn service_locations(&self) -> Result<ServiceLocations, ApiError> {
        self.dispatcher.get("/servicelocation", &[]).await
    }

    pub async fn service_location_info(&self, service_location_id: u64) -> Result<ServiceLocationInfo, ApiError> {
        self.dispatcher
            .get(&format!("/servicelocation/{}/info", service_location_id), &[])
            .await
    }

    /// Consumption report for `[from_ms, to_ms]`.
    ///
    /// A non-empty report is published as received; an empty (or null) one
    /// publishes the `no consumptions` sentinel and yields `None`.
    pub async fn consumptions(
        &self,
        service_location_id: u64,
        aggregation: Aggregation,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Option<ConsumptionReport>, ApiError> {
        let body = self.fetch_consumptions(service_location_id, aggregation, from_ms, to_ms).await?;
        let topic = self.topics.consumptions();
        match self.non_empty_report(&body)? {
            Some(report) => {
                self.publish(&topic, body.as_bytes()).await?;
                Ok(Some(report))
            }
            None => {
                self.publish(&topic, NO_CONSUMPTIONS.as_bytes()).await?;
                Ok(None)
            }
        }
    }

    /// Most recent 5-minute record, looking at the last 20 minutes.
    pub async fn latest_consumption(&self, service_location_id: u64) -> Result<Option<Consumption>, ApiError> {
        let from = millis_from_now(-Duration::minutes(20));
        let to = millis_from_now(Duration::minutes(5));
        let body = self
            .fetch_consumptions(service_location_id, Aggregation::Minutes, from, to)
            .await?;

        let topic = self.topics.consumptions();
        let latest = match self.non_empty_report(&body)? {
            Some(report) => {
                // the raw record keeps fields the typed model does not carry
                let document: Value = self.dispatcher.parse_get(&body)?;
                let raw = document
                    .get("consumptions")
                    .and_then(Value::as_array)
                    .and_then(|records| records.last())
                    .cloned();
                raw.zip(report.consumptions.into_iter().last())
            }
            None => None,
        };
        match latest {
            Some((raw, record)) => {
                let payload =
                    serde_json::to_vec(&raw).map_err(|e| TransportError::MalformedPayload(e.to_string()))?;
                self.publish(&topic, &payload).await?;
                Ok(Some(record))
            }
            None => {
                self.publish(&topic, NO_CONSUMPTIONS.as_bytes()).await?;
                Ok(None)
            }
        }
    }

    pub async fn monthly_consumptions_for_last_year(
        &self,
        service_location_id: u64,
    ) -> Result<Option<ConsumptionReport>, ApiError> {
        let from = millis_from_now(-Duration::days(365));
        let body = self
            .fetch_consumptions(service_location_id, Aggregation::Monthly, from, now_millis())
            .await?;
        self.non_empty_report(&body)
    }

    pub async fn events(
        &self,
        service_location_id: u64,
        appliance_id: u64,
        from_ms: i64,
        to_ms: i64,
        max_number: u32,
    ) -> Result<Vec<ApplianceEvent>, ApiError> {
        let query = [
            ("applianceId", appliance_id.to_string()),
            ("from", from_ms.to_string()),
            ("to", to_ms.to_string()),
            ("maxNumber", max_number.to_string()),
        ];
        let events: Option<Vec<ApplianceEvent>> = self
            .dispatcher
            .get(&format!("/servicelocation/{}/events", service_location_id), &query)
            .await?;
        Ok(events.unwrap_or_default())
    }

    pub async fn turn_actuator_on(
        &self,
        service_location_id: u64,
        actuator_id: u64,
        duration_seconds: u64,
    ) -> Result<(), ApiError> {
        self.switch_actuator(service_location_id, actuator_id, "on", duration_seconds).await
    }

    pub async fn turn_actuator_off(
        &self,
        service_location_id: u64,
        actuator_id: u64,
        duration_seconds: u64,
    ) -> Result<(), ApiError> {
        self.switch_actuator(service_location_id, actuator_id, "off", duration_seconds).await
    }

    /// Active sessions of a charging station; the list is published as received.
    pub async fn current_charging_session(
        &self,
        serial_number: &str,
    ) -> Result<Option<Vec<ChargingSession>>, ApiError> {
        let query = [
            ("active", "true".to_string()),
            ("range", CHARGING_SESSION_RANGE_START_MS.to_string()),
        ];
        let body = self
            .dispatcher
            .get_raw(
                &format!("/chargingstations/{}/sessions", urlencoding::encode(serial_number)),
                &query,
            )
            .await?;

        let sessions: Option<Vec<ChargingSession>> = self.dispatcher.parse_get(&body)?;
        let topic = self.topics.current_charging_session();
        match sessions.filter(|list| !list.is_empty()) {
            Some(list) => {
                self.publish(&topic, body.as_bytes()).await?;
                Ok(Some(list))
            }
            None => {
                self.publish(&topic, NO_SESSION.as_bytes()).await?;
                Ok(None)
            }
        }
    }

    // ----

    async fn fetch_consumptions(
        &self,
        service_location_id: u64,
        aggregation: Aggregation,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<String, ApiError> {
        let query = [
            ("aggregation", aggregation.code().to_string()),
            ("from", from_ms.to_string()),
            ("to", to_ms.to_string()),
        ];
        debug!(
            "consumptions for {} ({:?}, {}..{})",
            service_location_id, aggregation, from_ms, to_ms
        );
        self.dispatcher
            .get_raw(&format!("/servicelocation/{}/consumption", service_location_id), &query)
            .await
    }

    async fn switch_actuator(
        &self,
        service_location_id: u64,
        actuator_id: u64,
        state: &str,
        duration_seconds: u64,
    ) -> Result<(), ApiError> {
        let path = format!("/servicelocation/{}/actuator/{}/{}", service_location_id, actuator_id, state);
        let command = ActuatorCommand { duration: duration_seconds };
        let _: Option<serde_json::Value> = self.dispatcher.post(&path, &command).await?;
        info!("actuator {} switched {} for {}s", actuator_id, state, duration_seconds);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ApiError> {
        self.sink.publish(topic, payload, true).await?;
        Ok(())
    }

    fn non_empty_report(&self, body: &str) -> Result<Option<ConsumptionReport>, ApiError> {
        let report: Option<ConsumptionReport> = self.dispatcher.parse_get(body)?;
        Ok(report.filter(|report| !report.consumptions.is_empty()))
    }
}

