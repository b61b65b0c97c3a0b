use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tracing::{debug, error, info};

use crate::config::service::MqttConfig;
use crate::error::TransportError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::sinks::publish::PublishSink;

static MQTT_MSG: &'static str = "mqtt";

const REQUEST_CHANNEL_CAPACITY: usize = 10;
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// MQTT publish sink.
///
/// Every publish opens its own connection, publishes with QoS 1, waits for
/// the broker's PUBACK and disconnects again. Nothing stays connected
/// between calls.
#[derive(Debug, Clone)]
pub struct MqttSink {
    cfg: MqttConfig,
}

impl MqttSink {
    pub fn new(cfg: MqttConfig) -> Self {
        Self { cfg }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.cfg.client_id.clone(), self.cfg.host.clone(), self.cfg.port);
        options.set_keep_alive(Duration::from_secs(self.cfg.keep_alive_seconds));
        options.set_clean_session(true);
        if let Some(username) = &self.cfg.username {
            options.set_credentials(username.clone(), self.cfg.password.clone().unwrap_or_default());
        }
        options
    }
}

impl PublishSink for MqttSink {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TransportError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let timeout = Duration::from_millis(self.cfg.publish_timeout_ms);

        debug!("{}: connecting to {}:{}", MQTT_MSG, self.cfg.host, self.cfg.port);
        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CHANNEL_CAPACITY);

        let result = match tokio::time::timeout(
            timeout,
            publish_and_wait(&client, &mut eventloop, topic, payload, retain),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Publish(format!(
                "no acknowledgement from {}:{} within {}ms",
                self.cfg.host, self.cfg.port, self.cfg.publish_timeout_ms
            ))),
        };

        // released on every path
        release(&client, &mut eventloop).await;

        metrics
            .publish_duration
            .with_label_values(&[topic])
            .observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(()) => {
                metrics.publish_total.with_label_values(&[topic]).inc();
                info!("{}: published {} bytes to '{}' (retain={})", MQTT_MSG, payload.len(), topic, retain);
            }
            Err(err) => {
                metrics.publish_failures.with_label_values(&[topic]).inc();
                error!("{}: failed to publish to '{}': {}", MQTT_MSG, topic, err);
            }
        }
        result
    }
}

async fn publish_and_wait(
    client: &AsyncClient,
    eventloop: &mut EventLoop,
    topic: &str,
    payload: &[u8],
    retain: bool,
) -> Result<(), TransportError> {
    client
        .publish(topic, QoS::AtLeastOnce, retain, payload.to_vec())
        .await
        .map_err(|e| TransportError::Publish(e.to_string()))?;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!("{}: connected ({:?})", MQTT_MSG, ack.code);
            }
            Ok(Event::Incoming(Packet::PubAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(TransportError::Publish(e.to_string())),
        }
    }
}

async fn release(client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(e) = client.disconnect().await {
        debug!("{}: disconnect request not queued: {}", MQTT_MSG, e);
        return;
    }
    let flushed = tokio::time::timeout(DISCONNECT_GRACE, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    if flushed.is_err() {
        debug!("{}: disconnect not flushed, dropping connection", MQTT_MSG);
    }
}
