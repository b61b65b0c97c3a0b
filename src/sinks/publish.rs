use std::future::Future;

use crate::error::TransportError;
use crate::utils::constants::{TOPIC_CONSUMPTIONS, TOPIC_CURRENT_CHARGING_SESSION};

/// Pub/sub transport the domain calls forward their results to.
pub trait PublishSink: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Published topics, namespaced under the configured prefix.
#[derive(Debug, Clone)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn consumptions(&self) -> String {
        format!("{}{}", self.base, TOPIC_CONSUMPTIONS)
    }

    pub fn current_charging_session(&self) -> String {
        format!("{}{}", self.base, TOPIC_CURRENT_CHARGING_SESSION)
    }
}
