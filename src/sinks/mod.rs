pub mod publish;
pub mod sink_mqtt;
