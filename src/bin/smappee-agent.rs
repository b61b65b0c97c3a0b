use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Serialize;
use smappee_agent::api::aggregation::Aggregation;
use smappee_agent::api::dispatcher::Dispatcher;
use smappee_agent::api::smappee::SmappeeApi;
use smappee_agent::cache::token_manager::TokenManager;
use smappee_agent::cache::token_store::FileTokenStore;
use smappee_agent::config::service::ServiceConfig;
use smappee_agent::poll::scheduler;
use smappee_agent::server;
use smappee_agent::sinks::publish::Topics;
use smappee_agent::sinks::sink_mqtt::MqttSink;
use smappee_agent::sources::oauth2::OAuth2Source;
use smappee_agent::utils::config_loader;
use smappee_agent::utils::constants::DEFAULT_EVENTS_MAX_NUMBER;
use smappee_agent::utils::logging;
use smappee_agent::utils::logging::LogLevel;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "smappee-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the service locations of the account
    ServiceLocations,
    /// Appliances, actuators and tariff of one service location
    LocationInfo {
        #[arg(long)]
        location: u64,
    },
    /// Consumption report for a time range (UTC ms); publishes it
    Consumptions {
        #[arg(long)]
        location: u64,
        #[arg(long, value_enum, default_value = "hourly")]
        aggregation: Aggregation,
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
    },
    /// Most recent 5-minute record; publishes it
    LatestConsumption {
        #[arg(long)]
        location: u64,
    },
    /// Monthly records of the last twelve months
    MonthlyConsumptions {
        #[arg(long)]
        location: u64,
    },
    /// Appliance events for a time range (UTC ms)
    Events {
        #[arg(long)]
        location: u64,
        #[arg(long)]
        appliance: u64,
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
        #[arg(long, default_value_t = DEFAULT_EVENTS_MAX_NUMBER)]
        max_number: u32,
    },
    /// Switch an actuator on for `duration` seconds
    ActuatorOn {
        #[arg(long)]
        location: u64,
        #[arg(long)]
        actuator: u64,
        #[arg(long)]
        duration: u64,
    },
    /// Switch an actuator off for `duration` seconds
    ActuatorOff {
        #[arg(long)]
        location: u64,
        #[arg(long)]
        actuator: u64,
        #[arg(long)]
        duration: u64,
    },
    /// Active sessions of a charging station; publishes them
    ChargingSession {
        #[arg(long)]
        serial: String,
    },
    /// Poll the publishing operations and serve health/metrics until stopped
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Wire token manager, dispatcher and publish sink
    // -------------------------------

    let api = build_api(&service_config)?;

    // -------------------------------
    // 3. Execute
    // -------------------------------

    match args.command {
        Command::ServiceLocations => print_json(&api.service_locations().await?),
        Command::LocationInfo { location } => print_json(&api.service_location_info(location).await?),
        Command::Consumptions { location, aggregation, from, to } => {
            print_json(&api.consumptions(location, aggregation, from, to).await?)
        }
        Command::LatestConsumption { location } => print_json(&api.latest_consumption(location).await?),
        Command::MonthlyConsumptions { location } => {
            print_json(&api.monthly_consumptions_for_last_year(location).await?)
        }
        Command::Events { location, appliance, from, to, max_number } => {
            print_json(&api.events(location, appliance, from, to, max_number).await?)
        }
        Command::ActuatorOn { location, actuator, duration } => {
            print_json(&api.turn_actuator_on(location, actuator, duration).await?)
        }
        Command::ActuatorOff { location, actuator, duration } => {
            print_json(&api.turn_actuator_off(location, actuator, duration).await?)
        }
        Command::ChargingSession { serial } => print_json(&api.current_charging_session(&serial).await?),
        Command::Run => run(&service_config, &api).await,
    }
}

fn build_api(service_config: &ServiceConfig) -> Result<SmappeeApi<MqttSink>> {
    let client = Client::builder()
        .timeout(Duration::from_millis(service_config.settings.http_timeout_ms))
        .build()?;

    let store = FileTokenStore::from_config(&service_config.storage);
    let oauth2 = OAuth2Source::new(client.clone(), &service_config.api, service_config.account.clone());
    let tokens = Arc::new(TokenManager::new(
        store,
        oauth2,
        service_config.settings.safety_margin_seconds,
    ));

    let dispatcher = Dispatcher::new(client, service_config.api.base_url.clone(), tokens);
    let sink = MqttSink::new(service_config.mqtt.clone());
    let topics = Topics::new(service_config.mqtt.base_topic.clone());
    Ok(SmappeeApi::new(dispatcher, sink, topics))
}

async fn run(service_config: &ServiceConfig, api: &SmappeeApi<MqttSink>) -> Result<()> {
    let shutdown = async {
        if let Err(e) = scheduler::shutdown_signal().await {
            error!("cannot listen for shutdown signals: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let poller = scheduler::run(api, &service_config.poll, shutdown);
    let http_server = server::server::start(&service_config.settings);

    info!("Service starting...");
    tokio::select! {
        result = poller => result,
        result = http_server => result,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
