use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use broker_rust::broker::{self, Capabilities, Dispatcher};
use broker_rust::bus::{BusConnection, ConsumerOptions, EventConsumer, EventEmitter};
use broker_rust::capability::{BusCapability, GrpcCapability, HttpCapability, RpcCapability};
use broker_rust::config::{BrokerConfig, BusArgs, ListenerConfig};
use broker_rust::telemetry;

/// Route actions to the auth, mail and logger services.
#[derive(Parser)]
#[command(name = "broker_rust", version, about, long_about = None)]
struct Cli {
    /// Detailed output (-v for debug, -vv for trace). Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP broker.
    Broker(BrokerConfig),
    /// Consume log topics from the bus and forward them to the logger.
    Listener(ListenerConfig),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    match cli.command {
        Command::Broker(config) => run_broker(config).await,
        Command::Listener(config) => run_listener(config).await,
    }
}

async fn connect(args: &BusArgs) -> anyhow::Result<BusConnection> {
    BusConnection::connect(&args.amqp_url, &args.retry_policy())
        .await
        .context("could not connect to the message bus")
}

async fn run_broker(config: BrokerConfig) -> anyhow::Result<()> {
    let connection = connect(&config.bus).await?;
    let emitter = Arc::new(EventEmitter::new(&connection).await?);

    let client = reqwest::Client::new();
    let capabilities = Capabilities {
        auth: Arc::new(
            HttpCapability::with_client(client.clone(), &config.auth_url)
                .timeout(config.http_timeout()),
        ),
        log: Arc::new(RpcCapability::new(&config.log_rpc_addr).timeout(config.rpc_timeout())),
        log_grpc: Arc::new(GrpcCapability::connect_lazy(
            &config.log_grpc_url,
            config.grpc_timeout(),
        )?),
        log_event: Arc::new(BusCapability::new(emitter, &config.routing_key)),
        mail: Arc::new(
            HttpCapability::with_client(client, &config.mail_url).timeout(config.http_timeout()),
        ),
    };
    let dispatcher = Arc::new(Dispatcher::new(capabilities));

    let result = tokio::select! {
        served = broker::serve(dispatcher, &config.listen) => served.context("broker server failed"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down broker");
            Ok(())
        }
    };

    if let Err(e) = connection.close().await {
        tracing::warn!(error = %e, "error closing bus connection");
    }
    result
}

async fn run_listener(config: ListenerConfig) -> anyhow::Result<()> {
    let connection = connect(&config.bus).await?;

    let sink = Arc::new(
        HttpCapability::new(&config.log_url)
            .timeout(config.http_timeout())
            .status_only(),
    );
    let options = ConsumerOptions {
        max_in_flight: config.max_in_flight,
    };
    let consumer = EventConsumer::with_options(&connection, sink, options).await?;

    tracing::info!(topics = ?config.topics, "starting listener");
    let result = tokio::select! {
        listened = consumer.listen(&config.topics) => listened.context("listener failed"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down listener");
            Ok(())
        }
    };

    if let Err(e) = connection.close().await {
        tracing::warn!(error = %e, "error closing bus connection");
    }
    result
}
