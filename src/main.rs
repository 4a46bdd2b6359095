//! CLI for the tenant gateway
//!
//! Subcommands:
//! - `server`: run the WebSocket gateway and its metrics endpoint
//! - `client`: run a smoke-test client against a running gateway

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tenant_gateway::broker::{Dispatcher, HttpDelivery, Notifier};
use tenant_gateway::config::{DEFAULT_CONFIG_PATH, load_config_from};
use tenant_gateway::transport::http::start_metrics_server;
use tenant_gateway::transport::websocket::start_websocket_server;
use tenant_gateway::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tenant-gateway")]
enum Command {
    /// Start the WebSocket gateway
    Server {
        /// Config file, extension optional
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
    /// Create a topic, send a message and pull it back
    Client {
        /// Gateway URL without the tenant path
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long, default_value = "smoke")]
        tenant: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    match Command::parse() {
        Command::Server { config } => {
            if let Err(e) = run_server(&config).await {
                logging::init("error");
                error!("Server failed: {}", e);
            }
        }
        Command::Client { url, tenant } => {
            logging::init("info");
            if let Err(e) = run_client(&url, &tenant).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_from(config_path)?;
    logging::init(&config.log.level);

    let delivery = HttpDelivery::new(Duration::from_millis(config.notifier.timeout_ms))?;
    let (notifier, worker) = Notifier::new(Arc::new(delivery), config.notifier.max_in_flight);
    tokio::spawn(worker.run());

    let dispatcher = Arc::new(Dispatcher::new(&config.broker, notifier));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let metrics_addr = format!("{}:{}", config.server.host, config.server.metrics_port);

    tokio::select! {
        res = start_websocket_server(addr, dispatcher) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        res = start_metrics_server(metrics_addr) => {
            res?;
            error!("Metrics server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(url: &str, tenant: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let endpoint = format!("{}/v1.0/{tenant}", url.trim_end_matches('/'));
    let (mut ws_stream, _response) = connect_async(endpoint.as_str()).await?;

    let requests = [
        json!({ "command": "create_topic", "name": "smoke" }),
        json!({ "command": "send", "topic": "smoke", "message": "Hello from the smoke client" }),
        json!({ "command": "receive", "topic": "smoke" }),
        json!({ "command": "delete_topic", "topic": "smoke" }),
    ];

    for request in requests {
        ws_stream
            .send(WsMessage::Text(request.to_string().into()))
            .await?;
        match ws_stream.next().await {
            Some(Ok(WsMessage::Text(reply))) => info!("{request} -> {}", reply.as_str()),
            Some(Ok(other)) => info!("{request} -> unexpected frame {other:?}"),
            Some(Err(e)) => return Err(e.into()),
            None => return Err("connection closed by gateway".into()),
        }
    }

    Ok(())
}
