//! `iris-gatewayd`: standalone webhook gateway for the bridge.
//!
//! The session supervisor registers live transport clients into the shared
//! registry; this binary owns the HTTP side and the tenant configuration
//! state directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use iris_gateway::{run_webhook_gateway_server, GatewayServerConfig};
use iris_transport::TransportClientRegistry;

#[derive(Debug, Parser)]
#[command(
    name = "iris-gatewayd",
    about = "Webhook gateway for the transport/helpdesk bridge",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "IRIS_GATEWAY_BIND",
        default_value = "127.0.0.1:8632",
        help = "Socket address the webhook gateway listens on"
    )]
    bind: String,

    #[arg(
        long = "state-dir",
        env = "IRIS_STATE_DIR",
        default_value = ".iris",
        help = "Directory holding tenant configuration and mapping snapshots"
    )]
    state_dir: PathBuf,

    #[arg(
        long = "mapping-snapshots",
        env = "IRIS_MAPPING_SNAPSHOTS",
        help = "Mirror per-session message mappings to disk for audit/replay"
    )]
    mapping_snapshots: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let transports = Arc::new(TransportClientRegistry::new());
    run_webhook_gateway_server(
        GatewayServerConfig {
            bind: cli.bind,
            state_dir: cli.state_dir,
            mapping_snapshots: cli.mapping_snapshots,
        },
        transports,
    )
    .await
}
