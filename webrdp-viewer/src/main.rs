//! webrdp-viewer entry point.
//!
//! ```text
//! webrdp-viewer                    Connect with defaults
//! webrdp-viewer --config <path>   Use custom config TOML
//! webrdp-viewer --gen-config      Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webrdp_viewer::{
    FrameBuffer, InputTranslator, ServerConnection, ViewerClient, ViewerConfig, input_channel,
};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "webrdp-viewer", about = "Fast-path remote display viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "webrdp-viewer.toml")]
    config: PathBuf,

    /// Gateway address (overrides config). Example: 127.0.0.1:8081
    #[arg(short, long)]
    server: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", ViewerConfig::default().to_toml()?);
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(addr) = cli.server {
        config.network.server_address = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("webrdp-viewer v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect ──────────────────────────────────────────────

    let connection = ServerConnection::connect(&config.network).await?;

    // ── 2. Start the client ─────────────────────────────────────

    let surface = FrameBuffer::new(config.display.width, config.display.height);
    let translator = InputTranslator::new(&config.input);
    let mut client = ViewerClient::new(connection, surface, translator);
    let mut stats_rx = client.stats_receiver();
    let stop = client.stop_handle();

    // A host windowing layer feeds HostEvents through `input`. The binary
    // is headless, so the handle is held open until shutdown and input
    // forwarding stays idle.
    let (input, input_rx) = input_channel(256);

    let mut client_handle = tokio::spawn(async move {
        let result = client.run(input_rx).await;
        (client, result)
    });

    // ── 3. Wait for shutdown ────────────────────────────────────

    let joined = loop {
        tokio::select! {
            joined = &mut client_handle => break joined,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                stop.stop();
            }
            Ok(()) = stats_rx.changed() => {
                let stats = stats_rx.borrow_and_update().clone();
                tracing::debug!(
                    messages = stats.messages,
                    paints = stats.paints,
                    dropped = stats.dropped,
                    inputs_sent = stats.inputs_sent,
                    "stats"
                );
            }
        }
    };

    // ── 4. Shutdown ─────────────────────────────────────────────

    drop(input);
    let (client, result) = joined?;
    if let Err(e) = &result {
        error!("viewer stopped: {e}");
    }
    let stats = client.stats();
    info!(
        messages = stats.messages,
        paints = stats.paints,
        dropped = stats.dropped,
        "shutting down"
    );

    result.map_err(Into::into)
}
