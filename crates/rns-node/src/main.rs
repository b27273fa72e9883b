use std::path::PathBuf;

use clap::Parser;

use rns_node::config::NodeConfig;
use rns_node::node::Node;

#[derive(Parser)]
#[command(name = "rnsd", about = "rns mesh network daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/rns/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    match config.logging.format.as_str() {
        "json" => rns_node::logging::init_json(&config.logging.level),
        _ => rns_node::logging::init(&config.logging.level),
    }

    let mut node = Node::new(config);
    if let Err(e) = node.start().await {
        tracing::error!("failed to start node: {e}");
        std::process::exit(1);
    }

    let handle = node.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, shutting down");
        handle.shutdown();
    });

    #[cfg(unix)]
    {
        let handle = node.shutdown_handle();
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            sigterm.recv().await;
            tracing::info!("received SIGTERM, shutting down");
            handle.shutdown();
        });
    }

    node.run().await;
    node.shutdown().await;
}
