//! showcase-mcp: MCP server that shows rich content in native windows.
//!
//! Speaks JSON-RPC on stdin/stdout; logs go to stderr. Every window gets its
//! own loopback HTTP server and render-host process, all torn down when the
//! client disconnects or the process is signalled.

mod config;
mod mcp;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use showcase_core::{RenderHostLauncher, SessionManager};
use showcase_http::LocalContentServer;
use tokio::io::BufReader;

use config::Args;
use mcp::McpServer;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let exe_dir = config::exe_dir()?;
    let render_host = args.render_host_config(&exe_dir)?;
    let server_config = args.server_config(&exe_dir);

    log::info!("Render host: {}", render_host.binary_path.display());
    log::info!("Assets: {}", server_config.assets_dir.display());
    if !render_host.binary_path.exists() {
        log::warn!(
            "Render host {} not found; windows will have to be opened by hand",
            render_host.binary_path.display()
        );
    }

    let manager = Arc::new(SessionManager::new(
        Arc::new(LocalContentServer::new(server_config)),
        RenderHostLauncher::new(render_host),
    ));
    let server = McpServer::new(Arc::clone(&manager));

    let outcome = tokio::select! {
        result = server.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => {
            log::info!("stdin closed, shutting down");
            result.context("stdio transport failed")
        }
        result = shutdown_signal() => result.map(|name| log::info!("Received {}, shutting down", name)),
    };

    manager.shutdown();
    if let Err(e) = outcome {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
    // A pending blocking read on stdin would keep the runtime from shutting down.
    std::process::exit(0);
}

fn init_logging(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    Ok("Ctrl+C")
}
