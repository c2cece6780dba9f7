//! Command-line configuration for the daemon.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use showcase_core::platform;
use showcase_core::render_host::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use showcase_core::RenderHostConfig;
use showcase_http::ServerConfig;

const DEFAULT_RUNTIME_DIR: &str = "neutralino";
const DEFAULT_ASSETS_DIR: &str = "assets";

#[derive(Parser, Debug)]
#[command(
    name = "showcase-mcp",
    version,
    about = "Show rich content in native windows, driven over MCP on stdio"
)]
pub struct Args {
    /// Render-host binary to launch (takes precedence over --runtime-dir)
    #[arg(long, value_name = "PATH")]
    pub render_host: Option<PathBuf>,

    /// Directory holding bin/<platform binary> [default: neutralino next to the executable]
    #[arg(long, value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,

    /// Directory holding bundle.js, styles.css and mermaid.min.js [default: assets next to the executable]
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    #[arg(long, value_name = "PX", default_value_t = DEFAULT_WINDOW_WIDTH)]
    pub window_width: u32,

    #[arg(long, value_name = "PX", default_value_t = DEFAULT_WINDOW_HEIGHT)]
    pub window_height: u32,

    /// Log filter such as `debug` or `showcase_core=trace` (overrides RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

impl Args {
    /// Pick the render-host binary. Fails only when no explicit binary was
    /// given and this platform has no known one.
    pub fn render_host_config(&self, exe_dir: &Path) -> Result<RenderHostConfig> {
        let binary = match &self.render_host {
            Some(path) => path.clone(),
            None => {
                let runtime_dir = self
                    .runtime_dir
                    .clone()
                    .unwrap_or_else(|| exe_dir.join(DEFAULT_RUNTIME_DIR));
                let name = platform::current_binary_name()
                    .context("Cannot pick a render-host binary; pass --render-host")?;
                runtime_dir.join("bin").join(name)
            }
        };

        Ok(RenderHostConfig::new(binary).window_size(self.window_width, self.window_height))
    }

    pub fn server_config(&self, exe_dir: &Path) -> ServerConfig {
        let assets_dir = self
            .assets_dir
            .clone()
            .unwrap_or_else(|| exe_dir.join(DEFAULT_ASSETS_DIR));
        ServerConfig::default().assets_dir(assets_dir)
    }
}

/// Directory of the running executable; bundled resources live beside it.
pub fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("Executable has no parent directory")
}
