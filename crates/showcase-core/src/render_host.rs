//! Render-host process management.
//!
//! The render host is an external executable (a Neutralino binary) that opens
//! a native window pointed at a local URL and exits when the window is
//! closed. This module handles:
//! - Provisioning a private temporary working directory with the host's config
//! - Spawning the process with stdio detached
//! - Monitoring process exit
//! - Releasing the process and directory, swallowing every error

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::lock;

/// Name of the config file the render host reads from its working directory.
pub const CONFIG_FILE: &str = "neutralino.config.json";

pub const DEFAULT_WINDOW_WIDTH: u32 = 720;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 640;

const APPLICATION_ID: &str = "showcase.mcp.display";
const TITLE_PREFIX: &str = "showcase-mcp - ";
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(20);
const TERMINATE_POLL_ATTEMPTS: u32 = 10;

#[derive(Error, Debug)]
pub enum RenderHostError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Failed to create render-host working directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("Failed to write render-host config: {0}")]
    Config(String),

    #[error("Failed to spawn render host {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for launching render-host windows.
#[derive(Debug, Clone)]
pub struct RenderHostConfig {
    /// Path to the render-host binary
    pub binary_path: PathBuf,
    /// Arguments placed before the standard launch arguments
    pub leading_args: Vec<String>,
    /// Initial window width in pixels
    pub window_width: u32,
    /// Initial window height in pixels
    pub window_height: u32,
}

impl RenderHostConfig {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            leading_args: Vec::new(),
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
        }
    }

    /// Set arguments passed ahead of the standard ones (e.g. for a wrapper).
    pub fn leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Set the initial window size.
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }
}

/// Exit status reported when a render host terminates on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostExit {
    pub code: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HostConfigFile {
    application_id: String,
    version: String,
    default_mode: String,
    url: String,
    enable_server: bool,
    #[serde(rename = "enableNativeAPI")]
    enable_native_api: bool,
    port: u16,
    window: WindowOptions,
    cli: CliOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WindowOptions {
    title: String,
    width: u32,
    height: u32,
    center: bool,
    resizable: bool,
    exit_process_on_close: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOptions {
    binary_name: String,
    resources_path: String,
}

/// Launches render-host windows from a fixed configuration.
#[derive(Debug, Clone)]
pub struct RenderHostLauncher {
    config: RenderHostConfig,
}

impl RenderHostLauncher {
    pub fn new(config: RenderHostConfig) -> Self {
        Self { config }
    }

    /// Spawn a render host showing `url` in a window titled after `title`.
    ///
    /// "Launched" means the process was spawned, not that a window is on
    /// screen yet. On failure nothing is left behind: the working directory
    /// is removed when the `TempDir` guard drops.
    pub fn launch(&self, url: &str, title: &str) -> Result<RenderHost, RenderHostError> {
        let window_title = format!("{}{}", TITLE_PREFIX, title);

        let temp_dir = tempfile::Builder::new()
            .prefix("showcase-mcp-")
            .tempdir()
            .map_err(RenderHostError::TempDir)?;
        self.write_config(temp_dir.path(), url, &window_title)?;

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.args(&self.config.leading_args)
            .args(launch_args(temp_dir.path(), &window_title))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().map_err(|source| RenderHostError::Spawn {
            path: self.config.binary_path.display().to_string(),
            source,
        })?;

        log::info!(
            "Render host started (pid {}) for {} in {}",
            child.id(),
            url,
            temp_dir.path().display()
        );
        Ok(RenderHost::start(child, temp_dir))
    }

    fn write_config(&self, dir: &Path, url: &str, window_title: &str) -> Result<(), RenderHostError> {
        let resources = dir.join("resources");
        std::fs::create_dir_all(&resources)
            .map_err(|e| RenderHostError::Config(format!("{}: {}", resources.display(), e)))?;
        std::fs::write(resources.join("index.html"), "")
            .map_err(|e| RenderHostError::Config(format!("index.html: {}", e)))?;

        let config = HostConfigFile {
            application_id: APPLICATION_ID.to_string(),
            version: "1.0.0".to_string(),
            default_mode: "window".to_string(),
            url: url.to_string(),
            enable_server: true,
            enable_native_api: false,
            port: 0,
            window: WindowOptions {
                title: window_title.to_string(),
                width: self.config.window_width,
                height: self.config.window_height,
                center: true,
                resizable: true,
                exit_process_on_close: true,
            },
            cli: CliOptions {
                binary_name: "showcase-mcp".to_string(),
                resources_path: "/resources/".to_string(),
            },
        };

        let json = serde_json::to_vec(&config).map_err(|e| RenderHostError::Config(e.to_string()))?;
        std::fs::write(dir.join(CONFIG_FILE), json)
            .map_err(|e| RenderHostError::Config(format!("{}: {}", CONFIG_FILE, e)))
    }
}

/// Standard arguments pointing the render host at its working directory.
pub fn launch_args(dir: &Path, window_title: &str) -> Vec<String> {
    vec![
        "--load-dir-res".to_string(),
        format!("--path={}", dir.display()),
        "--window-center".to_string(),
        format!("--window-title={}", window_title),
    ]
}

/// A running render-host process and the working directory it owns.
///
/// [`RenderHost::release`] may be called any number of times; dropping the
/// handle releases it as well.
pub struct RenderHost {
    pid: u32,
    child: Arc<Mutex<Option<Child>>>,
    temp_dir: Mutex<Option<TempDir>>,
    temp_path: PathBuf,
    exit_rx: Option<oneshot::Receiver<HostExit>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl RenderHost {
    fn start(child: Child, temp_dir: TempDir) -> Self {
        let pid = child.id();
        let temp_path = temp_dir.path().to_path_buf();
        let child = Arc::new(Mutex::new(Some(child)));
        let (exit_tx, exit_rx) = oneshot::channel();

        // Without a runtime there is nobody to deliver exit events to.
        let watcher = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(watch_exit(Arc::clone(&child), exit_tx))),
            Err(_) => {
                log::debug!("No async runtime; exit events disabled for pid {}", pid);
                None
            }
        };

        Self {
            pid,
            child,
            temp_dir: Mutex::new(Some(temp_dir)),
            temp_path,
            exit_rx: Some(exit_rx),
            watcher: Mutex::new(watcher),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Working directory of the process (removed on release).
    pub fn temp_dir(&self) -> &Path {
        &self.temp_path
    }

    /// Check if the process is still running and has not been released.
    pub fn is_running(&self) -> bool {
        match lock(&self.child).as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Take the receiver that resolves when the process exits on its own.
    ///
    /// The sender is dropped without a value if the host is released first.
    pub fn take_exit_receiver(&mut self) -> Option<oneshot::Receiver<HostExit>> {
        self.exit_rx.take()
    }

    /// Terminate the process if still running and remove the working
    /// directory. Never fails; repeated calls are no-ops.
    pub fn release(&self) {
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.abort();
        }
        if let Some(child) = lock(&self.child).take() {
            crate::blocking(|| terminate(child));
        }
        if let Some(dir) = lock(&self.temp_dir).take() {
            if let Err(e) = dir.close() {
                log::debug!("Failed to remove {}: {}", self.temp_path.display(), e);
            }
        }
    }
}

impl Drop for RenderHost {
    fn drop(&mut self) {
        self.release();
    }
}

async fn watch_exit(child: Arc<Mutex<Option<Child>>>, exit_tx: oneshot::Sender<HostExit>) {
    let mut ticker = tokio::time::interval(EXIT_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        let exit = {
            let mut guard = lock(&child);
            let Some(process) = guard.as_mut() else {
                return;
            };
            match process.try_wait() {
                Ok(Some(status)) => HostExit {
                    code: status.code(),
                },
                Ok(None) => continue,
                Err(e) => {
                    log::debug!("Failed to poll render host: {}", e);
                    HostExit { code: None }
                }
            }
        };
        let _ = exit_tx.send(exit);
        return;
    }
}

/// Stop the process gracefully (SIGTERM on Unix), then force kill.
fn terminate(mut child: Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }

    #[cfg(unix)]
    {
        unsafe {
            libc::kill(child.id() as i32, libc::SIGTERM);
        }
        for _ in 0..TERMINATE_POLL_ATTEMPTS {
            std::thread::sleep(TERMINATE_POLL_INTERVAL);
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => continue,
                Err(_) => break,
            }
        }
    }

    if let Err(e) = child.kill() {
        log::debug!("Failed to kill render host {}: {}", child.id(), e);
    }
    let _ = child.wait();
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = RenderHostConfig::new("/opt/neutralino")
            .leading_args(vec!["--wrapped".to_string()])
            .window_size(800, 600);

        assert_eq!(config.binary_path, PathBuf::from("/opt/neutralino"));
        assert_eq!(config.leading_args, vec!["--wrapped"]);
        assert_eq!((config.window_width, config.window_height), (800, 600));
    }

    #[test]
    fn default_window_size() {
        let config = RenderHostConfig::new("bin");
        assert_eq!((config.window_width, config.window_height), (720, 640));
    }

    #[test]
    fn launch_args_point_at_directory() {
        let args = launch_args(Path::new("/tmp/showcase-x"), "showcase-mcp - T");
        assert_eq!(
            args,
            vec![
                "--load-dir-res",
                "--path=/tmp/showcase-x",
                "--window-center",
                "--window-title=showcase-mcp - T",
            ]
        );
    }

    #[test]
    fn missing_binary_fails_to_spawn() {
        let launcher = RenderHostLauncher::new(RenderHostConfig::new(
            "/nonexistent/showcase/render-host",
        ));
        let err = launcher.launch("http://127.0.0.1:1", "T").err().unwrap();
        assert!(matches!(err, RenderHostError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/showcase/render-host"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        /// Launcher running `script` through `sh -c`; the launch args follow as `$@`.
        fn sh_launcher(script: &str) -> RenderHostLauncher {
            RenderHostLauncher::new(RenderHostConfig::new("/bin/sh").leading_args(vec![
                "-c".to_string(),
                script.to_string(),
                "render-host".to_string(),
            ]))
        }

        #[tokio::test]
        async fn writes_config_and_runs() {
            let launcher = sh_launcher("exec sleep 30");
            let host = launcher.launch("http://127.0.0.1:4242", "Notes").unwrap();

            assert!(host.is_running());
            assert!(host.pid() > 0);

            let raw = std::fs::read_to_string(host.temp_dir().join(CONFIG_FILE)).unwrap();
            let config: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(config["url"], "http://127.0.0.1:4242");
            assert_eq!(config["window"]["title"], "showcase-mcp - Notes");
            assert_eq!(config["window"]["width"], 720);
            assert_eq!(config["window"]["exitProcessOnClose"], true);
            assert_eq!(config["enableNativeAPI"], false);
            assert!(host.temp_dir().join("resources/index.html").exists());

            host.release();
        }

        #[tokio::test]
        async fn release_stops_process_and_removes_directory() {
            let host = sh_launcher("exec sleep 30")
                .launch("http://127.0.0.1:1", "T")
                .unwrap();
            let dir = host.temp_dir().to_path_buf();
            assert!(dir.exists());

            host.release();
            assert!(!host.is_running());
            assert!(!dir.exists());

            // Second release is a no-op
            host.release();
            assert!(!host.is_running());
        }

        #[tokio::test]
        async fn drop_releases() {
            let host = sh_launcher("exec sleep 30")
                .launch("http://127.0.0.1:1", "T")
                .unwrap();
            let dir = host.temp_dir().to_path_buf();

            drop(host);
            assert!(!dir.exists());
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
        async fn slow_release_does_not_stall_runtime() {
            // Ignores SIGTERM, so release waits out the grace period before killing.
            let host = sh_launcher("trap '' TERM; exec sleep 30")
                .launch("http://127.0.0.1:1", "T")
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;

            let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let ticker = tokio::spawn({
                let ticks = Arc::clone(&ticks);
                async move {
                    loop {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }
                }
            });

            let during = tokio::spawn({
                let ticks = Arc::clone(&ticks);
                async move {
                    let before = ticks.load(std::sync::atomic::Ordering::SeqCst);
                    host.release();
                    assert!(!host.is_running());
                    ticks.load(std::sync::atomic::Ordering::SeqCst) - before
                }
            })
            .await
            .unwrap();

            ticker.abort();
            assert!(during > 0, "runtime was stalled during release");
        }

        #[tokio::test]
        async fn exit_is_reported() {
            let mut host = sh_launcher("exit 3")
                .launch("http://127.0.0.1:1", "T")
                .unwrap();
            let exit_rx = host.take_exit_receiver().unwrap();

            let exit = tokio::time::timeout(Duration::from_secs(5), exit_rx)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(exit, HostExit { code: Some(3) });
            assert!(!host.is_running());
        }

        #[tokio::test]
        async fn release_cancels_exit_event() {
            let mut host = sh_launcher("exec sleep 30")
                .launch("http://127.0.0.1:1", "T")
                .unwrap();
            let exit_rx = host.take_exit_receiver().unwrap();

            host.release();
            let result = tokio::time::timeout(Duration::from_secs(5), exit_rx)
                .await
                .unwrap();
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn receives_standard_args() {
            let out = tempfile::tempdir().unwrap();
            let args_file = out.path().join("args.txt");
            let script = format!("printf '%s\\n' \"$@\" > '{}'", args_file.display());

            let mut host = sh_launcher(&script)
                .launch("http://127.0.0.1:1", "Args")
                .unwrap();
            let exit_rx = host.take_exit_receiver().unwrap();
            tokio::time::timeout(Duration::from_secs(5), exit_rx)
                .await
                .unwrap()
                .unwrap();

            let recorded = std::fs::read_to_string(&args_file).unwrap();
            let lines: Vec<&str> = recorded.lines().collect();
            assert_eq!(lines[0], "--load-dir-res");
            assert!(lines[1].starts_with("--path="));
            assert_eq!(lines[2], "--window-center");
            assert_eq!(lines[3], "--window-title=showcase-mcp - Args");
        }
    }
}
