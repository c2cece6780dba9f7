//! Render-host binary selection per OS and CPU architecture.

use crate::render_host::RenderHostError;

/// Name of the render-host binary for the platform this process runs on.
pub fn current_binary_name() -> Result<String, RenderHostError> {
    binary_name(std::env::consts::OS, std::env::consts::ARCH)
}

/// Map an OS / architecture pair (as reported by `std::env::consts`) to the
/// render-host binary file name.
///
/// macOS ships a single universal binary, so the architecture is ignored there.
pub fn binary_name(os: &str, arch: &str) -> Result<String, RenderHostError> {
    let platform = match os {
        "macos" => return Ok("neutralino-mac_universal".to_string()),
        "linux" => "linux",
        "windows" => "win",
        _ => return Err(unsupported(os, arch)),
    };

    let arch_name = match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        _ => return Err(unsupported(os, arch)),
    };

    let ext = if os == "windows" { ".exe" } else { "" };
    Ok(format!("neutralino-{}_{}{}", platform, arch_name, ext))
}

fn unsupported(os: &str, arch: &str) -> RenderHostError {
    RenderHostError::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
    }
}
