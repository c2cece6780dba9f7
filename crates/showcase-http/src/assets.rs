//! Static presentation assets, loaded once and shared by every session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use axum::body::Bytes;

/// The fixed set of assets the render shell references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Bundle,
    Styles,
    Mermaid,
}

impl Asset {
    pub const ALL: [Asset; 3] = [Asset::Bundle, Asset::Styles, Asset::Mermaid];

    /// File name inside the assets directory (also the URL path).
    pub fn file_name(self) -> &'static str {
        match self {
            Asset::Bundle => "bundle.js",
            Asset::Styles => "styles.css",
            Asset::Mermaid => "mermaid.min.js",
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            Asset::Bundle => "/bundle.js",
            Asset::Styles => "/styles.css",
            Asset::Mermaid => "/mermaid.min.js",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Asset::Bundle | Asset::Mermaid => "application/javascript; charset=utf-8",
            Asset::Styles => "text/css; charset=utf-8",
        }
    }
}

/// Reads assets from a directory on first use and keeps them for the
/// lifetime of the process. Failed reads are not cached.
pub struct AssetCache {
    dir: PathBuf,
    loaded: Mutex<HashMap<Asset, Bytes>>,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get an asset's bytes, reading the file the first time.
    pub async fn get(&self, asset: Asset) -> std::io::Result<Bytes> {
        if let Some(bytes) = self.cached(asset) {
            return Ok(bytes);
        }

        let bytes = Bytes::from(tokio::fs::read(self.dir.join(asset.file_name())).await?);
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        // Another request may have loaded it meanwhile; keep the first copy.
        Ok(loaded.entry(asset).or_insert(bytes).clone())
    }

    pub fn is_cached(&self, asset: Asset) -> bool {
        self.cached(asset).is_some()
    }

    fn cached(&self, asset: Asset) -> Option<Bytes> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&asset)
            .cloned()
    }
}
