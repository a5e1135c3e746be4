//! Static branding assets (cover, header, footer and closing artwork).
//!
//! Assets are fetched once per run through an [`AssetStore`] and shared by
//! every page and every target. A missing or undecodable asset is never fatal:
//! renderers fall back to text and the run records a
//! [`Diagnostic::AssetMissing`].

use crate::compose::Diagnostic;
use crate::error::Result;
use crate::model::{probe, ImageInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Named static asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AssetName {
    /// Full-page cover artwork
    Cover,
    /// Header band artwork
    Header,
    /// Footer band artwork
    Footer,
    /// Full-page closing artwork
    Closing,
}

impl AssetName {
    /// All assets in fetch order.
    pub const ALL: [AssetName; 4] = [
        AssetName::Cover,
        AssetName::Header,
        AssetName::Footer,
        AssetName::Closing,
    ];

    /// File stem used by [`DirectoryAssets`].
    pub fn file_stem(&self) -> &'static str {
        match self {
            AssetName::Cover => "cover",
            AssetName::Header => "header",
            AssetName::Footer => "footer",
            AssetName::Closing => "closing",
        }
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Source of asset bytes.
pub trait AssetStore: Send + Sync {
    /// Bytes of an asset, `None` when the store does not have it.
    fn fetch(&self, name: AssetName) -> Result<Option<Vec<u8>>>;
}

/// Store without any asset; every band uses its text fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetStore for NoAssets {
    fn fetch(&self, _name: AssetName) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    assets: BTreeMap<AssetName, Vec<u8>>,
}

impl MemoryAssets {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset.
    pub fn with(mut self, name: AssetName, data: Vec<u8>) -> Self {
        self.assets.insert(name, data);
        self
    }
}

impl AssetStore for MemoryAssets {
    fn fetch(&self, name: AssetName) -> Result<Option<Vec<u8>>> {
        Ok(self.assets.get(&name).cloned())
    }
}

/// Store reading `<stem>.png`, `<stem>.jpg` or `<stem>.jpeg` from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Extensions tried in order.
    pub const EXTENSIONS: [&'static str; 3] = ["png", "jpg", "jpeg"];

    /// Store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory searched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirectoryAssets {
    fn fetch(&self, name: AssetName) -> Result<Option<Vec<u8>>> {
        for ext in Self::EXTENSIONS {
            let path = self.root.join(format!("{}.{}", name.file_stem(), ext));
            if path.is_file() {
                log::debug!("Loading asset {} from {}", name, path.display());
                return Ok(Some(std::fs::read(&path)?));
            }
        }
        Ok(None)
    }
}

/// A fetched and probed asset.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// Probed dimensions and format
    pub info: ImageInfo,
}

/// Assets available to the renderers of one run.
#[derive(Debug, Clone, Default)]
pub struct LoadedAssets {
    assets: BTreeMap<AssetName, LoadedAsset>,
}

impl LoadedAssets {
    /// No assets; every band uses its text fallback.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fetch and probe the requested assets.
    ///
    /// Every asset that cannot be used adds a [`Diagnostic::AssetMissing`].
    pub fn load(
        store: &dyn AssetStore,
        names: impl IntoIterator<Item = AssetName>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut assets = BTreeMap::new();
        for name in names {
            let outcome = match store.fetch(name) {
                Ok(Some(data)) => probe(&data)
                    .map(|info| LoadedAsset { data, info })
                    .map_err(|reason| format!("undecodable: {}", reason)),
                Ok(None) => Err("not found".to_string()),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(asset) => {
                    assets.insert(name, asset);
                },
                Err(reason) => {
                    log::warn!("Asset {} unavailable ({}), using text fallback", name, reason);
                    diagnostics.push(Diagnostic::AssetMissing {
                        asset: name,
                        reason,
                    });
                },
            }
        }
        Self { assets }
    }

    /// A loaded asset.
    pub fn get(&self, name: AssetName) -> Option<&LoadedAsset> {
        self.assets.get(&name)
    }

    /// Names of the loaded assets.
    pub fn names(&self) -> impl Iterator<Item = AssetName> + '_ {
        self.assets.keys().copied()
    }
}
