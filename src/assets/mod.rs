//! # Assets Module
//!
//! Resolves which built frontend files (scripts and stylesheets) belong to a
//! logical page.
//!
//! ## Overview
//!
//! Two providers implement [`AssetProvider`], selected once at startup by
//! [`Mode`](crate::runtime_config::Mode):
//!
//! - [`StaticAssets`] - reads `assets.json` from the dist folder once and
//!   keeps it immutable for the process lifetime (production)
//! - [`LiveAssets`] - follows the compilation stats written by a running
//!   bundler in watch mode and swaps in each complete snapshot (development)
//!
//! Both normalize their raw input through the same rule so the page renderer
//! always sees the same shape: a [`PageAssetSet`] per page name, with
//! hot-update artifacts and unrecognized extensions removed and load order
//! preserved.

pub mod live;
pub mod manifest;
pub mod static_manifest;

pub use live::{LiveAssets, LiveOptions};
pub use manifest::{EntryGroup, ManifestEntry};
pub use static_manifest::{StartupError, StaticAssets, MANIFEST_FILE_NAME};

use crate::runtime_config::RuntimeConfig;
use crate::static_files::StaticFiles;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Marker carried by incremental rebuild outputs (`main.hot-update.js`).
pub const HOT_UPDATE_MARKER: &str = ".hot-update.";

const SCRIPT_EXTENSION: &str = ".js";
const STYLESHEET_EXTENSION: &str = ".css";

/// Ordered script and stylesheet paths for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAssetSet {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl PageAssetSet {
    /// Classify a flat list of paths, keeping their relative order.
    ///
    /// Hot-update artifacts and paths that are neither scripts nor
    /// stylesheets (source maps, images, ...) are dropped.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = PageAssetSet::default();
        for path in paths {
            let path = path.as_ref();
            match AssetKind::classify(path) {
                Some(AssetKind::Script) => set.scripts.push(path.to_string()),
                Some(AssetKind::Stylesheet) => set.styles.push(path.to_string()),
                None => {}
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Stylesheet,
}

impl AssetKind {
    /// Returns `None` for hot-update artifacts and unknown extensions.
    pub fn classify(path: &str) -> Option<Self> {
        if is_hot_update(path) {
            return None;
        }
        if path.ends_with(SCRIPT_EXTENSION) {
            Some(AssetKind::Script)
        } else if path.ends_with(STYLESHEET_EXTENSION) {
            Some(AssetKind::Stylesheet)
        } else {
            None
        }
    }
}

pub fn is_hot_update(path: &str) -> bool {
    path.contains(HOT_UPDATE_MARKER)
}

/// Page name to asset set. Snapshots are immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    pages: BTreeMap<String, PageAssetSet>,
}

impl AssetManifest {
    pub fn new(pages: BTreeMap<String, PageAssetSet>) -> Self {
        Self { pages }
    }

    pub fn get(&self, page: &str) -> Option<&PageAssetSet> {
        self.pages.get(page)
    }

    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Look up `page`, failing with [`AssetError::PageNotFound`].
    pub fn resolve(&self, page: &str) -> Result<PageAssetSet, AssetError> {
        self.pages
            .get(page)
            .cloned()
            .ok_or_else(|| AssetError::PageNotFound {
                page: page.to_string(),
            })
    }
}

impl FromIterator<(String, PageAssetSet)> for AssetManifest {
    fn from_iter<T: IntoIterator<Item = (String, PageAssetSet)>>(iter: T) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Asset resolution failure raised while serving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The page name is absent from the current manifest snapshot.
    PageNotFound { page: String },
    /// The live provider has not produced a complete snapshot yet.
    Snapshot(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::PageNotFound { page } => {
                write!(f, "Invalid page render, page '{page}' not found in asset map")
            }
            AssetError::Snapshot(msg) => write!(f, "Asset snapshot unavailable: {msg}"),
        }
    }
}

impl std::error::Error for AssetError {}

/// Source of page asset lists.
///
/// Implementations own their snapshot; callers only read it. A render never
/// mutates provider state.
pub trait AssetProvider: Send + Sync {
    /// Current manifest snapshot.
    fn manifest(&self) -> Result<Arc<AssetManifest>, AssetError>;

    fn resolve(&self, page: &str) -> Result<PageAssetSet, AssetError> {
        self.manifest()?.resolve(page)
    }

    /// CSS source for a stylesheet that should be inlined rather than linked.
    fn inline_style(&self, _path: &str) -> Option<String> {
        None
    }

    /// Public path prefix under which asset bytes are served.
    fn public_path(&self) -> &str;

    /// URL prefix and file source for the asset bytes as of now. `None` when
    /// the provider does not serve bytes itself.
    fn asset_files(&self) -> Option<(String, &StaticFiles)> {
        None
    }
}

/// Build the provider matching `config.mode`.
///
/// This is the only place the mode is consulted; nothing below the provider
/// re-reads it.
pub fn provider_for(config: &RuntimeConfig) -> Result<Arc<dyn AssetProvider>, StartupError> {
    if config.mode.is_development() {
        info!("Serving development version");
        let options = LiveOptions {
            stats_file: config.stats_file.clone(),
            output_dir: config.live_output_dir.clone(),
            inline_styles: config.inline_styles,
        };
        let live = LiveAssets::watch(options, &config.public_path)?;
        Ok(Arc::new(live))
    } else {
        info!("Serving production version");
        let assets = StaticAssets::load(&config.dist_folder, &config.public_path)?;
        Ok(Arc::new(assets))
    }
}
