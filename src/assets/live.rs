//! # Live Assets
//!
//! Development-mode provider that follows a bundler running in watch mode.
//!
//! The bundler writes its compilation stats (`stats.json`) after every
//! rebuild. This module watches that file, normalizes each complete
//! compilation into an [`AssetManifest`] and publishes it through an
//! [`ArcSwapOption`] so request handling reads a snapshot without locking.
//!
//! ## Stats format
//!
//! ```json
//! {
//!   "publicPath": "/",
//!   "entrypoints": {
//!     "home": { "assets": [ { "name": "home.js" }, "home.css" ] }
//!   }
//! }
//! ```
//!
//! Older bundlers emit asset names as plain strings, newer ones as objects;
//! both are flattened the same way as the production manifest.
//!
//! ## Rebuilds in flight
//!
//! A request never waits for a compilation. While the bundler is mid-write
//! (unparseable file) or reports a build in progress, the previous complete
//! snapshot keeps being served; it is replaced only once the next complete
//! stats document has been read. Until the first one arrives, resolution
//! fails with [`AssetError::Snapshot`].

use super::manifest::ManifestEntry;
use super::{AssetError, AssetManifest, AssetProvider, PageAssetSet, StartupError};
use crate::static_files::StaticFiles;
use arc_swap::ArcSwapOption;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Compilation stats written by the bundler.
    pub stats_file: PathBuf,
    /// Directory the bundler emits assets into.
    pub output_dir: PathBuf,
    /// Emit stylesheets as inline `<style>` blocks.
    pub inline_styles: bool,
}

#[derive(Debug, Deserialize)]
struct CompilationStats {
    #[serde(rename = "publicPath", default)]
    public_path: Option<String>,
    #[serde(default)]
    entrypoints: BTreeMap<String, ManifestEntry>,
    #[serde(default)]
    building: bool,
    #[serde(default)]
    status: Option<String>,
}

impl CompilationStats {
    fn in_progress(&self) -> bool {
        self.building
            || matches!(self.status.as_deref(), Some("compiling") | Some("building"))
    }
}

/// One complete compilation.
#[derive(Debug)]
pub struct LiveSnapshot {
    pub public_path: String,
    pub manifest: Arc<AssetManifest>,
}

/// Outcome of reading the stats file once.
#[derive(Debug)]
pub enum StatsRead {
    Complete(LiveSnapshot),
    InProgress,
    Unreadable(String),
}

/// Assets listed for one entrypoint: its `assets` member when it has one,
/// otherwise every path it contains.
fn entrypoint_assets(entry: &ManifestEntry) -> Vec<String> {
    match entry {
        ManifestEntry::Group(fields) => match fields.get("assets") {
            Some(assets) => assets.flatten(),
            None => entry.flatten(),
        },
        other => other.flatten(),
    }
}

fn join_public_path(public_path: &str, name: &str) -> String {
    if name.starts_with('/') && public_path.ends_with('/') {
        format!("{}{}", public_path.trim_end_matches('/'), name)
    } else {
        format!("{public_path}{name}")
    }
}

/// Parse a stats document into a snapshot.
///
/// `fallback_public_path` is used when the stats omit `publicPath` or
/// report `auto`.
pub fn parse_stats(source: &str, fallback_public_path: &str) -> StatsRead {
    let stats: CompilationStats = match serde_json::from_str(source) {
        Ok(stats) => stats,
        Err(err) => return StatsRead::Unreadable(err.to_string()),
    };
    if stats.in_progress() {
        return StatsRead::InProgress;
    }

    let public_path = match stats.public_path.as_deref() {
        None | Some("auto") | Some("") => fallback_public_path.to_string(),
        Some(p) => p.to_string(),
    };

    let manifest: AssetManifest = stats
        .entrypoints
        .iter()
        .map(|(page, entry)| {
            let paths = entrypoint_assets(entry)
                .into_iter()
                .map(|name| join_public_path(&public_path, &name));
            (page.clone(), PageAssetSet::from_paths(paths))
        })
        .collect();

    StatsRead::Complete(LiveSnapshot {
        public_path,
        manifest: Arc::new(manifest),
    })
}

fn read_stats(path: &Path, fallback_public_path: &str) -> StatsRead {
    match fs::read_to_string(path) {
        Ok(source) => parse_stats(&source, fallback_public_path),
        Err(err) => StatsRead::Unreadable(err.to_string()),
    }
}

/// Shared snapshot cell: written by the watcher, read by requests.
#[derive(Debug, Default)]
struct SnapshotCell {
    current: ArcSwapOption<LiveSnapshot>,
}

impl SnapshotCell {
    /// Apply a stats read. Returns `true` when a new snapshot was published.
    fn apply(&self, read: StatsRead) -> bool {
        match read {
            StatsRead::Complete(snapshot) => {
                info!(
                    pages = snapshot.manifest.len(),
                    public_path = %snapshot.public_path,
                    "live assets: compilation snapshot updated"
                );
                self.current.store(Some(Arc::new(snapshot)));
                true
            }
            StatsRead::InProgress => {
                debug!("live assets: compilation in progress, keeping previous snapshot");
                false
            }
            StatsRead::Unreadable(err) => {
                debug!(error = %err, "live assets: stats not readable, keeping previous snapshot");
                false
            }
        }
    }
}

/// Development asset provider.
pub struct LiveAssets {
    options: LiveOptions,
    public_path: String,
    cell: Arc<SnapshotCell>,
    output: StaticFiles,
    _watcher: Option<Mutex<RecommendedWatcher>>,
}

impl LiveAssets {
    /// Provider that is refreshed only through [`LiveAssets::refresh`].
    pub fn new(options: LiveOptions, public_path: &str) -> Self {
        let output = StaticFiles::no_cache(&options.output_dir);
        Self {
            options,
            public_path: public_path.to_string(),
            cell: Arc::new(SnapshotCell::default()),
            output,
            _watcher: None,
        }
    }

    /// Read the stats once, then keep following them with a filesystem
    /// watcher on the containing directory.
    ///
    /// A missing stats file is not an error: the bundler may still be
    /// producing its first compilation.
    pub fn watch(options: LiveOptions, public_path: &str) -> Result<Self, StartupError> {
        let mut live = Self::new(options, public_path);
        if !live.refresh() {
            warn!(
                stats = %live.options.stats_file.display(),
                "live assets: waiting for the first complete compilation"
            );
        }

        let stats_file = live.options.stats_file.clone();
        let watch_dir = stats_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let cell = Arc::clone(&live.cell);
        let fallback = live.public_path.clone();
        let file_name = stats_file.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let touches_stats = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_stats {
                        cell.apply(read_stats(&stats_file, &fallback));
                    }
                }
                Err(e) => warn!(error = ?e, "live assets: watch error"),
            },
            Config::default(),
        )
        .map_err(|e| StartupError::StatsWatch(e.to_string()))?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| StartupError::StatsWatch(format!("{}: {e}", watch_dir.display())))?;
        info!(stats = %live.options.stats_file.display(), "live assets: watching compilation stats");

        live._watcher = Some(Mutex::new(watcher));
        Ok(live)
    }

    /// Re-read the stats file now. Returns `true` when a new snapshot was
    /// published; otherwise the previous one stays in place.
    pub fn refresh(&self) -> bool {
        self.cell
            .apply(read_stats(&self.options.stats_file, &self.public_path))
    }

    pub fn options(&self) -> &LiveOptions {
        &self.options
    }

    /// Static file source for the bundler's output directory.
    pub fn output_files(&self) -> &StaticFiles {
        &self.output
    }

    /// Public path of the current compilation, or the configured one before
    /// the first compilation.
    pub fn current_public_path(&self) -> String {
        self.cell
            .current
            .load_full()
            .map_or_else(|| self.public_path.clone(), |s| s.public_path.clone())
    }
}

impl AssetProvider for LiveAssets {
    fn manifest(&self) -> Result<Arc<AssetManifest>, AssetError> {
        self.cell
            .current
            .load_full()
            .map(|snapshot| Arc::clone(&snapshot.manifest))
            .ok_or_else(|| {
                AssetError::Snapshot("no complete compilation has been observed yet".to_string())
            })
    }

    fn inline_style(&self, path: &str) -> Option<String> {
        if !self.options.inline_styles {
            return None;
        }
        let snapshot = self.cell.current.load_full()?;
        let relative = path
            .strip_prefix(snapshot.public_path.as_str())
            .unwrap_or(path);
        let file = self.output.load(relative).ok()?;
        String::from_utf8(file.bytes).ok()
    }

    fn public_path(&self) -> &str {
        &self.public_path
    }

    fn asset_files(&self) -> Option<(String, &StaticFiles)> {
        Some((self.current_public_path(), self.output_files()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(read: StatsRead) -> LiveSnapshot {
        match read {
            StatsRead::Complete(snapshot) => snapshot,
            other => panic!("expected complete stats, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_object_assets() {
        let snapshot = complete(parse_stats(
            r#"{"publicPath": "/static/", "entrypoints": {"home": {"name": "home", "assets": [
                {"name": "runtime.js", "size": 10},
                {"name": "home.css"},
                {"name": "home.4f2a.hot-update.js"},
                {"name": "home.js.map"}
            ]}}}"#,
            "/",
        ));
        let home = snapshot.manifest.get("home").unwrap();
        assert_eq!(home.scripts, vec!["/static/runtime.js"]);
        assert_eq!(home.styles, vec!["/static/home.css"]);
    }

    #[test]
    fn test_parse_string_assets_and_fallback_public_path() {
        let snapshot = complete(parse_stats(
            r#"{"publicPath": "auto", "entrypoints": {"admin": {"assets": ["admin.js", "admin.css"]}}}"#,
            "/dev/",
        ));
        assert_eq!(snapshot.public_path, "/dev/");
        let admin = snapshot.manifest.get("admin").unwrap();
        assert_eq!(admin.scripts, vec!["/dev/admin.js"]);
        assert_eq!(admin.styles, vec!["/dev/admin.css"]);
    }

    #[test]
    fn test_parse_in_progress_and_garbage() {
        assert!(matches!(
            parse_stats(r#"{"building": true, "entrypoints": {}}"#, "/"),
            StatsRead::InProgress
        ));
        assert!(matches!(
            parse_stats(r#"{"status": "compiling"}"#, "/"),
            StatsRead::InProgress
        ));
        assert!(matches!(parse_stats(r#"{"entrypoints": {"#, "/"), StatsRead::Unreadable(_)));
    }

    #[test]
    fn test_join_public_path() {
        assert_eq!(join_public_path("/", "/a.js"), "/a.js");
        assert_eq!(join_public_path("/assets/", "a.js"), "/assets/a.js");
    }
}
