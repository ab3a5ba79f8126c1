use super::manifest::parse_manifest;
use super::{AssetError, AssetManifest, AssetProvider};
use crate::static_files::StaticFiles;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Manifest file written next to the bundle by the production build.
pub const MANIFEST_FILE_NAME: &str = "assets.json";

/// Conditions that make serving impossible. The process entry point decides
/// to terminate; library code only reports.
#[derive(Debug)]
pub enum StartupError {
    DistFolderMissing(PathBuf),
    ManifestMissing(PathBuf),
    ManifestUnreadable { path: PathBuf, source: io::Error },
    ManifestInvalid { path: PathBuf, source: serde_json::Error },
    StatsWatch(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::DistFolderMissing(path) => write!(
                f,
                "Distribution folder ({}) is missing - did you remember to build before running?",
                path.display()
            ),
            StartupError::ManifestMissing(path) => write!(
                f,
                "Assets information ({}) is missing - did you remember to build before running?",
                path.display()
            ),
            StartupError::ManifestUnreadable { path, source } => {
                write!(f, "Failed to read assets information ({}): {source}", path.display())
            }
            StartupError::ManifestInvalid { path, source } => {
                write!(f, "Assets information ({}) is not valid JSON: {source}", path.display())
            }
            StartupError::StatsWatch(msg) => write!(f, "Failed to watch compilation stats: {msg}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::ManifestUnreadable { source, .. } => Some(source),
            StartupError::ManifestInvalid { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Production asset provider backed by `<dist>/assets.json`.
///
/// Loaded once before the server accepts connections; never reloaded.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    dist_folder: PathBuf,
    public_path: String,
    manifest: Arc<AssetManifest>,
    files: StaticFiles,
}

impl StaticAssets {
    /// Validate the dist folder and load its manifest.
    ///
    /// Nothing is loaded unless both the folder and the manifest file exist.
    pub fn load<P: AsRef<Path>>(dist_folder: P, public_path: &str) -> Result<Self, StartupError> {
        let dist_folder = dist_folder.as_ref().to_path_buf();
        if !dist_folder.is_dir() {
            return Err(StartupError::DistFolderMissing(dist_folder));
        }
        let manifest_path = dist_folder.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(StartupError::ManifestMissing(manifest_path));
        }

        let source = fs::read_to_string(&manifest_path).map_err(|source| {
            StartupError::ManifestUnreadable {
                path: manifest_path.clone(),
                source,
            }
        })?;
        let manifest = parse_manifest(&source).map_err(|source| StartupError::ManifestInvalid {
            path: manifest_path.clone(),
            source,
        })?;

        info!(
            manifest = %manifest_path.display(),
            pages = manifest.len(),
            "Loaded asset manifest"
        );
        for page in manifest.page_names() {
            debug!(page = %page, "manifest page");
        }

        Ok(Self {
            files: StaticFiles::immutable(&dist_folder),
            dist_folder,
            public_path: public_path.to_string(),
            manifest: Arc::new(manifest),
        })
    }

    pub fn dist_folder(&self) -> &Path {
        &self.dist_folder
    }
}

impl AssetProvider for StaticAssets {
    fn manifest(&self) -> Result<Arc<AssetManifest>, AssetError> {
        Ok(Arc::clone(&self.manifest))
    }

    fn public_path(&self) -> &str {
        &self.public_path
    }

    fn asset_files(&self) -> Option<(String, &StaticFiles)> {
        Some((self.public_path.clone(), &self.files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dist_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("dist");
        match StaticAssets::load(&missing, "/") {
            Err(StartupError::DistFolderMissing(p)) => assert_eq!(p, missing),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = StaticAssets::load(dir.path(), "/").unwrap_err();
        assert!(matches!(err, StartupError::ManifestMissing(_)));
        assert!(err.to_string().contains("assets.json"));
    }

    #[test]
    fn test_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE_NAME), "{not json").unwrap();
        let err = StaticAssets::load(dir.path(), "/").unwrap_err();
        assert!(matches!(err, StartupError::ManifestInvalid { .. }));
    }
}
