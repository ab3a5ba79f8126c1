use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// One year, for content-hashed bundle output.
pub const IMMUTABLE_CACHE_CONTROL: &str = "Cache-Control: public, max-age=31536000, immutable";
pub const NO_CACHE_CONTROL: &str = "Cache-Control: no-cache";

/// File bytes plus the header lines to send with them.
#[derive(Debug)]
pub struct StaticFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub cache_control: &'static str,
}

/// Serves files from a base directory, refusing anything that escapes it.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
    cache_control: &'static str,
}

impl StaticFiles {
    /// Build output with hashed file names: cached for a year.
    pub fn immutable<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
            cache_control: IMMUTABLE_CACHE_CONTROL,
        }
    }

    /// Development output that changes on every rebuild.
    pub fn no_cache<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base_dir: base.as_ref().to_path_buf(),
            cache_control: NO_CACHE_CONTROL,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => {
                    // A backslash is a separator on some platforms; never let it through.
                    if s.to_str().map_or(true, |s| s.contains('\\')) {
                        return None;
                    }
                    pb.push(s)
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Full `Content-Type` header line for a file.
    pub fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "Content-Type: text/html; charset=utf-8",
            "css" => "Content-Type: text/css; charset=utf-8",
            "js" | "mjs" => "Content-Type: application/javascript; charset=utf-8",
            "json" | "map" => "Content-Type: application/json",
            "txt" => "Content-Type: text/plain; charset=utf-8",
            "svg" => "Content-Type: image/svg+xml",
            "png" => "Content-Type: image/png",
            "jpg" | "jpeg" => "Content-Type: image/jpeg",
            "gif" => "Content-Type: image/gif",
            "webp" => "Content-Type: image/webp",
            "ico" => "Content-Type: image/x-icon",
            "woff" => "Content-Type: font/woff",
            "woff2" => "Content-Type: font/woff2",
            "ttf" => "Content-Type: font/ttf",
            _ => "Content-Type: application/octet-stream",
        }
    }

    /// Load a regular file below the base directory. Directories (and
    /// therefore index files) are never resolved.
    pub fn load(&self, url_path: &str) -> io::Result<StaticFile> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok(StaticFile {
            bytes,
            content_type: Self::content_type(&path),
            cache_control: self.cache_control,
        })
    }
}
