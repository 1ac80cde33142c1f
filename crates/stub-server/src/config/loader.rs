//! Route table loading.
//!
//! [`ConfigLoader`] never caches: each [`RouteTableSource::load`] call resolves
//! the locator and reads the file again.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::StubServerConfig;
use crate::error::StubError;

/// Extensions tried, in order, when the locator itself is not a file.
pub const CONFIG_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Something that yields a fresh route table snapshot on demand.
#[async_trait]
pub trait RouteTableSource: Send + Sync {
    async fn load(&self) -> Result<StubServerConfig, StubError>;

    /// Directory relative stub targets are resolved against.
    fn base_dir(&self) -> &Path;
}

/// File-backed route table.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    locator: PathBuf,
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(locator: impl Into<PathBuf>) -> Self {
        let locator = locator.into();
        let base_dir = match locator.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self { locator, base_dir }
    }

    pub fn locator(&self) -> &Path {
        &self.locator
    }

    /// Paths tried when resolving the locator.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.locator.clone()];
        for ext in CONFIG_EXTENSIONS {
            let mut with_ext = self.locator.clone().into_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            candidates.push(PathBuf::from(with_ext));
        }
        candidates
    }

    /// Resolve the locator to an existing file.
    pub async fn locate(&self) -> Result<PathBuf, StubError> {
        let candidates = self.candidates();
        for candidate in &candidates {
            if let Ok(metadata) = tokio::fs::metadata(candidate).await {
                if metadata.is_file() {
                    return Ok(candidate.clone());
                }
            }
        }
        Err(StubError::ConfigNotFound {
            locator: self.locator.display().to_string(),
            attempted: candidates,
        })
    }
}

#[async_trait]
impl RouteTableSource for ConfigLoader {
    async fn load(&self) -> Result<StubServerConfig, StubError> {
        let path = self.locate().await?;
        let contents = tokio::fs::read_to_string(&path).await?;
        debug!("Loaded route table from {}", path.display());
        StubServerConfig::parse(&path, &contents)
    }

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_candidates_append_extensions() {
        let loader = ConfigLoader::new("stubs/config");
        let candidates = loader.candidates();
        assert_eq!(candidates[0], PathBuf::from("stubs/config"));
        assert_eq!(candidates[1], PathBuf::from("stubs/config.yaml"));
        assert_eq!(candidates[3], PathBuf::from("stubs/config.json"));
        assert_eq!(loader.base_dir(), Path::new("stubs"));
    }

    #[test]
    fn test_base_dir_for_bare_file_name() {
        let loader = ConfigLoader::new("config.yaml");
        assert_eq!(loader.base_dir(), Path::new("."));
    }

    #[tokio::test]
    async fn test_load_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "routes:\n  /a:\n    GET: a.json\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path().join("config"));
        let config = loader.load().await.unwrap();
        assert!(config.routes.contains_key("/a"));
    }

    #[tokio::test]
    async fn test_load_reflects_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "routes:\n  /a:\n    GET: a.json\n").unwrap();

        let loader = ConfigLoader::new(&path);
        assert!(loader.load().await.unwrap().routes.contains_key("/a"));

        fs::write(&path, "routes:\n  /b:\n    GET: b.json\n").unwrap();
        let config = loader.load().await.unwrap();
        assert!(config.routes.contains_key("/b"));
        assert!(!config.routes.contains_key("/a"));
    }

    #[tokio::test]
    async fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("missing"));
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, StubError::ConfigNotFound { ref attempted, .. } if attempted.len() == 4));
        assert!(err.to_string().contains("Cannot find module"));
        assert!(err.to_string().contains("missing.json"));
    }
}
