//! Configuration management for filesplit

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default block size: 512 KiB
pub const DEFAULT_BLOCK_SIZE: u64 = 512 * 1024;

/// Default worker count (fully sequential)
pub const DEFAULT_WORKERS: usize = 1;

/// Split configuration, as read from a config file or assembled by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// File to split
    pub source: PathBuf,

    /// Maximum bytes per part file
    pub block_size: u64,

    /// Number of parallel workers
    pub workers: usize,

    /// Hash the whole file before splitting and verify the parts against it
    pub verify: bool,

    /// Directory the part files and manifest are written to
    pub output_dir: PathBuf,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            source: PathBuf::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            workers: DEFAULT_WORKERS,
            verify: true,
            output_dir: PathBuf::from("."),
        }
    }
}

impl SplitConfig {
    /// Create a config for a source file with default settings
    pub fn new<P: Into<PathBuf>>(source: P) -> Self {
        SplitConfig {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a file, with environment variable overrides
    ///
    /// The source path is usually supplied on the command line, so it is
    /// not validated here.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: SplitConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        config.apply_env_overrides();
        config.validate_limits()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(block_size) = std::env::var("FILESPLIT_BLOCK_SIZE") {
            if let Ok(size) = block_size.trim().parse::<u64>() {
                self.block_size = size;
            }
        }

        if let Ok(workers) = std::env::var("FILESPLIT_WORKERS") {
            if let Ok(n) = workers.trim().parse::<usize>() {
                self.workers = n;
            }
        }

        if let Ok(dir) = std::env::var("FILESPLIT_OUTPUT_DIR") {
            let dir = dir.trim();
            if !dir.is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate_limits(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig(
                "Block size must be greater than 0".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "Worker count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_limits()?;

        if self.source.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("Source file is required".to_string()));
        }

        Ok(())
    }
}

/// Immutable description of one split operation
///
/// Built once by [`SplitJob::prepare`] after the source has been checked;
/// nothing in it changes while workers run.
#[derive(Debug, Clone)]
pub struct SplitJob {
    source: PathBuf,
    base_name: String,
    size: u64,
    block_size: u64,
    workers: usize,
    output_dir: PathBuf,
    verify: bool,
}

impl SplitJob {
    /// Validate a configuration against the filesystem and freeze it
    pub fn prepare(config: &SplitConfig) -> Result<Self> {
        config.validate()?;

        let metadata = std::fs::metadata(&config.source)
            .map_err(|_| Error::SourceNotFound(config.source.clone()))?;
        if !metadata.is_file() {
            return Err(Error::SourceNotFound(config.source.clone()));
        }

        // Fail on unreadable sources before any worker opens its own handle
        File::open(&config.source).map_err(|source| Error::SourceUnreadable {
            path: config.source.clone(),
            source,
        })?;

        let base_name = config
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::SourceNotFound(config.source.clone()))?;

        std::fs::create_dir_all(&config.output_dir).map_err(|source| Error::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;

        debug!(
            source = %config.source.display(),
            size = metadata.len(),
            "Prepared split job"
        );

        Ok(SplitJob {
            source: config.source.clone(),
            base_name,
            size: metadata.len(),
            block_size: config.block_size,
            workers: config.workers,
            output_dir: config.output_dir.clone(),
            verify: config.verify,
        })
    }

    /// Path of the file being split
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Final path component of the source, used to name parts
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Source size in bytes at preparation time
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Whether the whole-file digest is computed and checked
    pub fn verify(&self) -> bool {
        self.verify
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = SplitConfig::new("data.bin");
        assert_eq!(config.block_size, 524_288);
        assert_eq!(config.workers, 1);
        assert!(config.verify);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = SplitConfig::new("data.bin");
        config.block_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SplitConfig::new("data.bin");
        config.workers = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = SplitConfig::default();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = SplitConfig::new("big.iso");
        config.block_size = 4096;
        config.verify = false;
        config.save(&path).unwrap();

        let loaded = SplitConfig::load(&path).unwrap();
        assert_eq!(loaded.source, PathBuf::from("big.iso"));
        assert!(!loaded.verify);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "verify": false }"#).unwrap();

        let loaded = SplitConfig::load(&path).unwrap();
        assert!(!loaded.verify);
        assert!(loaded.source.as_os_str().is_empty());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(SplitConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_prepare_job() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("input.dat");
        std::fs::write(&source, vec![7u8; 1000]).unwrap();

        let mut config = SplitConfig::new(&source);
        config.output_dir = dir.path().join("out/nested");
        let job = SplitJob::prepare(&config).unwrap();

        assert_eq!(job.size(), 1000);
        assert_eq!(job.base_name(), "input.dat");
        assert!(job.output_dir().is_dir());
    }

    #[test]
    fn test_prepare_missing_source() {
        let dir = tempdir().unwrap();
        let config = SplitConfig::new(dir.path().join("missing"));

        let err = SplitJob::prepare(&config).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
        assert_eq!(err.stage(), Stage::Validation);
    }

    #[test]
    fn test_prepare_output_dir_under_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("input.dat");
        std::fs::write(&source, b"data").unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let mut config = SplitConfig::new(&source);
        config.output_dir = blocker.join("out");

        let err = SplitJob::prepare(&config).unwrap_err();
        assert!(matches!(err, Error::OutputDir { .. }));
        assert_eq!(err.stage(), Stage::Validation);
    }

    #[test]
    fn test_prepare_directory_source() {
        let dir = tempdir().unwrap();
        let config = SplitConfig::new(dir.path());

        assert!(matches!(
            SplitJob::prepare(&config),
            Err(Error::SourceNotFound(_))
        ));
    }
}
