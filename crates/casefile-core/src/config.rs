/// Ingestion policy.
///
/// Every field has a default matching the engine's established behaviour,
/// so `IngestConfig::default()` is what most callers want. A config can
/// also be loaded from a JSON file.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// How local file timestamps are recorded.
    pub timestamps: TimestampPolicy,
    /// Follow symbolic links while walking a source tree.
    ///
    /// Off by default, so a link is recorded as a non-file leaf instead of
    /// pulling in content from outside the source tree. When on, the walker
    /// reports a link loop as an error and the add stops there.
    pub follow_links: bool,
    /// Directory-read parallelism for the walker.
    pub parallelism: WalkParallelism,
}

impl IngestConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// How timestamps are recorded on ingested local files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Record all four timestamps as zero.
    #[default]
    Zero,
    /// Read modification, access, creation and change times from the
    /// source filesystem. Times the platform does not report stay zero.
    FromFilesystem,
}

/// Thread usage for reading source directories.
///
/// Entries are always consumed in sorted order on the calling thread,
/// so the created graph does not depend on this setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkParallelism {
    /// Read directories on the calling thread.
    #[default]
    Serial,
    /// One reader per logical CPU.
    Auto,
    /// A fixed-size reader pool.
    Threads(usize),
}

impl WalkParallelism {
    pub(crate) fn to_jwalk(self) -> jwalk::Parallelism {
        match self {
            Self::Serial | Self::Threads(0) | Self::Threads(1) => jwalk::Parallelism::Serial,
            Self::Auto => jwalk::Parallelism::RayonNewPool(num_cpus::get()),
            Self::Threads(n) => jwalk::Parallelism::RayonNewPool(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_behaviour() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.timestamps, TimestampPolicy::Zero);
        assert!(!cfg.follow_links);
        assert_eq!(cfg.parallelism, WalkParallelism::Serial);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: IngestConfig =
            serde_json::from_str(r#"{ "timestamps": "from_filesystem" }"#).unwrap();
        assert_eq!(cfg.timestamps, TimestampPolicy::FromFilesystem);
        assert_eq!(cfg.parallelism, WalkParallelism::Serial);
    }

    #[test]
    fn test_thread_count_parses() {
        let cfg: IngestConfig = serde_json::from_str(
            r#"{ "parallelism": { "threads": 4 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.parallelism, WalkParallelism::Threads(4));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.json");
        std::fs::write(&path, r#"{ "follow_links": true, "parallelism": "auto" }"#).unwrap();

        let cfg = IngestConfig::from_json_file(&path).unwrap();
        assert!(cfg.follow_links);
        assert_eq!(cfg.parallelism, WalkParallelism::Auto);

        assert!(IngestConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
