//! Configuration types deserialized from `freshen.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Default location of the snapshot, relative to the project root.
pub const DEFAULT_SNAPSHOT: &str = ".freshen/cache.json.gz";

/// The top-level configuration parsed from `freshen.toml`.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FreshenConfig {
    /// Snapshot location and lookup mode.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Which files `freshen build` visits.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Settings for the cache snapshot.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Prefix stripped from absolute paths to form cache keys, relative to
    /// the project root.
    #[serde(default = "default_root")]
    pub root: String,
    /// Snapshot file path, relative to the project root.
    #[serde(default = "default_snapshot")]
    pub snapshot: String,
    /// Whether `freshen check` rejects files missing from the snapshot.
    #[serde(default)]
    pub strict: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            snapshot: default_snapshot(),
            strict: false,
        }
    }
}

fn default_root() -> String {
    ".".to_string()
}

fn default_snapshot() -> String {
    DEFAULT_SNAPSHOT.to_string()
}

/// Settings for directory scans.
#[derive(Debug, Deserialize)]
pub struct ScanConfig {
    /// File extensions to include, without the leading dot. Empty means
    /// every regular file.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub extensions: Vec<String>,
    /// Directory names skipped while walking.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            exclude: default_exclude(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec![".git".to_string(), ".freshen".to_string()]
}

impl ScanConfig {
    /// Returns `true` if a file with this path should be scanned.
    pub fn includes_file(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Returns `true` if a directory with this name should be skipped.
    pub fn excludes_dir(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e == name)
    }
}

impl FreshenConfig {
    /// Resolves the snapshot path against the project root.
    pub fn snapshot_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.cache.snapshot)
    }

    /// Resolves the key root against the project root.
    ///
    /// `"."` (the default) maps to the project root itself.
    pub fn root_path(&self, project_dir: &Path) -> PathBuf {
        match self.cache.root.as_str() {
            "" | "." => project_dir.to_path_buf(),
            root => project_dir.join(root),
        }
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `extensions = "js"` (string) and
/// `extensions = ["js", "css"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
