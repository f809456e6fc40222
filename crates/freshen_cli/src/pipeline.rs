//! Shared helpers for CLI commands.
//!
//! Project root resolution, configuration loading, file discovery, and the
//! small formatting pieces `build`, `check`, and `inspect` have in common.

use std::path::{Path, PathBuf};

use freshen_cache::FileFacts;
use freshen_config::{
    load_config_file, load_config_or_default, FreshenConfig, ScanConfig, CONFIG_FILE,
};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing
/// `freshen.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `freshen.toml`,
/// falling back to the current directory itself.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let root = if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            p.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            p
        }
    } else {
        let cwd = std::env::current_dir()?;
        find_project_root(&cwd).unwrap_or(cwd)
    };
    absolutize(&root)
}

/// Loads the project configuration.
///
/// An explicit `--config` file is read as-is; otherwise `freshen.toml` in the
/// project root is used when present, and the defaults when not.
pub fn load_project_config(
    project_dir: &Path,
    global: &GlobalArgs,
) -> Result<FreshenConfig, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = Path::new(config_path);
        if p.is_file() {
            return Ok(load_config_file(p)?);
        }
    }
    Ok(load_config_or_default(project_dir)?)
}

/// Makes `path` absolute, resolving symlinks when it exists.
///
/// Paths that do not exist yet are joined onto the current directory so
/// they still produce a stable cache key.
pub fn absolutize(path: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match std::fs::canonicalize(path) {
        Ok(p) => Ok(p),
        Err(_) if path.is_absolute() => Ok(path.to_path_buf()),
        Err(_) => Ok(std::env::current_dir()?.join(path)),
    }
}

/// Renders a path as the string form the cache keys against.
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Discovers the files under `dir` that the scan configuration selects.
///
/// Excluded directory names are skipped at every depth. The result is
/// sorted by path.
pub fn discover_files(
    dir: &Path,
    scan: &ScanConfig,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    walk_dir(dir, scan, &mut files)?;
    files.sort();
    Ok(files)
}

/// Recursively walks a directory collecting selected files.
fn walk_dir(
    dir: &Path,
    scan: &ScanConfig,
    files: &mut Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let name = entry.file_name();
            if !scan.excludes_dir(&name.to_string_lossy()) {
                walk_dir(&path, scan, files)?;
            }
        } else if file_type.is_file() && scan.includes_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Short labels for the facts of one file, in a fixed order.
pub fn fact_flags(facts: &FileFacts) -> Vec<&'static str> {
    let mut flags = vec![if facts.is_file_binary { "binary" } else { "text" }];
    if facts.is_minified {
        flags.push("minified");
    }
    if facts.is_in_dependency_directory {
        flags.push("dependency");
    }
    if facts.has_source_map_reference {
        flags.push("source-map");
    }
    flags
}
