//! The `freshen build` command: scan a directory and write a snapshot.
//!
//! An existing snapshot at the output path is loaded first so unchanged
//! files are answered from metadata alone. Entries inside the scanned tree
//! that the scan no longer finds are dropped before saving; entries outside
//! it are kept.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use freshen_cache::ChangeCache;
use tracing::warn;

use crate::pipeline::{absolutize, discover_files, load_project_config, path_string, resolve_project_root};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `freshen build` command.
///
/// Returns exit code 0 when every file was cached, 1 if any lookup failed.
/// The snapshot is written in both cases.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = load_project_config(&project_dir, global)?;

    let scan_dir = match args.dir {
        Some(ref dir) => absolutize(dir)?,
        None => project_dir.clone(),
    };
    let snapshot_path = match args.out {
        Some(ref out) => absolutize(out)?,
        None => config.snapshot_path(&project_dir),
    };
    let root = path_string(&config.root_path(&project_dir));

    let mut cache = warm_cache(&snapshot_path, root, args.clean);
    let previous = cache.len();

    let files: Vec<PathBuf> = discover_files(&scan_dir, &config.scan)?
        .into_iter()
        .filter(|file| *file != snapshot_path)
        .collect();

    if !global.quiet {
        eprintln!(
            "   Scanning {} file(s) in {}",
            files.len(),
            scan_dir.display()
        );
    }

    let mut visited = BTreeSet::new();
    let mut failures = 0usize;
    for file in &files {
        match cache.lookup(file) {
            Ok(result) => {
                if global.verbose {
                    eprintln!("   {} {}", result.hash(), file.display());
                }
                visited.insert(cache.normalize_key(file));
            }
            Err(e) => {
                eprintln!("warning: {e}");
                failures += 1;
            }
        }
    }

    let scan_key = cache.normalize_key(&scan_dir);
    let root_in_scan = Path::new(cache.root()).starts_with(&scan_dir);
    let removed = cache.retain(|key, _| {
        visited.contains(key) || !in_scan_scope(key, &scan_key, root_in_scan)
    });
    cache.save_to_file(&snapshot_path)?;

    if !global.quiet {
        let stats = cache.stats();
        eprintln!(
            "     Cached {} file(s): {} unchanged, {} new, {} rehashed, {} removed ({} previously)",
            cache.len(),
            stats.hits,
            stats.misses,
            stats.rehashes,
            removed,
            previous
        );
        eprintln!("      Wrote {}", snapshot_path.display());
    }

    if failures > 0 {
        eprintln!("error: {failures} file(s) could not be cached");
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Returns `true` if the entry stored under `key` lies in the scanned tree.
///
/// `scan_key` is the scan directory in key form. When the key root itself
/// sits inside the scan directory every entry is in scope.
fn in_scan_scope(key: &str, scan_key: &str, root_in_scan: bool) -> bool {
    if root_in_scan || scan_key.is_empty() {
        return true;
    }
    key.strip_prefix(scan_key)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '\\']))
}

/// Loads the snapshot at `path` as a permissive cache, or starts empty.
///
/// A missing snapshot is the normal first-run case; an unreadable or corrupt
/// one is reported and rebuilt from scratch.
fn warm_cache(path: &Path, root: String, clean: bool) -> ChangeCache {
    if clean || !path.is_file() {
        return ChangeCache::new(root);
    }
    match ChangeCache::load_from_file(path, root.clone()) {
        Ok(mut cache) => {
            cache.set_strict_mode(false);
            cache
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding unusable snapshot");
            ChangeCache::new(root)
        }
    }
}
