//! The `freshen inspect` command: list the entries of a snapshot.

use std::collections::BTreeMap;

use freshen_cache::{CacheEntry, ChangeCache};
use serde_json::Value;

use crate::pipeline::{absolutize, fact_flags, load_project_config, resolve_project_root};
use crate::{GlobalArgs, InspectArgs};

/// Runs the `freshen inspect` command.
///
/// Text output is one line per entry: key, size, change time, hash, and
/// fact flags, tab-separated and sorted by key.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let snapshot_path = match args.snapshot {
        Some(ref snapshot) => absolutize(snapshot)?,
        None => {
            let project_dir = resolve_project_root(global)?;
            load_project_config(&project_dir, global)?.snapshot_path(&project_dir)
        }
    };

    let cache = ChangeCache::load_from_file(&snapshot_path, "")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&cache)?)?);
    } else {
        for line in report_lines(&cache) {
            println!("{line}");
        }
        if !global.quiet {
            eprintln!(
                "   {} entr{} in {}",
                cache.len(),
                if cache.len() == 1 { "y" } else { "ies" },
                snapshot_path.display()
            );
        }
    }

    Ok(0)
}

/// One text line per entry, in key order.
fn report_lines(cache: &ChangeCache) -> Vec<String> {
    cache
        .entries()
        .map(|(key, entry)| entry_line(key, entry))
        .collect()
}

/// The key → entry map as JSON.
fn report_json(cache: &ChangeCache) -> serde_json::Result<Value> {
    let entries: BTreeMap<&str, &CacheEntry> = cache.entries().collect();
    serde_json::to_value(entries)
}

fn entry_line(key: &str, entry: &CacheEntry) -> String {
    format!(
        "{key}\t{}\t{}\t{}\t{}",
        entry.size,
        entry.timestamp,
        entry.facts.hash,
        fact_flags(&entry.facts).join(",")
    )
}
