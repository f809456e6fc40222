//! The `freshen check` command: look files up against the project snapshot.

use std::path::Path;

use freshen_cache::{CacheError, ChangeCache, FactsResult};
use serde_json::{json, Value};

use crate::pipeline::{absolutize, fact_flags, load_project_config, path_string, resolve_project_root};
use crate::{CheckArgs, GlobalArgs};

/// Outcome of looking up one requested file.
struct CheckOutcome {
    path: String,
    key: String,
    result: Result<FactsResult, CacheError>,
}

/// Runs the `freshen check` command.
///
/// Strict mode comes from `--strict` or `cache.strict` in the config. Returns
/// exit code 1 if any lookup failed.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = load_project_config(&project_dir, global)?;

    let snapshot_path = match args.snapshot {
        Some(ref snapshot) => absolutize(snapshot)?,
        None => config.snapshot_path(&project_dir),
    };
    let root = path_string(&config.root_path(&project_dir));
    let strict = args.strict || config.cache.strict;

    let mut cache = open_cache(&snapshot_path, root, strict)?;

    let mut outcomes = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let path = absolutize(file)?;
        outcomes.push(CheckOutcome {
            path: path_string(&path),
            key: cache.normalize_key(&path),
            result: cache.lookup(&path),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&outcomes))?);
    } else {
        print_text(&outcomes);
    }

    if args.update && !strict {
        cache.save_to_file(&snapshot_path)?;
        if !global.quiet {
            eprintln!("    Updated {}", snapshot_path.display());
        }
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        if !global.quiet {
            eprintln!("error: {failed} of {} lookup(s) failed", outcomes.len());
        }
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Opens the snapshot in the requested mode.
///
/// A strict check has nothing to answer from without a snapshot, so a
/// missing one is an error there; a permissive check starts empty.
fn open_cache(
    snapshot_path: &Path,
    root: String,
    strict: bool,
) -> Result<ChangeCache, Box<dyn std::error::Error>> {
    if snapshot_path.is_file() {
        let mut cache = ChangeCache::load_from_file(snapshot_path, root)?;
        cache.set_strict_mode(strict);
        Ok(cache)
    } else if strict {
        Err(format!(
            "no snapshot at {} (run `freshen build` first)",
            snapshot_path.display()
        )
        .into())
    } else {
        Ok(ChangeCache::new(root))
    }
}

fn print_text(outcomes: &[CheckOutcome]) {
    for outcome in outcomes {
        match outcome.result {
            Ok(ref result) => println!(
                "{}  {}  {}",
                result.hash(),
                fact_flags(result.facts()).join(","),
                outcome.path
            ),
            Err(ref e) => eprintln!("error: {e}"),
        }
    }
}

fn report_json(outcomes: &[CheckOutcome]) -> Value {
    let items = outcomes
        .iter()
        .map(|outcome| match outcome.result {
            Ok(ref result) => json!({
                "path": outcome.path,
                "key": outcome.key,
                "facts": result.facts(),
            }),
            Err(ref e) => json!({
                "path": outcome.path,
                "key": outcome.key,
                "error": e.to_string(),
            }),
        })
        .collect();
    Value::Array(items)
}
