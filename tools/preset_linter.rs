/// Preset Linter — validates preset structure and flags degenerate content.
///
/// Usage: preset_linter <preset_file_or_dir> [--pools <file>]

use prompt_engine::core::pool::StaticPoolProvider;
use prompt_engine::schema::category::{RandomCategory, Scope};
use prompt_engine::schema::group::{SelectionMode, SourceType, TagGroup};
use prompt_engine::schema::preset::Preset;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: preset_linter <preset_file_or_dir> [--pools <file>]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let mut pools_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--pools" && i + 1 < args.len() {
            i += 1;
            pools_path = Some(args[i].clone());
        }
        i += 1;
    }

    let pools = match pools_path {
        Some(ref path) => match StaticPoolProvider::load_from_ron(Path::new(path)) {
            Ok(pools) => {
                println!("Loaded {} pools", pools.len());
                Some(pools)
            }
            Err(e) => {
                eprintln!("ERROR: Failed to load pools: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };

    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else if target.is_dir() {
        let mut files = Vec::new();
        collect_preset_files(target, &mut files);
        files.sort();
        files
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(1);
    };

    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        println!("\n=== {} ===\n", file.display());
        let preset = match Preset::load(file) {
            Ok(preset) => preset,
            Err(e) => {
                println!("ERROR: {}", e);
                total_errors += 1;
                continue;
            }
        };

        let errors: Vec<String> = preset.issues().iter().map(|i| i.to_string()).collect();
        let warnings = lint_preset(&preset, pools.as_ref());

        if errors.is_empty() && warnings.is_empty() {
            println!("All checks passed!");
        }
        for warning in &warnings {
            println!("WARNING: {}", warning);
        }
        for error in &errors {
            println!("ERROR: {}", error);
        }

        total_errors += errors.len();
        total_warnings += warnings.len();
    }

    println!(
        "\nSummary: {} files, {} errors, {} warnings",
        files.len(),
        total_errors,
        total_warnings
    );

    if total_errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_preset_files(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_preset_files(&path, files);
            } else if matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("ron") | Some("json")
            ) {
                files.push(path);
            }
        }
    }
}

/// Legal configuration that will never, or rarely, produce output.
fn lint_preset(preset: &Preset, pools: Option<&StaticPoolProvider>) -> Vec<String> {
    let mut warnings = Vec::new();

    if preset.categories.iter().all(|c| !c.enabled) {
        warnings.push("No enabled categories; every prompt will be empty".to_string());
    }

    for category in &preset.categories {
        lint_category(category, preset, pools, &mut warnings);
    }

    warnings
}

fn lint_category(
    category: &RandomCategory,
    preset: &Preset,
    pools: Option<&StaticPoolProvider>,
    warnings: &mut Vec<String>,
) {
    let path = format!("category '{}'", category.key);

    if category.enabled && category.probability == 0.0 {
        warnings.push(format!("{}: enabled with probability 0", path));
    }
    if category.gender_restriction_enabled && category.applicable_genders.is_empty() {
        warnings.push(format!(
            "{}: gender restriction enabled with no applicable genders",
            path
        ));
    }
    if category.scope == Scope::Character && preset.character_count.is_none() {
        warnings.push(format!(
            "{}: character scope in a preset without characters",
            path
        ));
    }
    if category.groups.is_empty() {
        warnings.push(format!("{}: has no groups", path));
    }
    if category.group_selection_mode == SelectionMode::MultipleNum
        && category.group_select_count > category.groups.len()
    {
        warnings.push(format!(
            "{}: selects {} groups but only has {}",
            path,
            category.group_select_count,
            category.groups.len()
        ));
    }

    for group in &category.groups {
        lint_group(&path, group, pools, warnings);
    }
}

fn lint_group(
    parent: &str,
    group: &TagGroup,
    pools: Option<&StaticPoolProvider>,
    warnings: &mut Vec<String>,
) {
    let path = format!("{} > group '{}'", parent, group.id);

    if group.enabled && group.probability == 0.0 {
        warnings.push(format!("{}: enabled with probability 0", path));
    }

    if group.is_container() {
        for child in &group.children {
            lint_group(&path, child, pools, warnings);
        }
        return;
    }

    match group.source_type {
        SourceType::Custom => {
            if group.tags.is_empty() {
                warnings.push(format!("{}: has no tags", path));
            } else if group.tags.iter().all(|t| t.weight == 0 || !t.enabled)
                && !matches!(
                    group.selection_mode,
                    SelectionMode::All | SelectionMode::Sequential
                )
            {
                warnings.push(format!(
                    "{}: every tag has weight 0 or is disabled; weighted draws select nothing",
                    path
                ));
            }
            if group.selection_mode == SelectionMode::MultipleNum
                && group.select_count > group.tags.len()
            {
                warnings.push(format!(
                    "{}: selects {} tags but only has {}",
                    path,
                    group.select_count,
                    group.tags.len()
                ));
            }
        }
        source_type => {
            if let (Some(pools), Some(id)) = (pools, group.source_id.as_deref()) {
                if !pools.contains(source_type, id) {
                    warnings.push(format!(
                        "{}: {} pool '{}' is not in the loaded pools",
                        path,
                        source_type.as_str(),
                        id
                    ));
                }
            }
        }
    }
}
