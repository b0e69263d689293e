/// Preview — interactive generation shell for trying out presets.
///
/// Usage: preview --preset <path> [--pools <path>] [--sequences <path>] [--seed <n>]
///
/// Commands:
///   gen [n]          — generate n prompts (default 1) from consecutive seeds
///   seed <n>         — set the next seed
///   mode v4|legacy   — character sub-prompts or a single folded prompt
///   json             — toggle JSON output
///   stats <n>        — generate n prompts and report token frequencies
///   help             — list commands
///   quit             — exit

use prompt_engine::core::generator::PromptGenerator;
use prompt_engine::core::pool::{CachedPoolProvider, StaticPoolProvider};
use prompt_engine::core::sequence::{FileSequenceStore, MemorySequenceStore, SequenceStore};
use prompt_engine::schema::preset::Preset;
use prompt_engine::schema::result::GenerationResult;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut preset_path = None;
    let mut pools_path = None;
    let mut sequences_path = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--preset" if i + 1 < args.len() => {
                i += 1;
                preset_path = Some(args[i].clone());
            }
            "--pools" if i + 1 < args.len() => {
                i += 1;
                pools_path = Some(args[i].clone());
            }
            "--sequences" if i + 1 < args.len() => {
                i += 1;
                sequences_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(preset_path) = preset_path else {
        eprintln!("ERROR: --preset is required");
        print_usage();
        std::process::exit(1);
    };

    let preset = match Preset::load(Path::new(&preset_path)) {
        Ok(preset) => preset,
        Err(e) => {
            eprintln!("ERROR: Failed to load preset: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = preset.validate() {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    let pools = match pools_path {
        Some(ref path) => match StaticPoolProvider::load_from_ron(Path::new(path)) {
            Ok(pools) => pools,
            Err(e) => {
                eprintln!("ERROR: Failed to load pools: {}", e);
                std::process::exit(1);
            }
        },
        None => StaticPoolProvider::new(),
    };

    let sequences: Arc<dyn SequenceStore> = match sequences_path {
        Some(ref path) => match FileSequenceStore::open(Path::new(path)) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                eprintln!("ERROR: Failed to open sequence store: {}", e);
                std::process::exit(1);
            }
        },
        None => Arc::new(MemorySequenceStore::new()),
    };

    println!(
        "Loaded preset '{}' ({} categories, {} pools)",
        preset.name,
        preset.categories.len(),
        pools.len()
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let generator = PromptGenerator::builder()
        .pools(CachedPoolProvider::new(pools))
        .sequences(sequences)
        .build();

    let mut current_seed = seed;
    let mut character_slots = true;
    let mut json = false;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "gen" | "g" => {
                let count: usize = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                match generator.generate_variants(&preset, current_seed, count, character_slots) {
                    Ok(results) => {
                        for (offset, result) in results.iter().enumerate() {
                            print_result(current_seed.wrapping_add(offset as u64), result, json);
                        }
                        current_seed = current_seed.wrapping_add(count as u64);
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "seed" => {
                if let Some(n) = parts.get(1).and_then(|s| s.parse().ok()) {
                    current_seed = n;
                    println!("Seed set to {}", current_seed);
                } else {
                    println!("Usage: seed <n>");
                }
            }
            "mode" => match parts.get(1).copied() {
                Some("v4") => {
                    character_slots = true;
                    println!("Character sub-prompts enabled");
                }
                Some("legacy") => {
                    character_slots = false;
                    println!("Single folded prompt");
                }
                _ => println!("Usage: mode v4|legacy"),
            },
            "json" => {
                json = !json;
                println!("JSON output {}", if json { "on" } else { "off" });
            }
            "stats" => {
                let count: usize = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
                match generator.generate_variants(&preset, current_seed, count, character_slots) {
                    Ok(results) => print_stats(&results),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn print_result(seed: u64, result: &GenerationResult, json: bool) {
    if json {
        match result.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => println!("ERROR: {}", e),
        }
        return;
    }

    println!("\n--- Seed {} ---", seed);
    println!("main: {}", result.main_prompt);
    if result.no_humans {
        println!("(no humans)");
    }
    for (i, character) in result.characters.iter().enumerate() {
        println!("char {} [{}]: {}", i + 1, character.gender.as_str(), character.prompt);
    }
    println!();
}

fn print_stats(results: &[GenerationResult]) {
    let mut frequencies: HashMap<&str, usize> = HashMap::new();
    let mut character_counts: HashMap<usize, usize> = HashMap::new();

    for result in results {
        *character_counts.entry(result.characters.len()).or_insert(0) += 1;
        let prompts = std::iter::once(result.main_prompt.as_str())
            .chain(result.characters.iter().map(|c| c.prompt.as_str()));
        for prompt in prompts {
            for token in prompt.split(", ").filter(|t| !t.is_empty()) {
                *frequencies.entry(token).or_insert(0) += 1;
            }
        }
    }

    let mut counts: Vec<_> = character_counts.into_iter().collect();
    counts.sort();
    println!("\n--- {} prompts ---", results.len());
    for (characters, n) in counts {
        println!("  {} characters: {}", characters, n);
    }

    let mut tokens: Vec<_> = frequencies.into_iter().collect();
    tokens.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    println!("  top tokens:");
    for (token, n) in tokens.iter().take(20) {
        println!("    {:>5}  {}", n, token);
    }
    println!();
}

fn print_usage() {
    println!("Usage: preview --preset <path> [--pools <path>] [--sequences <path>] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  gen [n]          generate n prompts (default 1) from consecutive seeds");
    println!("  seed <n>         set the next seed");
    println!("  mode v4|legacy   character sub-prompts or a single folded prompt");
    println!("  json             toggle JSON output");
    println!("  stats <n>        generate n prompts and report token frequencies");
    println!("  help             list commands");
    println!("  quit             exit");
}
