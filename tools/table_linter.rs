/// Table Linter — validates a hexagram table and line-state coverage.
///
/// Usage: table_linter <hexagrams.ron> [--line-states <file.json>]

use hexagram_engine::core::line_states::LineStateStore;
use hexagram_engine::core::table::{Hexagram, HexagramTable};
use hexagram_engine::schema::hexagram::{HexagramId, LinePosition, Position};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: table_linter <hexagrams.ron> [--line-states <file.json>]");
        process::exit(0);
    }

    let table_path = &args[1];
    let mut line_states_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--line-states" && i + 1 < args.len() {
            i += 1;
            line_states_path = Some(args[i].clone());
        }
        i += 1;
    }

    // A table that fails validation is reported and nothing else is checked.
    let table = match HexagramTable::load_from_ron(Path::new(table_path)) {
        Ok(table) => table,
        Err(e) => {
            println!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} hexagrams", table.len());

    let line_states = match line_states_path {
        Some(ref path) => match LineStateStore::load_from_json(Path::new(path)) {
            Ok(store) => Some(store),
            Err(e) => {
                println!("ERROR: Failed to load line states: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };

    let (errors, warnings) = lint_table(&table, line_states.as_ref());

    // Print report
    println!("\n=== Table Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_table(table: &HexagramTable, line_states: Option<&LineStateStore>) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for hexagram in table.iter() {
        if !name_matches_trigrams(hexagram) {
            warnings.push(format!(
                "Hexagram {} '{}' does not name its trigrams {} over {}",
                hexagram.id,
                hexagram.name,
                hexagram.upper.image(),
                hexagram.lower.image()
            ));
        }
    }

    // Line-state coverage: 64 × 6 keys.
    if let Some(store) = line_states {
        let mut missing = 0;
        for hexagram in HexagramId::all() {
            let absent: Vec<String> = LinePosition::all()
                .filter(|line| !store.contains(Position { hexagram, line: *line }))
                .map(|line| line.to_string())
                .collect();
            missing += absent.len();
            for line in LinePosition::all() {
                let position = Position { hexagram, line };
                let state = store.get(position);
                if state.registered && state.text.trim().is_empty() {
                    errors.push(format!("Line state {} is registered with empty text", position));
                }
            }
            if absent.len() == 6 {
                warnings.push(format!("Hexagram {} has no line states", hexagram));
            } else if !absent.is_empty() {
                warnings.push(format!(
                    "Hexagram {} is missing line states for lines {}",
                    hexagram,
                    absent.join(", ")
                ));
            }
        }
        println!("Line states: {} of 384 registered", 384 - missing);
    }

    (errors, warnings)
}

// Names are "<upper image><lower image><title>", or "<trigram>為<image>"
// when both trigrams are the same.
fn name_matches_trigrams(hexagram: &Hexagram) -> bool {
    let chars: Vec<char> = hexagram.name.chars().collect();
    if chars.len() < 3 {
        return false;
    }
    if chars[1] == '為' {
        return hexagram.lower == hexagram.upper
            && hexagram.upper.symbol().starts_with(chars[0])
            && hexagram.upper.image().starts_with(chars[2]);
    }
    hexagram.upper.image().starts_with(chars[0]) && hexagram.lower.image().starts_with(chars[1])
}
