/// Preview — interactive shell for inspecting transformation traces.
///
/// Usage: preview [--table <path>] [--line-states <path>] [--theme-layers <path>]
///                [--start <hexagram> <line>] [--seed-table]
///
/// Commands:
///   start <hexagram> <line>            — set the starting position
///   branches                           — print the eight branches from the start
///   advance | change                   — apply one action to the start
///   select <theme> <urgency> <0..1>    — pick a starting line for the current hexagram
///   find <name>                        — look up a hexagram by name
///   help                               — list commands
///   quit                               — exit

use hexagram_engine::core::line_states::UNREGISTERED_PLACEHOLDER;
use hexagram_engine::schema::hexagram::yao_name;
use hexagram_engine::schema::situation::{SituationSummary, Urgency};
use hexagram_engine::{BranchSet, HexagramEngine, HexagramId, LinePosition, Position};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut builder = HexagramEngine::builder();
    let mut start = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--table" if i + 1 < args.len() => {
                i += 1;
                builder = builder.hexagram_table(&args[i]);
            }
            "--line-states" if i + 1 < args.len() => {
                i += 1;
                builder = builder.line_states(&args[i]);
            }
            "--theme-layers" if i + 1 < args.len() => {
                i += 1;
                builder = builder.theme_layers(&args[i]);
            }
            "--start" if i + 2 < args.len() => {
                match parse_position(&args[i + 1], &args[i + 2]) {
                    Some(p) => start = Some(p),
                    None => {
                        eprintln!("Invalid start: {} {}", args[i + 1], args[i + 2]);
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--seed-table" => {
                builder = builder.allow_seed_table(true);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} hexagrams ({}), {} line states",
        engine.table().len(),
        if engine.is_degraded() { "partial" } else { "complete" },
        engine.line_states().len()
    );

    // Non-interactive: print once and exit.
    if let Some(start) = start {
        print_branches(&engine, start);
        return;
    }

    println!("Type 'help' for commands.\n");

    let mut current = Position {
        hexagram: HexagramId::FIRST,
        line: LinePosition::BOTTOM,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview {}> ", current);
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
            "start" => {
                if parts.len() < 3 {
                    println!("Usage: start <hexagram 1-64> <line 1-6>");
                    continue;
                }
                match parse_position(parts[1], parts[2]) {
                    Some(p) => {
                        current = p;
                        describe(&engine, current);
                    }
                    None => println!("Invalid position: {} {}", parts[1], parts[2]),
                }
            }
            "branches" | "b" => {
                print_branches(&engine, current);
            }
            "advance" | "a" => {
                let out = engine.transformer().apply_advance(current);
                if out.progressed {
                    println!("進 → {}", out.position);
                } else {
                    println!("進不可: already at the top line");
                }
            }
            "change" | "c" => match engine.transformer().apply_change(current) {
                Ok(resolved) => {
                    let approx = if resolved.used_fallback() { " (estimated)" } else { "" };
                    println!("変 → {}{}", resolved.value(), approx);
                }
                Err(e) => println!("ERROR: {}", e),
            },
            "select" => {
                if parts.len() < 4 {
                    println!("Usage: select <theme> <low|medium|high> <intensity 0..1>");
                    continue;
                }
                let urgency = match parts[2].to_lowercase().as_str() {
                    "low" => Urgency::Low,
                    "medium" => Urgency::Medium,
                    "high" => Urgency::High,
                    other => {
                        println!("Unknown urgency: {}", other);
                        continue;
                    }
                };
                let intensity: f64 = match parts[3].parse() {
                    Ok(v) => v,
                    Err(_) => {
                        println!("Invalid intensity: {}", parts[3]);
                        continue;
                    }
                };
                let summary = SituationSummary {
                    primary_theme: parts[1].to_string(),
                    urgency_level: urgency,
                    emotional_intensity: intensity,
                };
                match engine.select_start(current.hexagram.get() as u32, &summary) {
                    Ok(p) => {
                        println!(
                            "Layer {:?} → line {}",
                            engine.selector().layer_for(parts[1]),
                            p.line
                        );
                        current = p;
                        describe(&engine, current);
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "find" => {
                if parts.len() < 2 {
                    println!("Usage: find <name>");
                    continue;
                }
                match engine.table().find_by_name(parts[1]) {
                    Some(id) => println!("{} is hexagram {}", parts[1], id),
                    None => println!("No hexagram named {}", parts[1]),
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn parse_position(hexagram: &str, line: &str) -> Option<Position> {
    let hexagram = hexagram.parse().ok()?;
    let line = line.parse().ok()?;
    Position::new(hexagram, line).ok()
}

fn label(engine: &HexagramEngine, position: Position) -> String {
    match engine.table().get(position.hexagram) {
        Ok(hexagram) => format!(
            "{:>2} {} {}",
            position.hexagram,
            hexagram.name,
            yao_name(hexagram.pattern, position.line)
        ),
        Err(_) => format!("{:>2} ? line {}", position.hexagram, position.line),
    }
}

fn describe(engine: &HexagramEngine, position: Position) {
    let state = engine.line_states().get(position);
    println!("{}: {}", label(engine, position), state.display_text());
}

fn print_branches(engine: &HexagramEngine, start: Position) {
    let set: BranchSet = match engine.enumerator().generate(start) {
        Ok(set) => set,
        Err(e) => {
            println!("ERROR: {}", e);
            return;
        }
    };

    println!("\n=== Eight branches from {} ===", label(engine, start));
    if set.used_fallback {
        println!("(results may be approximate: table is incomplete)");
    }

    for branch in &set.branches {
        let marker = if branch.valid { "" } else { "  [boundary]" };
        println!("\n#{} {}{}", branch.id, branch.action_sequence_label, marker);
        for step in &branch.steps {
            let text = if step.registered {
                step.line_text.as_str()
            } else {
                UNREGISTERED_PLACEHOLDER
            };
            let note = step
                .note
                .as_deref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default();
            println!(
                "  {} {}{}  {}",
                step.action.kanji(),
                label(engine, step.position()),
                note,
                text
            );
        }
    }
    println!();
}

fn print_usage() {
    println!("Usage: preview [--table <path>] [--line-states <path>] [--theme-layers <path>]");
    println!("               [--start <hexagram> <line>] [--seed-table]");
}

fn print_help() {
    println!("Commands:");
    println!("  start <hexagram> <line>          — set the starting position");
    println!("  branches                         — print the eight branches");
    println!("  advance | change                 — apply one action to the start");
    println!("  select <theme> <urgency> <0..1>  — pick a starting line");
    println!("  find <name>                      — look up a hexagram by name");
    println!("  help                             — list commands");
    println!("  quit                             — exit");
}
