use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::str::FromStr;

use clap::Parser;

use memlib::allocator::BlockRef;
use memlib::config::{CacheLevelConfig, SimulatorConfig};
use memlib::controller::Controller;
use memlib::error::ControlError;
use memlib::io::get_reader;
use memlib::placement_policies::AllocationStrategy;
use memlib::replacement_policies::ReplacementPolicy;

#[derive(Parser, Debug)]
#[command(about = String::from("Interactive memory-allocator and cache-hierarchy simulator"))]
struct Args {
    /// JSON configuration to pre-initialise the session
    #[arg(short, long)]
    config: Option<String>,

    /// Command transcript to execute instead of the interactive prompt
    #[arg(short, long)]
    script: Option<String>,
}

#[derive(PartialEq)]
enum Outcome {
    Continue,
    Exit,
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let mut controller = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| format!("Couldn't open the config file at path {path}: {e}"))?;
            let config: SimulatorConfig = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| format!("Couldn't parse the config file: {e}"))?;
            Controller::from_config(&config)
                .map_err(|e| format!("Couldn't apply the config file: {e}"))?
        }
        None => Controller::new(),
    };

    if let Some(path) = &args.script {
        let file = File::open(path)
            .map_err(|e| format!("Couldn't open the script file at path {path}: {e}"))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| format!("Couldn't read the script file: {e}"))?;
            println!("> {line}");
            if run_line(&mut controller, &line) == Outcome::Exit {
                break;
            }
        }
        return Ok(());
    }

    println!("Memory Management Simulator");
    println!("Type 'help' for available commands\n");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        let read = stdin
            .read_line(&mut line)
            .map_err(|e| format!("Couldn't read from stdin: {e}"))?;
        if read == 0 || run_line(&mut controller, line.trim()) == Outcome::Exit {
            break;
        }
    }
    println!("Simulator exited.");
    Ok(())
}

fn run_line(controller: &mut Controller, line: &str) -> Outcome {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(command) = tokens.first() else {
        return Outcome::Continue;
    };

    match command.to_ascii_lowercase().as_str() {
        "exit" | "quit" => return Outcome::Exit,
        "help" => print_help(),
        "init" => handle_init(controller, &tokens),
        "set" => handle_set(controller, &tokens),
        "malloc" => handle_malloc(controller, &tokens),
        "free" => handle_free(controller, &tokens),
        "dump" => handle_dump(controller, &tokens),
        "stats" => handle_stats(controller, &tokens),
        "access" => handle_access(controller, &tokens),
        "trace" => handle_trace(controller, &tokens),
        other => {
            println!("Unknown command: {other}");
            println!("Type 'help' for available commands");
        }
    }
    Outcome::Continue
}

fn print_help() {
    println!();
    println!("Available commands:");
    println!("  init memory <size>            - Initialize memory system (RAM + Cache)");
    println!("  init cache <params...>        - Initialize L1/L2 cache hierarchy");
    println!("  set allocator <strategy>      - Set allocation strategy (first_fit, best_fit, worst_fit)");
    println!("  set cache_policy <policy>     - Set cache replacement policy (fifo, lru, lfu)");
    println!("  malloc <size>                 - Allocate memory block");
    println!("  free <block_id>               - Free memory block by ID");
    println!("  free 0x<address>              - Free memory block by address");
    println!("  dump memory                   - Display memory layout");
    println!("  stats [json]                  - Display statistics");
    println!("  access <address>              - Simulate cache access (Physical Address)");
    println!("  trace <file>                  - Replay an address trace through the cache");
    println!("  help                          - Show this help");
    println!("  exit                          - Exit simulator");
    println!();
}

fn report(error: &ControlError) {
    match error {
        ControlError::Uninitialised => {
            println!("Error: Memory not initialized. Use 'init memory <size>' first.");
        }
        other => println!("Error: {other}"),
    }
}

fn handle_init(controller: &mut Controller, tokens: &[&str]) {
    match tokens.get(1).copied() {
        Some("memory") => {
            let Some(size) = tokens.get(2).and_then(|t| t.parse::<usize>().ok()) else {
                println!("Usage: init memory <size>");
                return;
            };
            match controller.init_memory(size) {
                Ok(()) => println!("Memory initialized with size: {size} bytes"),
                Err(error) => println!("Error: {error}"),
            }
        }
        Some("cache") => {
            let params: Vec<u64> = tokens[2..]
                .iter()
                .filter_map(|t| t.parse::<u64>().ok())
                .collect();
            if params.len() != 6 {
                println!("Usage: init cache <l1_sz> <l1_blk> <l1_assoc> <l2_sz> <l2_blk> <l2_assoc>");
                return;
            }
            let l1 = CacheLevelConfig {
                size: params[0],
                block_size: params[1],
                associativity: params[2],
            };
            let l2 = CacheLevelConfig {
                size: params[3],
                block_size: params[4],
                associativity: params[5],
            };
            match controller.init_cache(l1, l2) {
                Ok(()) => {
                    println!("Cache initialized:");
                    println!(
                        "L1: {}B, {}B blocks, {}-way",
                        l1.size, l1.block_size, l1.associativity
                    );
                    println!(
                        "L2: {}B, {}B blocks, {}-way",
                        l2.size, l2.block_size, l2.associativity
                    );
                }
                Err(error) => println!("Error: {error}"),
            }
        }
        _ => println!("Usage: init memory <size> OR init cache <params>"),
    }
}

fn handle_set(controller: &mut Controller, tokens: &[&str]) {
    match (tokens.get(1).copied(), tokens.get(2).copied()) {
        (Some("allocator"), Some(name)) => match AllocationStrategy::from_str(name) {
            Ok(strategy) => match controller.set_strategy(strategy) {
                Ok(()) => println!("Allocation strategy set to: {strategy}"),
                Err(error) => report(&error),
            },
            Err(()) => println!("Invalid strategy. Use: first_fit, best_fit, worst_fit"),
        },
        (Some("cache_policy"), Some(name)) => match ReplacementPolicy::from_str(name) {
            Ok(policy) => match controller.set_policy(policy) {
                Ok(()) => println!("Cache replacement policy set to: {policy}"),
                Err(error) => report(&error),
            },
            Err(()) => println!("Invalid policy. Use: fifo, lru, or lfu"),
        },
        _ => {
            println!("Usage: set allocator <strategy> OR set cache_policy <policy>");
            println!("Strategies: first_fit, best_fit, worst_fit");
            println!("Policies: fifo, lru, lfu");
        }
    }
}

fn handle_malloc(controller: &mut Controller, tokens: &[&str]) {
    let Some(size) = tokens.get(1).and_then(|t| t.parse::<usize>().ok()) else {
        println!("Usage: malloc <size>");
        return;
    };
    match controller.malloc(size) {
        Ok(allocation) => println!(
            "Allocated block id={} at address=0x{:x}",
            allocation.id, allocation.address
        ),
        Err(ControlError::Uninitialised) => report(&ControlError::Uninitialised),
        Err(error) => println!("Failed to allocate {size} bytes: {error}"),
    }
}

fn handle_free(controller: &mut Controller, tokens: &[&str]) {
    let Some(arg) = tokens.get(1).copied() else {
        println!("Usage: free <block_id> or free 0x<address>");
        return;
    };
    let reference = if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        match usize::from_str_radix(hex, 16) {
            Ok(address) => BlockRef::Address(address),
            Err(_) => {
                println!("Usage: free <block_id> or free 0x<address>");
                return;
            }
        }
    } else {
        match arg.parse::<u64>() {
            Ok(id) => BlockRef::Id(id),
            Err(_) => {
                println!("Usage: free <block_id> or free 0x<address>");
                return;
            }
        }
    };
    match controller.free(reference) {
        Ok(id) => println!("Block {id} freed and merged"),
        Err(ControlError::Uninitialised) => report(&ControlError::Uninitialised),
        Err(error) => println!("Failed to free {arg}: {error}"),
    }
}

fn handle_dump(controller: &mut Controller, tokens: &[&str]) {
    if tokens.get(1).copied() != Some("memory") {
        println!("Usage: dump memory");
        return;
    }
    match controller.dump() {
        Ok(dump) => print!("{dump}"),
        Err(error) => report(&error),
    }
}

fn handle_stats(controller: &mut Controller, tokens: &[&str]) {
    let stats = match controller.stats() {
        Ok(stats) => stats,
        Err(error) => {
            report(&error);
            return;
        }
    };
    if tokens.get(1).copied() == Some("json") {
        match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{json}"),
            Err(error) => println!("Error: couldn't serialise the statistics: {error}"),
        }
    } else {
        print!("{}", stats.render());
    }
}

fn handle_access(controller: &mut Controller, tokens: &[&str]) {
    let Some(address) = tokens.get(1).and_then(|t| parse_number(t)) else {
        println!("Usage: access <address>");
        return;
    };
    match controller.access(address) {
        Ok(access) => {
            println!("Physical address 0x{address:x}");
            println!("  L1: {}", if access.l1_hit { "HIT" } else { "MISS" });
            if !access.l1_hit {
                println!("  L2: {}", if access.l2_hit { "HIT" } else { "MISS" });
            }
            for event in &access.events {
                println!("  [!] {event}");
            }
        }
        Err(error) => report(&error),
    }
}

fn handle_trace(controller: &mut Controller, tokens: &[&str]) {
    let Some(path) = tokens.get(1).copied() else {
        println!("Usage: trace <file>");
        return;
    };
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            println!("Couldn't open the trace file at path {path}: {error}");
            return;
        }
    };
    let reader = match get_reader(file) {
        Ok(reader) => reader,
        Err(error) => {
            println!("Error: {error}");
            return;
        }
    };
    match controller.trace(reader) {
        Ok(summary) => {
            println!("Replayed {} accesses", summary.accesses);
            println!(
                "  L1: {} hits, {} misses",
                summary.l1_hits, summary.l1_misses
            );
            println!(
                "  L2: {} hits, {} misses",
                summary.l2_hits, summary.l2_misses
            );
            println!("  Main memory accesses: {}", summary.main_memory_accesses);
        }
        Err(error) => report(&error),
    }
}

/// Accepts decimal or 0x-prefixed hexadecimal.
fn parse_number(token: &str) -> Option<u64> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        token.parse::<u64>().ok()
    }
}
