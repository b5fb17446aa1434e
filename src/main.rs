//! babel-vm CLI - Evolve, run and inspect text-emitting programs.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::Path;

use babel_vm::{
    compute::{
        Machine, Program, disassemble,
        evolution::{BigramScorer, EvolutionEngine, Scorer},
    },
    schema::{SearchConfig, VmConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => print_example_config(),
        "evolve" if args.len() >= 4 => evolve(&args[2], &args[3]),
        "run" if args.len() >= 3 => run(&args[2], args.get(3).map(String::as_str).unwrap_or("")),
        "score" if args.len() >= 4 => score(&args[2], &args[3..]),
        "disasm" if args.len() >= 3 => disasm(&args[2]),
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [arguments]", program);
    eprintln!();
    eprintln!("Evolve bytecode programs whose output reads like text.");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  evolve <corpus> <config.json|target>  Run a search scored against corpus");
    eprintln!("  run <program> [input]                 Execute a hex program");
    eprintln!("  score <corpus> <text...>              Score each text against corpus");
    eprintln!("  disasm <program>                      Disassemble a hex program");
    eprintln!("  --example                             Print an example configuration");
    eprintln!();
    eprintln!("<program> is hex text or a file holding hex text.");
}

fn load_scorer(corpus: &str) -> BigramScorer {
    BigramScorer::from_path(corpus).unwrap_or_else(|e| {
        eprintln!("Error loading corpus: {}", e);
        std::process::exit(1);
    })
}

fn load_program(arg: &str) -> Program {
    let text = if Path::new(arg).is_file() {
        fs::read_to_string(arg).unwrap_or_else(|e| {
            eprintln!("Error reading program file: {}", e);
            std::process::exit(1);
        })
    } else {
        arg.to_string()
    };

    Program::from_hex(text.trim()).unwrap_or_else(|e| {
        eprintln!("Error parsing program: {}", e);
        std::process::exit(1);
    })
}

fn load_config(arg: &str) -> SearchConfig {
    let path = Path::new(arg);
    if path.extension().is_some_and(|ext| ext == "json") {
        let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading config file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&config_str).unwrap_or_else(|e| {
            eprintln!("Error parsing config: {}", e);
            std::process::exit(1);
        })
    } else {
        SearchConfig {
            target: arg.as_bytes().to_vec(),
            ..Default::default()
        }
    }
}

fn evolve(corpus: &str, config_arg: &str) {
    let scorer = load_scorer(corpus);
    let config = load_config(config_arg);

    println!("babel-vm Search");
    println!("===============");
    println!("Target: {:?}", String::from_utf8_lossy(&config.target));
    println!(
        "Population: {} x {} bytes",
        config.population.size, config.population.program_length
    );
    println!(
        "Thresholds: plateau {}, stall {}",
        config.controller.plateau_threshold, config.controller.stall_threshold
    );
    println!();

    let mut engine = EvolutionEngine::new(config, scorer).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    let mut controller = engine.stagnation_controller();

    let mut best_seen = i64::MIN;
    let result = engine.run_with_callback(&mut controller, |progress| {
        if progress.best_score > best_seen {
            best_seen = progress.best_score;
            println!(
                "  Generation {}: score={} avg={:.1} {:?}",
                progress.generation, progress.best_score, progress.avg_score, progress.best_output
            );
        }
    });

    println!();
    println!("Stopped: {:?}", result.stop_reason);
    println!("Output: {:?}", result.text());
    println!("Score: {}", result.best.score);
    println!("Program: {}", result.best.program);
    println!(
        "Time: {:.2}s ({} generations, {} shakes, {:.0} evals/s)",
        result.stats.elapsed_seconds,
        result.stats.generations,
        result.stats.shakes,
        result.stats.evaluations_per_second
    );
}

fn run(program_arg: &str, input: &str) {
    let program = load_program(program_arg);
    let execution = Machine::new(VmConfig::default()).run(&program, input.as_bytes());

    println!("Output: {:?}", execution.text());
    println!("Cycles: {}", execution.cycles);
    if execution.crashed {
        println!("Crashed: resource exhaustion");
    }
}

fn score(corpus: &str, texts: &[String]) {
    let scorer = load_scorer(corpus);
    for score in score_each(&scorer, texts) {
        println!("{}", score);
    }
}

/// One score per text, in argument order.
fn score_each(scorer: &impl Scorer, texts: &[String]) -> Vec<u64> {
    texts
        .iter()
        .map(|text| scorer.score(text.as_bytes()))
        .collect()
}

fn disasm(program_arg: &str) {
    let program = load_program(program_arg);
    for (index, record) in disassemble(&program).iter().enumerate() {
        println!("{:04x}  {}", index * 3, record);
    }
}

fn print_example_config() {
    let config = SearchConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
