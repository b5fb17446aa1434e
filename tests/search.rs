//! End-to-end tests driving the search through the public API.

use std::io::Write;

use babel_vm::{
    compute::{
        Instruction, Machine, Opcode, assemble,
        evolution::{BigramScorer, EvolutionEngine, Population, ProgramRng, Scorer},
    },
    schema::{SearchConfig, StopReason},
};

/// Prints "AB": r31 + r31 + r6 = 65, then r1 + r2 = 66.
fn ab_program() -> babel_vm::Program {
    assemble(&[
        Instruction::new(Opcode::Add, 1, 31, 31),
        Instruction::new(Opcode::Add, 1, 1, 6),
        Instruction::new(Opcode::Out, 1, 0, 0),
        Instruction::new(Opcode::Add, 2, 1, 2),
        Instruction::new(Opcode::Out, 2, 0, 0),
    ])
}

/// Prints "A" only.
fn a_program() -> babel_vm::Program {
    assemble(&[
        Instruction::new(Opcode::Add, 1, 31, 31),
        Instruction::new(Opcode::Add, 1, 1, 6),
        Instruction::new(Opcode::Out, 1, 0, 0),
    ])
}

#[test]
fn test_bigram_scorer_ranks_ab_above_a() {
    let scorer = BigramScorer::from_corpus(b"ABABABAB CABAB");
    let machine = Machine::default();
    let mut rng = ProgramRng::new(11);

    let mut population = Population::from_programs([a_program(), ab_program()], 2, 9, &mut rng);
    for individual in population.individuals_mut() {
        machine.evaluate(individual, b"", Some(&scorer));
    }
    population.rank();

    let winner = population.winner().unwrap();
    assert_eq!(winner.program, ab_program());
    assert_eq!(winner.score, scorer.score(b"AB") as i64);
    assert!(winner.score > 0);
    assert_eq!(winner.output_length, 2);
}

#[test]
fn test_bigram_prefers_corpus_like_text() {
    let scorer = BigramScorer::from_corpus(
        b"stars are made of weird stuff and the stars are far away from here",
    );
    assert!(scorer.score(b"stars are") > scorer.score(b"rsats aer"));
}

#[test]
fn test_search_from_json_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "target": "hi",
            "population": {{ "size": 16, "program_length": 60, "max_generations": 25 }},
            "random_seed": 1234
        }}"#
    )
    .unwrap();

    let config: SearchConfig =
        serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    let scorer = BigramScorer::from_corpus(b"hi hi oh hi there hi");

    let mut engine = EvolutionEngine::new(config, scorer).unwrap();
    let mut controller = engine.stagnation_controller();
    let result = engine.run(&mut controller);

    assert!(result.stats.generations <= 25);
    assert_eq!(result.history.best_score.len() as u64, result.stats.generations);
    match result.stop_reason {
        StopReason::TargetReached => assert_eq!(result.output, b"hi"),
        StopReason::MaxGenerations => assert_eq!(result.stats.generations, 25),
        StopReason::ControllerDone => panic!("stagnation controller only stops on the target"),
    }
}

#[test]
fn test_winner_replays_to_reported_output() {
    let config = SearchConfig {
        target: b"zz".to_vec(),
        population: babel_vm::schema::PopulationConfig {
            size: 12,
            program_length: 45,
            max_generations: Some(8),
            ..Default::default()
        },
        random_seed: Some(5),
        ..Default::default()
    };
    let scorer = |text: &[u8]| text.iter().filter(|&&b| b == b'z').count() as u64;

    let mut engine = EvolutionEngine::new(config, scorer).unwrap();
    let mut controller = engine.stagnation_controller();
    let result = engine.run(&mut controller);

    let replay = Machine::default().run(&result.best.program, b"");
    assert_eq!(replay.output, result.output);
    assert_eq!(
        result.best.score,
        result.output.iter().filter(|&&b| b == b'z').count() as i64
    );
}
