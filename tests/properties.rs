//! Property tests for the machine and the genetic operators.

use proptest::prelude::*;

use babel_vm::{
    compute::{
        ExecutionContext, INSTRUCTION_WIDTH, Instruction, Machine, OPERAND_MAX, Opcode, Program,
        assemble, disassemble, evolution::ProgramRng,
    },
    schema::VmConfig,
};

fn small_machine() -> Machine {
    Machine::new(VmConfig {
        cycle_budget: 2_000,
        ..Default::default()
    })
}

prop_compose! {
    fn program_bytes()(bytes in prop::collection::vec(any::<u8>(), 0..600)) -> Vec<u8> {
        bytes
    }
}

prop_compose! {
    fn aligned_program(max_instructions: usize)
        (count in 1..max_instructions)
        (bytes in prop::collection::vec(any::<u8>(), count * INSTRUCTION_WIDTH)) -> Program {
        Program::from_bytes(bytes)
    }
}

proptest! {
    #[test]
    fn prop_execution_is_deterministic(
        bytes in program_bytes(),
        input in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let machine = small_machine();
        let program = Program::from_bytes(bytes);
        prop_assert_eq!(machine.run(&program, &input), machine.run(&program, &input));
    }

    #[test]
    fn prop_execution_respects_cycle_budget(bytes in program_bytes()) {
        let execution = small_machine().run(&Program::from_bytes(bytes), b"");
        prop_assert!(execution.cycles <= 2_000);
        prop_assert!(!execution.crashed);
    }

    #[test]
    fn prop_programs_are_instruction_aligned(bytes in program_bytes()) {
        let program = Program::from_bytes(bytes.clone());
        prop_assert_eq!(program.len() % INSTRUCTION_WIDTH, 0);
        prop_assert!(program.len() - bytes.len() < INSTRUCTION_WIDTH);
        prop_assert_eq!(&program.as_bytes()[..bytes.len()], &bytes[..]);
    }

    #[test]
    fn prop_disassembly_covers_every_instruction(program in aligned_program(64)) {
        let before = program.clone();
        let records = disassemble(&program);
        prop_assert_eq!(records.len(), program.instruction_count());
        prop_assert!(records
            .iter()
            .all(|r| r.dest <= OPERAND_MAX && r.src_a <= OPERAND_MAX && r.src_b <= OPERAND_MAX));
        prop_assert_eq!(program, before);
    }

    #[test]
    fn prop_add_wraps(a in any::<u8>(), b in any::<u8>()) {
        let program = assemble(&[
            Instruction::new(Opcode::Add, 1, 2, 3),
            Instruction::new(Opcode::Out, 1, 0, 0),
        ]);
        let ctx = ExecutionContext::new(b"").with_register(2, a).with_register(3, b);
        let execution = small_machine().run_with_context(&program, ctx);
        prop_assert_eq!(execution.output, vec![a.wrapping_add(b)]);
    }

    #[test]
    fn prop_division_by_zero_writes_zero(a in any::<u8>()) {
        let program = assemble(&[
            Instruction::new(Opcode::Div, 1, 2, 0),
            Instruction::new(Opcode::Out, 1, 0, 0),
        ]);
        let ctx = ExecutionContext::new(b"").with_register(1, 99).with_register(2, a);
        let execution = small_machine().run_with_context(&program, ctx);
        prop_assert_eq!(execution.output, vec![0]);
    }

    #[test]
    fn prop_crossover_length_law(
        first_count in 1usize..40,
        second_count in 1usize..40,
        seed in any::<u64>(),
    ) {
        let first = Program::from_bytes(vec![0xAA; first_count * INSTRUCTION_WIDTH]);
        let second = Program::from_bytes(vec![0xBB; second_count * INSTRUCTION_WIDTH]);
        let child = ProgramRng::new(seed).crossover(&first, &second);
        let bytes = child.as_bytes();
        let shared = first.len().min(second.len());

        // One contiguous prefix from the first donor, then the second donor.
        let split = bytes.iter().position(|&b| b != 0xAA).unwrap_or(bytes.len());
        prop_assert_eq!(split % INSTRUCTION_WIDTH, 0);
        prop_assert!(split < first.len() || bytes.len() == first.len());
        prop_assert!(bytes[split..].iter().all(|&b| b == 0xBB));

        if split < bytes.len() {
            prop_assert_eq!(bytes.len(), shared);
        } else {
            prop_assert!(bytes.len() >= shared);
            prop_assert!(bytes.len() <= first.len());
        }
    }

    #[test]
    fn prop_mutation_preserves_length(
        program in aligned_program(64),
        intensity in 0.0f32..=1.0,
        seed in any::<u64>(),
    ) {
        let mut mutated = program.clone();
        ProgramRng::new(seed).mutate(&mut mutated, intensity);
        prop_assert_eq!(mutated.len(), program.len());
    }

    #[test]
    fn prop_hex_text_round_trips(program in aligned_program(64)) {
        prop_assert_eq!(Program::from_hex(&program.to_hex()).unwrap(), program);
    }
}
