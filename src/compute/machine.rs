//! Register machine that executes candidate programs.
//!
//! A run decodes one instruction per cycle until the instruction pointer
//! leaves the program or the cycle budget is spent. Both are normal ends.
//! Buffer growth that fails marks the run as crashed and stops it; nothing
//! outside the run's own [`ExecutionContext`] is touched.

use std::borrow::Cow;

use crate::schema::VmConfig;

use super::evolution::Scorer;
use super::isa::{Instruction, Opcode, branch_target};
use super::program::{CRASHED, INSTRUCTION_WIDTH, Individual, Program};

/// Number of general registers, addressed as operands 1..=31.
pub const REGISTER_COUNT: usize = 31;

/// First operand value that addresses memory instead of a register.
const MEMORY_OPERAND_BASE: u8 = 32;

/// A buffer could not grow to hold more data.
#[derive(Debug, thiserror::Error)]
#[error("{buffer} buffer could not grow past {len} bytes")]
pub struct ResourceExhausted {
    pub buffer: &'static str,
    pub len: usize,
}

/// Per-run machine state. Created fresh for each execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext<'a> {
    ip: usize,
    cycles: u64,
    registers: [u8; REGISTER_COUNT],
    memory: Vec<u8>,
    output: Vec<u8>,
    input: &'a [u8],
    input_cursor: usize,
}

impl<'a> ExecutionContext<'a> {
    /// Fresh context reading from `input`.
    ///
    /// Register `r` starts out holding `r - 1` and every memory cell holds
    /// its own address, so programs begin with a table of small constants.
    pub fn new(input: &'a [u8]) -> Self {
        let mut registers = [0u8; REGISTER_COUNT];
        for (i, register) in registers.iter_mut().enumerate() {
            *register = i as u8;
        }

        Self {
            ip: 0,
            cycles: 0,
            registers,
            memory: Vec::new(),
            output: Vec::new(),
            input,
            input_cursor: 0,
        }
    }

    /// Replace the initial register file. Index 0 is register 1.
    pub fn with_registers(mut self, registers: [u8; REGISTER_COUNT]) -> Self {
        self.registers = registers;
        self
    }

    /// Preset a single register (1..=31).
    ///
    /// # Panics
    ///
    /// Panics if `register` is 0 or above 31.
    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        assert!(
            (1..=REGISTER_COUNT as u8).contains(&register),
            "register {register} out of range"
        );
        self.registers[register as usize - 1] = value;
        self
    }

    /// Value of register or constant zero. Operands 1..=31 only.
    #[inline]
    fn read_direct(&self, operand: u8) -> u8 {
        match operand {
            0 => 0,
            1..=31 => self.registers[operand as usize - 1],
            _ => unreachable!("operand {operand} is not a register"),
        }
    }

    /// Resolve a 6-bit operand to its value.
    ///
    /// Memory operands take one level of indirection through a register;
    /// the address operand is always below 32 so the lookup ends there.
    #[inline]
    fn read(&self, operand: u8) -> u8 {
        if operand < MEMORY_OPERAND_BASE {
            self.read_direct(operand)
        } else {
            let address = self.read_direct(operand - MEMORY_OPERAND_BASE);
            self.load(address)
        }
    }

    /// Store into a 6-bit operand. Writes to operand 0 are discarded.
    #[inline]
    fn write(&mut self, operand: u8, value: u8, chunk: usize) -> Result<(), ResourceExhausted> {
        match operand {
            0 => Ok(()),
            1..=31 => {
                self.registers[operand as usize - 1] = value;
                Ok(())
            }
            _ => {
                let address = self.read_direct(operand - MEMORY_OPERAND_BASE);
                self.store(address, value, chunk)
            }
        }
    }

    /// Memory cells past the allocated end still hold their initial value.
    #[inline]
    fn load(&self, address: u8) -> u8 {
        self.memory
            .get(address as usize)
            .copied()
            .unwrap_or(address)
    }

    fn store(&mut self, address: u8, value: u8, chunk: usize) -> Result<(), ResourceExhausted> {
        let index = address as usize;
        if index >= self.memory.len() {
            let len = self.memory.len();
            let new_len = (index / chunk + 1) * chunk;
            self.memory
                .try_reserve_exact(new_len - len)
                .map_err(|_| ResourceExhausted {
                    buffer: "memory",
                    len,
                })?;
            self.memory.extend((len..new_len).map(|a| a as u8));
        }
        self.memory[index] = value;
        Ok(())
    }

    fn emit(&mut self, value: u8, chunk: usize) -> Result<(), ResourceExhausted> {
        if self.output.len() == self.output.capacity() {
            let len = self.output.len();
            self.output
                .try_reserve_exact(chunk)
                .map_err(|_| ResourceExhausted {
                    buffer: "output",
                    len,
                })?;
        }
        self.output.push(value);
        Ok(())
    }

    fn next_input(&mut self) -> u8 {
        match self.input.get(self.input_cursor) {
            Some(&byte) => {
                self.input_cursor += 1;
                byte
            }
            None => 0,
        }
    }
}

/// Outcome of one program execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Bytes written by `out`.
    pub output: Vec<u8>,
    /// Whether the run stopped because a buffer could not grow.
    pub crashed: bool,
    /// Instructions decoded.
    pub cycles: u64,
}

impl Execution {
    /// Output decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

/// The bytecode interpreter.
#[derive(Debug, Clone, Default)]
pub struct Machine {
    config: VmConfig,
}

impl Machine {
    /// Create a machine with the given limits.
    pub fn new(config: VmConfig) -> Self {
        Self { config }
    }

    /// Execute `program` against `input` from a fresh context.
    pub fn run(&self, program: &Program, input: &[u8]) -> Execution {
        self.run_with_context(program, ExecutionContext::new(input))
    }

    /// Execute `program` starting from a prepared context.
    pub fn run_with_context(&self, program: &Program, mut ctx: ExecutionContext<'_>) -> Execution {
        let bytes = program.as_bytes();
        let mut crashed = false;

        while ctx.cycles < self.config.cycle_budget && ctx.ip < bytes.len() {
            let ip = ctx.ip;
            let instruction = Instruction::decode([bytes[ip], bytes[ip + 1], bytes[ip + 2]]);
            ctx.cycles += 1;

            match self.step(&mut ctx, instruction) {
                Ok(next) => ctx.ip = next.unwrap_or(bytes.len()),
                Err(err) => {
                    log::debug!("execution aborted at ip {ip}: {err}");
                    crashed = true;
                    break;
                }
            }
        }

        Execution {
            output: ctx.output,
            crashed,
            cycles: ctx.cycles,
        }
    }

    /// Run an individual, caching its output length and, when a scorer is
    /// given, its score. Without a scorer the previous score is kept.
    pub fn evaluate(
        &self,
        individual: &mut Individual,
        input: &[u8],
        scorer: Option<&dyn Scorer>,
    ) -> Execution {
        let execution = self.run(&individual.program, input);
        individual.output_length = execution.output.len();

        if let Some(scorer) = scorer {
            individual.score = if execution.crashed {
                CRASHED
            } else {
                i64::try_from(scorer.score(&execution.output)).unwrap_or(i64::MAX)
            };
        }

        execution
    }

    /// Execute one instruction and return the next instruction pointer.
    /// `None` means the pointer left the program.
    #[inline]
    fn step(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instruction: Instruction,
    ) -> Result<Option<usize>, ResourceExhausted> {
        let Instruction {
            opcode,
            dest,
            src_a,
            src_b,
        } = instruction;
        let chunk = self.config.memory_chunk;
        let fallthrough = Some(ctx.ip + INSTRUCTION_WIDTH);

        match opcode {
            Opcode::Add => {
                let value = ctx.read(src_a).wrapping_add(ctx.read(src_b));
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Sub => {
                let value = ctx.read(src_a).wrapping_sub(ctx.read(src_b));
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Mul => {
                let value = ctx.read(src_a).wrapping_mul(ctx.read(src_b));
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Div => {
                let divisor = ctx.read(src_b);
                let value = if divisor == 0 {
                    0
                } else {
                    ctx.read(src_a) / divisor
                };
                ctx.write(dest, value, chunk)?;
            }
            Opcode::And => {
                let value = ctx.read(src_a) & ctx.read(src_b);
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Not => {
                let operand = ctx.read(src_a);
                // Low bit of the third field selects logical negation.
                let value = if src_b & 1 == 1 {
                    (operand == 0) as u8
                } else {
                    !operand
                };
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Ior => {
                let value = ctx.read(src_a) | ctx.read(src_b);
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Xor => {
                let value = ctx.read(src_a) ^ ctx.read(src_b);
                ctx.write(dest, value, chunk)?;
            }
            Opcode::Jeq | Opcode::Jne | Opcode::Jlt | Opcode::Jle | Opcode::Jgt | Opcode::Jge => {
                let taken = opcode
                    .branch_taken(ctx.read(src_a), ctx.read(src_b))
                    .unwrap_or(false);
                if taken {
                    return Ok(branch_target(dest, ctx.ip));
                }
            }
            Opcode::Out => {
                let value = ctx.read(dest);
                ctx.emit(value, self.config.output_chunk)?;
            }
            Opcode::In => {
                let value = ctx.next_input();
                ctx.write(dest, value, chunk)?;
            }
        }

        Ok(fallthrough)
    }
}
