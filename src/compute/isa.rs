//! Instruction set: bit layout, opcodes, branch arithmetic and disassembly.
//!
//! Every instruction is three bytes holding a 4-bit opcode and three 6-bit
//! operands:
//!
//! ```text
//!  byte 0      byte 1      byte 2
//! xxOO OODD | DDDD AAAA | AABB BBBB
//! ```
//!
//! The top two bits of byte 0 are ignored. Operands 1..=31 name registers,
//! 32..=63 name memory cells addressed through operand - 32, and 0 is the
//! constant zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::program::{INSTRUCTION_WIDTH, Program};

/// Largest encodable operand value.
pub const OPERAND_MAX: u8 = 0x3F;

/// Opcode in the low nibble of `(byte0 >> 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    And = 4,
    Not = 5,
    Ior = 6,
    Xor = 7,
    Jeq = 8,
    Jne = 9,
    Jlt = 10,
    Jle = 11,
    Jgt = 12,
    Jge = 13,
    Out = 14,
    In = 15,
}

impl Opcode {
    /// Decode a 4-bit opcode field.
    #[inline]
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => Self::Add,
            1 => Self::Sub,
            2 => Self::Mul,
            3 => Self::Div,
            4 => Self::And,
            5 => Self::Not,
            6 => Self::Ior,
            7 => Self::Xor,
            8 => Self::Jeq,
            9 => Self::Jne,
            10 => Self::Jlt,
            11 => Self::Jle,
            12 => Self::Jgt,
            13 => Self::Jge,
            14 => Self::Out,
            15 => Self::In,
            other => unreachable!("opcode field is 4 bits wide, got {other}"),
        }
    }

    /// Evaluate the branch condition for `a` and `b`.
    ///
    /// Returns `None` for non-branch opcodes.
    #[inline]
    pub fn branch_taken(self, a: u8, b: u8) -> Option<bool> {
        Some(match self {
            Self::Jeq => a == b,
            Self::Jne => a != b,
            Self::Jlt => a < b,
            Self::Jle => a <= b,
            Self::Jgt => a > b,
            Self::Jge => a >= b,
            _ => return None,
        })
    }
}

/// A decoded instruction. Operand order is destination, source A, source B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: u8,
    pub src_a: u8,
    pub src_b: u8,
}

impl Instruction {
    pub fn new(opcode: Opcode, dest: u8, src_a: u8, src_b: u8) -> Self {
        Self {
            opcode,
            dest: dest & OPERAND_MAX,
            src_a: src_a & OPERAND_MAX,
            src_b: src_b & OPERAND_MAX,
        }
    }

    /// Unpack one instruction from its three bytes.
    #[inline]
    pub fn decode(bytes: [u8; INSTRUCTION_WIDTH]) -> Self {
        let [b0, b1, b2] = bytes;
        let instruction = Self {
            opcode: Opcode::from_nibble(b0 >> 2),
            dest: ((b0 & 0x03) << 4) | (b1 >> 4),
            src_a: ((b1 & 0x0F) << 2) | (b2 >> 6),
            src_b: b2 & 0x3F,
        };
        debug_assert!(
            instruction.dest <= OPERAND_MAX
                && instruction.src_a <= OPERAND_MAX
                && instruction.src_b <= OPERAND_MAX
        );
        instruction
    }

    /// Pack into three bytes. The ignored top bits of byte 0 are zero.
    pub fn encode(self) -> [u8; INSTRUCTION_WIDTH] {
        let op = self.opcode as u8;
        [
            (op << 2) | (self.dest >> 4),
            ((self.dest & 0x0F) << 4) | (self.src_a >> 2),
            ((self.src_a & 0x03) << 6) | self.src_b,
        ]
    }

    /// Assembly mnemonic. `not` splits by its mode bit.
    pub fn mnemonic(&self) -> &'static str {
        match self.opcode {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::And => "and",
            Opcode::Not if self.src_b & 1 == 1 => "lnot",
            Opcode::Not => "bnot",
            Opcode::Ior => "ior",
            Opcode::Xor => "xor",
            Opcode::Jeq => "jeq",
            Opcode::Jne => "jne",
            Opcode::Jlt => "jlt",
            Opcode::Jle => "jle",
            Opcode::Jgt => "jgt",
            Opcode::Jge => "jge",
            Opcode::Out => "out",
            Opcode::In => "in",
        }
    }
}

/// Concatenate instructions into a program.
pub fn assemble(instructions: &[Instruction]) -> Program {
    let bytes: Vec<u8> = instructions.iter().flat_map(|i| i.encode()).collect();
    Program::from_bytes(bytes)
}

/// Resolve the target of a taken branch.
///
/// Bit 5 of `operand` selects a backward jump; the low five bits give the
/// distance in instructions minus one, so the shortest jump still moves one
/// instruction. Returns `None` when a backward jump would leave the program
/// before offset 0.
#[inline]
pub fn branch_target(operand: u8, ip: usize) -> Option<usize> {
    let backward = operand & 0x20 != 0;
    let distance = ((operand & 0x1F) as usize + 1) * INSTRUCTION_WIDTH;
    if backward {
        ip.checked_sub(distance)
    } else {
        Some(ip + distance)
    }
}

/// One line of a disassembly listing. Diagnostic only, never re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionRecord {
    pub mnemonic: &'static str,
    pub dest: u8,
    pub src_a: u8,
    pub src_b: u8,
}

impl From<Instruction> for InstructionRecord {
    fn from(instruction: Instruction) -> Self {
        Self {
            mnemonic: instruction.mnemonic(),
            dest: instruction.dest,
            src_a: instruction.src_a,
            src_b: instruction.src_b,
        }
    }
}

impl fmt::Display for InstructionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, ${:02X}, ${:02X}, ${:02X}",
            self.mnemonic, self.dest, self.src_a, self.src_b
        )
    }
}

/// Render a program as instruction records in program order.
pub fn disassemble(program: &Program) -> Vec<InstructionRecord> {
    program
        .instructions()
        .map(|bytes| Instruction::decode(bytes).into())
        .collect()
}
