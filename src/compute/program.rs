//! Program storage: the byte buffer of one candidate and its cached results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bytes per encoded instruction.
pub const INSTRUCTION_WIDTH: usize = 3;

/// Score of an individual that has not been evaluated with a scorer yet.
pub const UNSCORED: i64 = -2;

/// Score of an individual whose last execution was aborted.
pub const CRASHED: i64 = -1;

/// An owned sequence of instructions.
///
/// The byte length is always a multiple of [`INSTRUCTION_WIDTH`]. Any bit
/// pattern is a valid instruction, so no other validation is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    /// Build a program from an arbitrary byte string.
    ///
    /// A trailing partial instruction is zero-padded. The all-zero
    /// instruction is `add $00, $00, $00`, which does nothing.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        let remainder = bytes.len() % INSTRUCTION_WIDTH;
        if remainder != 0 {
            bytes.resize(bytes.len() + INSTRUCTION_WIDTH - remainder, 0);
        }
        Self { bytes }
    }

    /// Parse the hex text form produced by [`Program::to_hex`].
    pub fn from_hex(text: &str) -> Result<Self, ProgramError> {
        let text = text.trim();
        if text.len() % 2 != 0 {
            return Err(ProgramError::OddHexLength(text.len()));
        }

        let bytes = text
            .as_bytes()
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| {
                let high = hex_value(pair[0]).ok_or(ProgramError::InvalidHexDigit(i * 2))?;
                let low = hex_value(pair[1]).ok_or(ProgramError::InvalidHexDigit(i * 2 + 1))?;
                Ok((high << 4) | low)
            })
            .collect::<Result<Vec<u8>, ProgramError>>()?;

        Ok(Self::from_bytes(bytes))
    }

    /// Render the program as lowercase hex, two digits per byte.
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;

        let mut out = String::with_capacity(self.bytes.len() * 2);
        for byte in &self.bytes {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// Raw program bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of instruction slots.
    #[inline]
    pub fn instruction_count(&self) -> usize {
        self.bytes.len() / INSTRUCTION_WIDTH
    }

    /// Iterate over the encoded instructions in program order.
    pub fn instructions(&self) -> impl Iterator<Item = [u8; INSTRUCTION_WIDTH]> + '_ {
        self.bytes
            .chunks_exact(INSTRUCTION_WIDTH)
            .map(|c| [c[0], c[1], c[2]])
    }

    /// Mutable access to one instruction slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not below [`Program::instruction_count`].
    pub fn slot_mut(&mut self, slot: usize) -> &mut [u8] {
        let start = slot * INSTRUCTION_WIDTH;
        &mut self.bytes[start..start + INSTRUCTION_WIDTH]
    }

    /// Overwrite `[start, end)` with the same range of `other`.
    ///
    /// Both bounds must be instruction aligned and within both programs.
    pub(crate) fn splice_from(&mut self, other: &Program, start: usize, end: usize) {
        debug_assert!(start % INSTRUCTION_WIDTH == 0 && end % INSTRUCTION_WIDTH == 0);
        self.bytes[start..end].copy_from_slice(&other.bytes[start..end]);
    }

    /// Shorten the program to `len` bytes (instruction aligned).
    pub(crate) fn truncate(&mut self, len: usize) {
        debug_assert!(len % INSTRUCTION_WIDTH == 0);
        self.bytes.truncate(len);
    }
}

impl From<Program> for String {
    fn from(program: Program) -> Self {
        program.to_hex()
    }
}

impl TryFrom<String> for Program {
    type Error = ProgramError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Program::from_hex(&text)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Errors parsing the program text form.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("Hex program text has odd length {0}")]
    OddHexLength(usize),
    #[error("Invalid hex digit at offset {0}")]
    InvalidHexDigit(usize),
}

/// A candidate program together with the results of its last execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    /// The instructions.
    pub program: Program,
    /// Fitness of the most recent scored execution, or a sentinel.
    pub score: i64,
    /// Bytes written by the most recent execution.
    pub output_length: usize,
}

impl Individual {
    /// Wrap a program that has not been executed yet.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            score: UNSCORED,
            output_length: 0,
        }
    }

    /// Whether a scorer has assigned this individual a fitness.
    pub fn is_scored(&self) -> bool {
        self.score >= 0
    }

    /// Whether the last scored execution was aborted.
    pub fn is_crashed(&self) -> bool {
        self.score == CRASHED
    }
}
