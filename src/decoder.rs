use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::memory::Word;

/// The 11 QFTASM opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Mnz,
    Mlz,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Ant,
    Sl,
    Srl,
    Sra,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mnz => "MNZ",
            Opcode::Mlz => "MLZ",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Ant => "ANT",
            Opcode::Sl => "SL",
            Opcode::Srl => "SRL",
            Opcode::Sra => "SRA",
        }
    }
}

impl FromStr for Opcode {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "MNZ" => Opcode::Mnz,
            "MLZ" => Opcode::Mlz,
            "ADD" => Opcode::Add,
            "SUB" => Opcode::Sub,
            "AND" => Opcode::And,
            "OR" => Opcode::Or,
            "XOR" => Opcode::Xor,
            "ANT" => Opcode::Ant,
            "SL" => Opcode::Sl,
            "SRL" => Opcode::Srl,
            "SRA" => Opcode::Sra,
            _ => {
                return Err(DecodeError::UnknownOpcode {
                    mnemonic: s.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Pointer-dereference depth applied to an operand before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddrMode {
    /// No dereference; the raw value is the operand. (No mode letter.)
    Immediate,
    /// One dereference: `ram[v]`. (Letter `A`.)
    Direct,
    /// Two dereferences: `ram[ram[v]]`. (Letter `B`.)
    Indirect,
    /// Three dereferences. (Letter `C`.)
    DoubleIndirect,
}

impl AddrMode {
    pub fn hops(self) -> u32 {
        match self {
            AddrMode::Immediate => 0,
            AddrMode::Direct => 1,
            AddrMode::Indirect => 2,
            AddrMode::DoubleIndirect => 3,
        }
    }

    fn letter(self) -> Option<char> {
        match self {
            AddrMode::Immediate => None,
            AddrMode::Direct => Some('A'),
            AddrMode::Indirect => Some('B'),
            AddrMode::DoubleIndirect => Some('C'),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub mode: AddrMode,
    pub raw: Word,
}

impl Operand {
    pub fn imm(raw: Word) -> Self {
        Self {
            mode: AddrMode::Immediate,
            raw,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(l) = self.mode.letter() {
            write!(f, "{}{}", l, self.raw)
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// One decoded instruction. Immutable once produced; the engine caches one
/// per ROM slot on first fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Opcode,
    pub a: Operand,
    pub b: Operand,
    pub c: Operand,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.op, self.a, self.b, self.c)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("line ends before the opcode")]
    Truncated,
    #[error("missing or malformed line-number label: {token:?}")]
    BadLabel { token: String },
    #[error("unknown opcode mnemonic: {mnemonic:?}")]
    UnknownOpcode { mnemonic: String },
    #[error("malformed operand: {token:?}")]
    BadOperand { token: String },
    #[error("expected 3 operands, found {found}")]
    BadOperandCount { found: usize },
}

/// Parse one source line:
/// `<lineno> '.' <OPCODE> <operand> <operand> <operand> [';' comment]`
///
/// An operand is an optional mode letter (`A`/`B`/`C`) followed immediately
/// by a signed decimal integer. The label value is ignored; the line's
/// position in the file is its address.
pub fn parse_line(line: &str) -> Result<Instruction, DecodeError> {
    let code = match line.find(';') {
        Some(i) => &line[..i],
        None => line,
    };
    let mut tokens = code.split_whitespace();

    let label = tokens.next().unwrap_or("");
    let digits = label.strip_suffix('.').ok_or_else(|| DecodeError::BadLabel {
        token: label.to_string(),
    })?;
    parse_int(digits).ok_or_else(|| DecodeError::BadLabel {
        token: label.to_string(),
    })?;

    let mnemonic = tokens.next().ok_or(DecodeError::Truncated)?;
    let op = mnemonic.parse::<Opcode>()?;

    let rest: Vec<&str> = tokens.collect();
    if rest.len() != 3 {
        return Err(DecodeError::BadOperandCount { found: rest.len() });
    }
    let a = parse_operand(rest[0])?;
    let b = parse_operand(rest[1])?;
    let c = parse_operand(rest[2])?;

    Ok(Instruction { op, a, b, c })
}

fn parse_operand(token: &str) -> Result<Operand, DecodeError> {
    let (mode, digits) = match token.chars().next() {
        Some('A') => (AddrMode::Direct, &token[1..]),
        Some('B') => (AddrMode::Indirect, &token[1..]),
        Some('C') => (AddrMode::DoubleIndirect, &token[1..]),
        _ => (AddrMode::Immediate, token),
    };
    let raw = parse_int(digits).ok_or_else(|| DecodeError::BadOperand {
        token: token.to_string(),
    })?;
    Ok(Operand { mode, raw })
}

/// The grammar's integer: an optional minus then digits. Rust's `FromStr`
/// also admits a leading plus, which the grammar does not.
fn parse_int(digits: &str) -> Option<Word> {
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<Word>().ok()
}
