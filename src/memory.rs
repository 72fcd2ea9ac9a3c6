use serde::{Deserialize, Serialize};

use crate::decoder::Operand;
use crate::machine::Trap;

/// Machine word. Cells nominally hold 16-bit values, but the bitwise opcodes
/// never mask their results, so values can leave [0, 65536) and immediates can
/// be negative. `i64` keeps that arithmetic observable instead of truncating.
pub type Word = i64;

pub const RAM_SIZE: usize = 1 << 16;

/// The program counter is an ordinary memory cell.
pub const PC_ADDR: usize = 0;

/// One addressable cell: a value plus a diagnostic write counter. No opcode
/// can observe the counter; it only feeds post-mortem stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: Word,
    pub writes: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Ram {
    cells: Vec<Cell>,
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    pub fn new() -> Self {
        Self {
            cells: vec![Cell::default(); RAM_SIZE],
        }
    }

    pub fn get(&self, addr: usize) -> Word {
        self.cells[addr].value
    }

    /// The control register. It reads through the same cell path as any
    /// address, and jumps write it through the ordinary write-back latch;
    /// only the engine's per-cycle advance touches it directly.
    pub fn pc(&self) -> Word {
        self.get(PC_ADDR)
    }

    pub fn writes(&self, addr: usize) -> u64 {
        self.cells[addr].writes
    }

    /// A committed write: updates the value and bumps the write counter.
    pub fn commit(&mut self, addr: usize, value: Word) {
        let cell = &mut self.cells[addr];
        cell.value = value;
        cell.writes += 1;
    }

    /// A port refill: rewrites the value without touching the counter. Only
    /// the streaming stdio adapter uses this.
    pub fn poke(&mut self, addr: usize, value: Word) {
        self.cells[addr].value = value;
    }

    /// Convert a word used as an address. Values outside [0, 65535] are an
    /// input-program bug; this implementation hard-faults on them.
    pub fn addr(value: Word) -> Result<usize, Trap> {
        usize::try_from(value)
            .ok()
            .filter(|&a| a < RAM_SIZE)
            .ok_or(Trap::AddressFault { addr: value })
    }

    /// Resolve an operand by dereferencing its raw value through memory once
    /// per addressing-mode hop (0..=3), against the current post-commit state.
    pub fn resolve(&self, operand: Operand) -> Result<Word, Trap> {
        let mut v = operand.raw;
        for _ in 0..operand.mode.hops() {
            v = self.get(Self::addr(v)?);
        }
        Ok(v)
    }

    /// Cells with a nonzero write counter, in address order.
    pub fn written(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.writes > 0)
            .map(|(a, c)| (a, c.writes))
    }
}
