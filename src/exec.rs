use serde::{Deserialize, Serialize};

use crate::decoder::Opcode;
use crate::memory::Word;

const WORD_BITS: u32 = 16;
const WORD_MASK: Word = (1 << WORD_BITS) - 1;

/// A computed result waiting in the write-back latch. The engine commits it
/// to memory at the start of the next cycle, after that cycle's fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending {
    pub value: Word,
    pub dest: Word,
}

/// Wrap to the 16-bit word. Two's-complement `&` gives the positive residue
/// for negative inputs.
fn wrap(x: Word) -> Word {
    x & WORD_MASK
}

/// Shift counts outside [0, 63] are an input-program bug; the clamp keeps
/// them defined.
fn shift(b: Word) -> u32 {
    b.clamp(0, 63) as u32
}

/// The opcode table: map three resolved operands to the next latch content.
/// `None` means the latch stays inactive this cycle (a failed MNZ/MLZ).
///
/// ADD/SUB wrap to 16 bits; the bitwise family deliberately does not, and
/// SRA is keyed to bit 7 rather than bit 15 - both are part of the ISA, not
/// bugs to fix here.
pub fn apply(op: Opcode, a: Word, b: Word, c: Word) -> Option<Pending> {
    let value = match op {
        Opcode::Mnz => return (a != 0).then_some(Pending { value: b, dest: c }),
        Opcode::Mlz => return (wrap(a) >> 15 == 1).then_some(Pending { value: b, dest: c }),
        // Wrapping ops: values grown by the unmasked SL can sit near the i64
        // limits, and arithmetic must never trap. The mask commutes with
        // mod-2^64 wraparound, so the post-mask result is unchanged.
        Opcode::Add => wrap(a.wrapping_add(b)),
        Opcode::Sub => wrap(a.wrapping_sub(b).wrapping_add(1 << WORD_BITS)),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::Ant => a & !b,
        Opcode::Sl => a << shift(b),
        Opcode::Srl => a >> shift(b),
        Opcode::Sra => (a & (1 << 7)) ^ ((a & ((1 << 7) - 1)) >> shift(b)),
    };
    Some(Pending { value, dest: c })
}
