//! Memory-mapped stdio: the fixed ABI addresses plus the two transport
//! flavors. Buffered mode pre-loads the whole input before the run and drains
//! the whole output after halt; streaming mode polls two port cells each
//! cycle.

use tracing::trace;

use crate::memory::{Ram, Word};

/// Streaming-mode stdin port.
pub const STDIN_ADDR: usize = 1;
/// Streaming-mode stdout port; in buffered mode this cell holds the running
/// output-buffer offset instead.
pub const STDOUT_ADDR: usize = 2;

/// Sentinel a program writes to the stdin port to request the next byte.
pub const STDIO_OPEN: Word = 1 << 8;
/// Sentinel a program writes to the stdout port between emitted bytes.
pub const STDIO_CLOSED: Word = 1 << 9;

/// Highest address of the descending input region (7168 cells).
pub const STDIN_BUF_TOP: usize = 7167;
/// Highest address of the descending output region (8192 cells).
pub const STDOUT_BUF_TOP: usize = 8191;

/// Buffered input: byte `i` of the stream lands at `STDIN_BUF_TOP - i`, each
/// as a counted write. Input past the 7168-cell region is dropped.
pub fn preload_stdin(ram: &mut Ram, bytes: &[u8]) {
    for (i, &b) in bytes.iter().take(STDIN_BUF_TOP + 1).enumerate() {
        ram.commit(STDIN_BUF_TOP - i, Word::from(b));
    }
    trace!(len = bytes.len(), "stdin pre-loaded");
}

/// Buffered output: emit the low 8 bits of cells `STDOUT_BUF_TOP` down to
/// `ram[2] + 1`, in descending address order. Programs fill the region from
/// the top downward while decrementing the offset cell, so descending
/// emission is chronological order. A program that never touched the offset
/// cell produced no output.
pub fn drain_stdout(ram: &Ram) -> Vec<u8> {
    if ram.writes(STDOUT_ADDR) == 0 {
        return Vec::new();
    }
    let offset = ram.get(STDOUT_ADDR).max(0) as usize;
    let low = offset.saturating_add(1);
    if low > STDOUT_BUF_TOP {
        return Vec::new();
    }
    (low..=STDOUT_BUF_TOP)
        .rev()
        .map(|addr| (ram.get(addr) & 0xFF) as u8)
        .collect()
}

/// Per-cycle state of the streaming ports. Port writes bypass the diagnostic
/// write counter; only program-side writes to cells 1/2 are counted.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamPorts {
    pos: usize,
    ready: bool,
}

impl StreamPorts {
    /// Refill the stdin port when the program has opened it. Once the input
    /// is exhausted the port reads 0. `pc` is the address fetched this cycle;
    /// the ports are not live for the first two instructions.
    pub fn poll_stdin(&mut self, ram: &mut Ram, pc: usize, input: &[u8]) {
        if pc <= 1 || ram.get(STDIN_ADDR) != STDIO_OPEN {
            return;
        }
        match input.get(self.pos) {
            Some(&b) => {
                ram.poke(STDIN_ADDR, Word::from(b));
                self.pos += 1;
                trace!(byte = b, "stdin port refilled");
            }
            None => ram.poke(STDIN_ADDR, 0),
        }
    }

    /// Drain one byte from the stdout port on a closed-to-open transition.
    /// Observing the closed sentinel arms the port; the next non-closed
    /// value is emitted once and disarms it.
    pub fn poll_stdout(&mut self, ram: &mut Ram, pc: usize, out: &mut Vec<u8>) {
        if pc <= 1 {
            return;
        }
        let v = ram.get(STDOUT_ADDR);
        if v == STDIO_CLOSED {
            self.ready = true;
        } else if self.ready {
            out.push((v & 0xFF) as u8);
            self.ready = false;
            trace!(byte = (v & 0xFF), "stdout port drained");
        }
    }
}
