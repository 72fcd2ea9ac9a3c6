use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::decoder::{self, DecodeError, Instruction};
use crate::exec::{self, Pending};
use crate::memory::{Ram, Word, PC_ADDR};
use crate::stdio::{self, StreamPorts};

/// Transport selection for the two stdio surfaces. Fixed per machine, not
/// runtime-togglable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Pre-load stdin into the high buffer region before the run instead of
    /// polling cell 1 each cycle.
    pub buffered_stdin: bool,
    /// Drain stdout from the high buffer region at halt instead of polling
    /// cell 2 each cycle.
    pub buffered_stdout: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            buffered_stdin: true,
            buffered_stdout: true,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("invalid instruction at pc {pc}: {source}")]
    BadInstruction {
        pc: usize,
        #[source]
        source: DecodeError,
    },
    #[error("address {addr} outside memory")]
    AddressFault { addr: Word },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// Post-mortem diagnostics; no program semantics depend on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStats {
    pub rom_len: usize,
    pub cycles: u64,
    /// Cells whose write counter is nonzero.
    pub written_cells: usize,
    /// Highest address among those cells.
    pub max_written_addr: Option<usize>,
}

/// One ROM slot: raw text until first fetched, then the cached decode.
#[derive(Debug, Clone)]
enum Slot {
    Raw(String),
    Decoded(Instruction),
}

/// The execution engine: owns all machine state and drives the per-cycle
/// fetch / commit / resolve / compute / advance / stdio pipeline.
pub struct Machine {
    pub ram: Ram,
    rom: Vec<Slot>,
    /// Single-slot write-back latch; the previous cycle's uncommitted result.
    pending: Option<Pending>,
    cycles: u64,
    cfg: MachineConfig,
    ports: StreamPorts,
    input: Vec<u8>,
    out: Vec<u8>,
    drained: bool,
}

impl Machine {
    /// Build a machine from source text, one instruction per non-empty line.
    /// Lines stay undecoded until first fetched.
    pub fn new(source: &str, cfg: MachineConfig) -> Self {
        let rom: Vec<Slot> = source
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| Slot::Raw(l.to_string()))
            .collect();
        debug!(rom_len = rom.len(), ?cfg, "machine loaded");
        Self {
            ram: Ram::new(),
            rom,
            pending: None,
            cycles: 0,
            cfg,
            ports: StreamPorts::default(),
            input: Vec::new(),
            out: Vec::new(),
            drained: false,
        }
    }

    /// Supply the whole input stream. Buffered mode commits it into the high
    /// memory region immediately; streaming mode holds it for the port.
    pub fn feed_input(&mut self, bytes: &[u8]) {
        if self.cfg.buffered_stdin {
            stdio::preload_stdin(&mut self.ram, bytes);
        } else {
            self.input.extend_from_slice(bytes);
        }
    }

    /// One cycle. Order matters: the fetch sees the pre-commit PC, the
    /// operand reads see the post-commit memory, and the PC advance bumps
    /// whatever cell 0 holds *after* the commit - which is what turns a jump
    /// write of `T` into a landing at `T + 1`, one delay slot later.
    pub fn step(&mut self) -> Result<Status, Trap> {
        let pc_word = self.ram.pc();
        if pc_word >= self.rom.len() as Word {
            return Ok(Status::Halted);
        }
        let pc = usize::try_from(pc_word).map_err(|_| Trap::AddressFault { addr: pc_word })?;

        let inst = self.fetch(pc)?;

        if let Some(p) = self.pending.take() {
            let dest = Ram::addr(p.dest)?;
            self.ram.commit(dest, p.value);
            trace!(dest, value = p.value, "latch committed");
        }

        let a = self.ram.resolve(inst.a)?;
        let b = self.ram.resolve(inst.b)?;
        let c = self.ram.resolve(inst.c)?;
        self.pending = exec::apply(inst.op, a, b, c);
        trace!(pc, %inst, a, b, c, "cycle");

        // The unconditional PC advance is itself a counted write, applied to
        // the current (possibly just-jumped) value of cell 0.
        let cur = self.ram.pc();
        self.ram.commit(PC_ADDR, cur + 1);

        if !self.cfg.buffered_stdin {
            self.ports.poll_stdin(&mut self.ram, pc, &self.input);
        }
        if !self.cfg.buffered_stdout {
            self.ports.poll_stdout(&mut self.ram, pc, &mut self.out);
        }

        self.cycles += 1;
        Ok(Status::Running)
    }

    /// Run until the fetched PC leaves the program, or until `max_steps`
    /// cycles when a cap is supplied (the machine itself never imposes one).
    pub fn run(&mut self, max_steps: Option<u64>) -> Result<(), Trap> {
        loop {
            if max_steps.is_some_and(|cap| self.cycles >= cap) {
                debug!(cycles = self.cycles, "step cap reached");
                return Ok(());
            }
            match self.step()? {
                Status::Running => {}
                Status::Halted => {
                    debug!(cycles = self.cycles, "halted");
                    return Ok(());
                }
            }
        }
    }

    /// The program's output bytes: the drained buffer region in buffered
    /// mode, or everything the stdout port emitted in streaming mode.
    /// Consuming in both modes; the output is emitted once, at halt.
    pub fn take_output(&mut self) -> Vec<u8> {
        if self.cfg.buffered_stdout {
            if self.drained {
                return Vec::new();
            }
            self.drained = true;
            stdio::drain_stdout(&self.ram)
        } else {
            std::mem::take(&mut self.out)
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn stats(&self) -> MachineStats {
        let mut written_cells = 0;
        let mut max_written_addr = None;
        for (addr, _) in self.ram.written() {
            written_cells += 1;
            max_written_addr = Some(addr);
        }
        MachineStats {
            rom_len: self.rom.len(),
            cycles: self.cycles,
            written_cells,
            max_written_addr,
        }
    }

    fn fetch(&mut self, pc: usize) -> Result<Instruction, Trap> {
        let inst = match &self.rom[pc] {
            Slot::Decoded(inst) => return Ok(*inst),
            Slot::Raw(line) => {
                decoder::parse_line(line).map_err(|source| Trap::BadInstruction { pc, source })?
            }
        };
        self.rom[pc] = Slot::Decoded(inst);
        Ok(inst)
    }
}
