use std::io::{Read, Write};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qftasm_rs::{Machine, MachineConfig};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a QFTASM program on the qftasm-rs interpreter"
)]
struct Opts {
    /// Cap the number of executed cycles; the machine itself never stops a
    /// non-terminating program.
    #[arg(long)]
    max_steps: Option<u64>,
    /// Report cycle count and the memory write-counter distribution on exit.
    #[arg(long)]
    stats: bool,
    #[arg(value_name = "SOURCE")]
    input: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let source = std::fs::read_to_string(&opts.input)?;
    let mut machine = Machine::new(&source, MachineConfig::default());

    let mut stdin = Vec::new();
    std::io::stdin().read_to_end(&mut stdin)?;
    machine.feed_input(&stdin);

    machine.run(opts.max_steps)?;

    let out = machine.take_output();
    std::io::stdout().write_all(&out)?;

    if opts.stats {
        let stats = machine.stats();
        eprintln!("ROM size: {}", stats.rom_len);
        eprintln!("n_steps: {}", stats.cycles);
        eprintln!(
            "Nonzero write count ram addresses: {}",
            stats.written_cells
        );
        eprintln!(
            "Nonzero write count ram max address: {}",
            stats.max_written_addr.map_or(-1, |a| a as i64)
        );
    }

    Ok(())
}
