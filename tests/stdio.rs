use qftasm_rs::stdio::{STDIN_BUF_TOP, STDIO_CLOSED, STDIO_OPEN, STDOUT_BUF_TOP};
use qftasm_rs::{Machine, MachineConfig};

fn streaming() -> MachineConfig {
    MachineConfig {
        buffered_stdin: false,
        buffered_stdout: false,
    }
}

#[test]
fn buffered_input_lands_descending_from_the_region_top() {
    let mut m = Machine::new("0. MNZ 0 0 0\n", MachineConfig::default());
    m.feed_input(b"AB");
    assert_eq!(m.ram.get(STDIN_BUF_TOP), i64::from(b'A'));
    assert_eq!(m.ram.get(STDIN_BUF_TOP - 1), i64::from(b'B'));
    assert_eq!(m.ram.writes(STDIN_BUF_TOP), 1);
    assert_eq!(m.ram.writes(STDIN_BUF_TOP - 1), 1);
    // Cells past the loaded extent stay untouched.
    assert_eq!(m.ram.get(STDIN_BUF_TOP - 2), 0);
    assert_eq!(m.ram.writes(STDIN_BUF_TOP - 2), 0);
}

#[test]
fn buffered_output_drains_descending_from_the_region_top() {
    // Write "OK!" at 8191 downward and leave the offset cell one below the
    // last written address; the drain reads back in write order.
    let src = "\
0. MLZ -1 79 8191
1. MLZ -1 75 8190
2. MLZ -1 33 8189
3. MLZ -1 8188 2
4. MNZ 0 0 0
5. MNZ 0 0 0
";
    let mut m = Machine::new(src, MachineConfig::default());
    m.run(None).unwrap();
    assert_eq!(m.ram.get(2), 8188);
    assert_eq!(m.take_output(), b"OK!");
    // Consuming: the bytes come out once.
    assert_eq!(m.take_output(), b"");
}

#[test]
fn buffered_output_is_empty_without_region_writes() {
    // Offset cell committed at the region top means nothing was emitted.
    let src = "\
0. MLZ -1 8191 2
1. MNZ 0 0 0
2. MNZ 0 0 0
";
    let mut m = Machine::new(src, MachineConfig::default());
    m.run(None).unwrap();
    assert_eq!(m.take_output(), b"");

    // A program that never touches the offset cell produces no output; a
    // one-line program halts after a single cycle.
    let mut m = Machine::new("0. ADD 0 1 0\n", MachineConfig::default());
    m.run(None).unwrap();
    assert_eq!(m.cycles(), 1);
    assert_eq!(m.take_output(), b"");
}

#[test]
fn streaming_stdin_port_refills_on_open_sentinel() {
    // Open the port, wait one cycle for the latch, then copy the byte out.
    // The filler after the open is required by the write-back delay.
    let src = "\
0. MNZ 0 0 0
1. MNZ 0 0 0
2. MLZ -1 256 1
3. MLZ 0 0 0
4. MLZ -1 A1 10
5. MLZ 0 0 0
";
    let mut m = Machine::new(src, streaming());
    m.feed_input(b"X");
    m.run(None).unwrap();
    assert_eq!(m.ram.get(10), i64::from(b'X'));
}

#[test]
fn streaming_stdin_reads_zero_once_exhausted() {
    let src = "\
0. MNZ 0 0 0
1. MNZ 0 0 0
2. MLZ -1 256 1
3. MLZ 0 0 0
4. MLZ -1 A1 10
5. MLZ 0 0 0
";
    let mut m = Machine::new(src, streaming());
    m.run(None).unwrap();
    assert_eq!(m.ram.get(10), 0);
    // The copy through A1 did happen; it carried the exhausted-port zero.
    assert_eq!(m.ram.writes(10), 1);
}

#[test]
fn streaming_stdout_emits_on_closed_to_open_transition() {
    // Close the port (arming it), then write a byte: exactly one emission,
    // even though the byte value sits in the cell for several cycles.
    let src = "\
0. MNZ 0 0 0
1. MNZ 0 0 0
2. MLZ -1 512 2
3. MLZ 0 0 0
4. MLZ -1 65 2
5. MLZ 0 0 0
6. MLZ 0 0 0
";
    let mut m = Machine::new(src, streaming());
    m.run(None).unwrap();
    assert_eq!(m.take_output(), b"A");
}

#[test]
fn streaming_ports_are_dead_for_the_first_two_instructions() {
    // An open sentinel pre-seeded in cell 1 must not be consumed while the
    // fetched pc is 0 or 1.
    let src = "\
0. MNZ 0 0 0
1. MNZ 0 0 0
";
    let mut m = Machine::new(src, streaming());
    m.ram.poke(1, STDIO_OPEN);
    m.feed_input(b"Z");
    m.run(None).unwrap();
    assert_eq!(m.ram.get(1), STDIO_OPEN);
}

#[test]
fn streaming_stdout_round_trip_two_bytes() {
    // Emit 'H' then 'i' with a re-close between them.
    let src = "\
0. MNZ 0 0 0
1. MNZ 0 0 0
2. MLZ -1 512 2
3. MLZ 0 0 0
4. MLZ -1 72 2
5. MLZ -1 512 2
6. MLZ -1 105 2
7. MLZ 0 0 0
8. MLZ 0 0 0
";
    let mut m = Machine::new(src, streaming());
    m.run(None).unwrap();
    assert_eq!(m.take_output(), b"Hi");
    assert_eq!(m.take_output(), b"");
}

#[test]
fn sentinels_match_the_fixed_abi() {
    assert_eq!(STDIO_OPEN, 256);
    assert_eq!(STDIO_CLOSED, 512);
    assert_eq!(STDIN_BUF_TOP, 7167);
    assert_eq!(STDOUT_BUF_TOP, 8191);
}
