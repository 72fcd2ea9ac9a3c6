pub mod decoder;
pub mod exec;
pub mod machine;
pub mod memory;
pub mod stdio;

pub use machine::{Machine, MachineConfig, MachineStats, Status, Trap};
pub use memory::{Ram, Word};
