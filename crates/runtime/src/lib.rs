//! Rill Runtime: threaded-code execution engine
//!
//! Consumes the bytecode image produced by the compiler front-end:
//!
//! - `thread`: lays the instructions out as a flat slot stream (dispatch
//!   slot, resolved branch target, operand references) and resolves jump
//!   offsets into slot positions
//! - `interp`: the two-register dispatch loop, including the array
//!   rebinding protocol behind `new`/`free`
//! - `dump`: the verbose bytecode listing
//! - `config`: per-run options (verbose dump, dispatch profiling)

pub mod config;
pub mod dump;
pub mod interp;
pub mod thread;

pub use config::RunConfig;
pub use interp::run;
pub use thread::Slot;
