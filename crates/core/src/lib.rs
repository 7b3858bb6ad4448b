//! Rill Core: the shared foundation of the Rill interpreter
//!
//! This crate holds everything both the compiler front-end and the runtime
//! need to agree on:
//!
//! - `opcode`: the abstract machine's opcode set, with operand-mode
//!   variants (V = plain variable cell, A = indexed array access)
//! - `instr`: the flat bytecode instruction the code generator emits and
//!   the threader consumes
//! - `heap`: the word heap that owns every variable cell and array buffer,
//!   plus the allocation registry released in bulk at teardown
//! - `image`: the compiled unit handed from the compiler to the runtime

pub mod heap;
pub mod image;
pub mod instr;
pub mod opcode;

pub use heap::Heap;
pub use image::Image;
pub use instr::Instruction;
pub use opcode::Opcode;
