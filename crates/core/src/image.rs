//! Compiled program image

use crate::heap::Heap;
use crate::instr::Instruction;

/// A compiled program: the flat bytecode plus the word heap its operand
/// references point into. Produced by the code generator, consumed (and
/// mutated — profiling counters, array rebinding) by the runtime.
#[derive(Debug)]
pub struct Image {
    pub code: Vec<Instruction>,
    pub heap: Heap,
}
