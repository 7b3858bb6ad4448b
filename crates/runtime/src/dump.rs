//! Verbose bytecode listing
//!
//! One line per instruction: the opcode name left-aligned in a 12-character
//! field, the dispatch count in parentheses, the jump offset for branches,
//! then each operand reference.

use rill_core::Instruction;
use std::io::{self, Write};

pub fn write_code<W: Write>(code: &[Instruction], out: &mut W) -> io::Result<()> {
    for instr in code {
        write!(out, "{:<12} ({})", instr.opcode.name(), instr.exec_count)?;
        if instr.opcode.is_branch() {
            write!(out, " {}", instr.n)?;
        }
        for arg in &instr.args {
            write!(out, " {}", arg)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
