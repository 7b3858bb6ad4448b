//! Rill Compiler Library
//!
//! Front-end for the Rill scripting language: parses tab-indented source
//! into a statement tree and lowers it to flat bytecode for the two-register
//! abstract machine executed by `rill-runtime`.
//!
//! ```rust
//! let image = rillc::compile_source("writeln x\n", &[]).unwrap();
//! assert!(!image.code.is_empty());
//! ```

pub mod ast;
pub mod codegen;
pub mod parser;

pub use ast::{Program, Statement, StatementKind};
pub use codegen::CodeGen;
pub use parser::parse;

use rill_core::Image;
use std::fs;
use std::path::Path;

/// Compile source text with the given argument vector into an executable
/// image.
pub fn compile_source(source: &str, args: &[i64]) -> Result<Image, String> {
    let mut program = parser::parse(source)?;
    CodeGen::new(args).generate(&mut program)
}

/// Compile a source file with the given argument vector.
pub fn compile_file(path: &Path, args: &[i64]) -> Result<Image, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    compile_source(&source, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::Opcode;

    #[test]
    fn test_compile_source_appends_halt() {
        let image = compile_source("x = 1\n", &[]).unwrap();
        assert_eq!(image.code.last().unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn test_compile_source_reports_parse_errors() {
        let err = compile_source("bogus line here\n", &[]).unwrap_err();
        assert!(err.contains("bogus"));
    }

    #[test]
    fn test_compile_empty_source_is_just_halt() {
        let image = compile_source("", &[]).unwrap();
        assert_eq!(image.code.len(), 1);
        assert_eq!(image.code[0].opcode, Opcode::Halt);
    }
}
