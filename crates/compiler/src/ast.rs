//! Statement tree for Rill source
//!
//! A program is a sequence of statements; `if`/`while` statements own a
//! nested block (and possibly an `else` block). Statements keep their raw
//! tokens: operands are only resolved against the word heap during code
//! generation.

/// A parsed program or nested block.
pub type Program = Vec<Statement>;

/// Statement kinds, classified by leading keyword or shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `write V`
    Write,
    /// `writeln V`
    Writeln,
    /// `read V`
    Read,
    /// `T = X`
    AssignVar,
    /// `T = X op Y`
    AssignExp,
    /// `while X op Y` + indented body
    While,
    /// `if X op Y` + indented body, optional `else` sibling
    If,
    /// `random V`
    Rand,
    /// `argument size V`
    ArgSize,
    /// `argument V1 V2`
    Arg,
    /// `break [N]`
    Break,
    /// `continue [N]`
    Continue,
    /// `new A[V]`
    New,
    /// `free A`
    Free,
    /// `size A V`
    Size,
}

/// One statement with its raw tokens and nested blocks.
///
/// `start_pos`/`end_pos` record the statement's footprint in the emitted
/// bytecode (first instruction index, one past the last); the
/// break/continue resolver reads them after code generation.
#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub tokens: Vec<String>,
    pub body: Option<Program>,
    pub else_body: Option<Program>,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl Statement {
    pub fn new(kind: StatementKind, tokens: Vec<String>) -> Self {
        Statement {
            kind,
            tokens,
            body: None,
            else_body: None,
            start_pos: 0,
            end_pos: 0,
        }
    }

    /// The `i`-th raw token, or a malformed-statement diagnostic.
    pub fn token(&self, i: usize) -> Result<&str, String> {
        self.tokens
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| format!("malformed statement: {}", self.tokens.join(" ")))
    }
}
