//! Line parser for Rill source
//!
//! Rill source is indentation-structured: each logical line is one
//! statement, and a line starting with a tab belongs to the nested block of
//! the preceding `if`/`while`/`else` header, one tab per nesting level.
//! Tokens are split on spaces and tabs; `#` starts a comment that runs to
//! the end of the line.

use crate::ast::{Program, Statement, StatementKind};

/// Maximum tokens retained per logical line.
const MAX_TOKENS: usize = 6;

/// Parse a whole source text into a statement tree.
pub fn parse(source: &str) -> Result<Program, String> {
    let lines: Vec<&str> = source.lines().collect();
    parse_block(&lines)
}

/// Parse one block of lines (indentation already stripped).
fn parse_block(lines: &[&str]) -> Result<Program, String> {
    let mut program = Program::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let tokens = split_tokens(line);
        if tokens.is_empty() {
            // blank or comment line
            i += 1;
            continue;
        }

        // an `else` block attaches to the statement just parsed
        if tokens[0] == "else" {
            let nested = nested_block(lines, i + 1);
            let consumed = nested.len();
            let else_body = parse_block(&nested)?;
            match program.last_mut() {
                Some(prev) => prev.else_body = Some(else_body),
                None => return Err(format!("else without a preceding statement: {}", line)),
            }
            i += 1 + consumed;
            continue;
        }

        let kind = classify(&tokens).ok_or_else(|| format!("error in line {}", line))?;
        let mut stm = Statement::new(kind, tokens);

        if matches!(stm.kind, StatementKind::If | StatementKind::While) {
            let nested = nested_block(lines, i + 1);
            let consumed = nested.len();
            stm.body = Some(parse_block(&nested)?);
            i += consumed;
        }

        program.push(stm);
        i += 1;
    }

    Ok(program)
}

/// Split a logical line into at most [`MAX_TOKENS`] tokens. A token
/// starting with `#` terminates the line (inline comment).
fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for token in line.split_whitespace() {
        if token.starts_with('#') || tokens.len() == MAX_TOKENS {
            break;
        }
        tokens.push(token.to_string());
    }
    tokens
}

/// Keyword-first statement classification; assignment shapes are
/// distinguished by token count.
fn classify(tokens: &[String]) -> Option<StatementKind> {
    use StatementKind::*;
    let kind = match tokens[0].as_str() {
        "write" => Write,
        "writeln" => Writeln,
        "read" => Read,
        _ if tokens.len() == 3 && tokens[1] == "=" => AssignVar,
        _ if tokens.len() == 5 && tokens[1] == "=" => AssignExp,
        "if" => If,
        "while" => While,
        "random" => Rand,
        "argument" if tokens.get(1).is_some_and(|t| t == "size") => ArgSize,
        "argument" => Arg,
        "break" => Break,
        "continue" => Continue,
        "new" => New,
        "free" => Free,
        "size" => Size,
        _ => return None,
    };
    Some(kind)
}

/// Collect the nested block starting at `start`: lines that begin with a
/// tab (one level stripped) plus any blank or comment lines, up to the
/// first line back at the current indent.
fn nested_block<'a>(lines: &[&'a str], start: usize) -> Vec<&'a str> {
    let mut nested = Vec::new();
    for &line in &lines[start..] {
        if !(line.starts_with('\t') || line.is_empty() || line.starts_with('#')) {
            break;
        }
        nested.push(line.strip_prefix('\t').unwrap_or(line));
    }
    nested
}
