//! Bytecode generation
//!
//! Walks the statement tree and emits the flat instruction vector, picking
//! opcode variants by operand mode (V = plain variable cell, A = indexed
//! array access). Assignments, `+`/`-` and comparisons are fused with
//! inline operands; `*`/`/`/`%` go through the two registers. Local
//! optimisations: `T = T ± 1` collapses to INC/DEC, and `while` loops are
//! inverted into do-while form so each iteration runs a single branch.
//! A second pass resolves `break N`/`continue N` against the enclosing
//! loops.

use crate::ast::{Program, Statement, StatementKind};
use rill_core::{Heap, Image, Instruction, Opcode};
use std::collections::HashMap;

/// The implicit array exposing the command-line arguments.
pub const ARGS_ARRAY: &str = "!args";

/// Code generator state: the growing instruction vector, the word heap,
/// and the interning maps (dropped once generation finishes; only the
/// heap travels into the image).
pub struct CodeGen {
    code: Vec<Instruction>,
    heap: Heap,
    variables: HashMap<String, usize>,
    arrays: HashMap<String, usize>,
}

impl CodeGen {
    /// Create a generator with `!args` pre-seeded from the argument
    /// vector: `argument 0 x` reads the first argument, and
    /// `argument size n` reads the count.
    pub fn new(args: &[i64]) -> Self {
        let mut heap = Heap::new();
        let mut arrays = HashMap::new();

        let base = heap.alloc_array(args.len());
        for (i, &arg) in args.iter().enumerate() {
            heap.set(base + i, arg);
        }
        arrays.insert(ARGS_ARRAY.to_string(), base);

        CodeGen {
            code: Vec::new(),
            heap,
            variables: HashMap::new(),
            arrays,
        }
    }

    /// Generate the complete image: the program's code, the terminal HALT,
    /// then the break/continue resolution pass over the tree.
    pub fn generate(mut self, program: &mut Program) -> Result<Image, String> {
        self.block(program)?;
        self.code.push(Instruction::new(Opcode::Halt));

        let mut while_stack = Vec::new();
        self.resolve_break_continue(program, &mut while_stack)?;

        Ok(Image {
            code: self.code,
            heap: self.heap,
        })
    }

    fn block(&mut self, program: &mut [Statement]) -> Result<(), String> {
        for stm in program {
            self.statement(stm)?;
        }
        Ok(())
    }

    fn statement(&mut self, stm: &mut Statement) -> Result<(), String> {
        stm.start_pos = self.code.len();

        match stm.kind {
            StatementKind::Write | StatementKind::Writeln => {
                self.load(1, stm.token(1)?);
                let opcode = if stm.kind == StatementKind::Write {
                    Opcode::Write
                } else {
                    Opcode::Writeln
                };
                self.code.push(Instruction::new(opcode));
            }

            StatementKind::Read | StatementKind::Rand => {
                let opcode = if stm.kind == StatementKind::Read {
                    Opcode::Read
                } else {
                    Opcode::Rand
                };
                self.code.push(Instruction::new(opcode));
                self.store(stm.token(1)?)?;
            }

            StatementKind::AssignVar => {
                self.assignment(stm.token(2)?, stm.token(0)?)?;
            }

            StatementKind::AssignExp => {
                let target = stm.token(0)?;
                let x = stm.token(2)?;
                let oper = stm.token(3)?;
                let y = stm.token(4)?;

                // T = T ± 1 and T = 1 ± T collapse to a single INC/DEC
                if (oper == "+" || oper == "-")
                    && ((target == x && y == "1") || (target == y && x == "1"))
                {
                    self.inc_dec(target, oper == "+")?;
                } else {
                    self.expression(x, oper, y, Some(target))?;
                    // ADD/SUB fuse the store; the register ops need one
                    if oper != "+" && oper != "-" {
                        self.store(target)?;
                    }
                }
            }

            StatementKind::If | StatementKind::While => {
                let x = stm.token(1)?.to_string();
                let oper = stm.token(2)?.to_string();
                let y = stm.token(3)?.to_string();
                let is_while = stm.kind == StatementKind::While;

                // X == X is textually always true: no entry test emitted
                let always_true = x == y && oper == "==";
                let mut guard = None;
                if !always_true {
                    // the fused compare branches over the body when the
                    // predicate fails; the offset is patched below
                    self.expression(&x, &oper, &y, None)?;
                    guard = Some(self.code.len() - 1);
                }
                let guard_len = self.code.len() - stm.start_pos;

                if let Some(body) = stm.body.as_mut() {
                    self.block(body)?;
                }

                // a while loop ends with the inverse test branching back to
                // the body start: while (c) { b } runs as
                // if (c) do { b } while (c), one branch per iteration
                let mut back = None;
                if is_while {
                    if always_true {
                        self.code.push(Instruction::new(Opcode::Jump));
                    } else {
                        self.expression(&x, inverse_oper(&oper)?, &y, None)?;
                    }
                    back = Some(self.code.len() - 1);
                }

                let mut else_jump = None;
                if stm.else_body.is_some() {
                    self.code.push(Instruction::new(Opcode::Jump));
                    else_jump = Some(self.code.len() - 1);
                }

                let body_len = self.code.len() - stm.start_pos - guard_len;
                if let Some(i) = guard {
                    self.code[i].n = body_len as isize;
                }
                if let Some(i) = back {
                    self.code[i].n = -(body_len as isize);
                }

                if let (Some(else_body), Some(i)) = (stm.else_body.as_mut(), else_jump) {
                    self.block(else_body)?;
                    let else_len = self.code.len() - stm.start_pos - guard_len - body_len;
                    self.code[i].n = else_len as isize;
                }
            }

            StatementKind::Break | StatementKind::Continue => {
                // target filled in by resolve_break_continue
                self.code.push(Instruction::new(Opcode::Jump));
            }

            StatementKind::New => {
                let (name, index) = split_indexed(stm.token(1)?);
                let Some(size_token) = index else {
                    return Err(format!("malformed statement: {}", stm.tokens.join(" ")));
                };
                let base = self.array(name);
                self.load(1, size_token);
                self.code.push(Instruction::with_args(Opcode::New, vec![base]));
            }

            StatementKind::Free => {
                let base = self.array(stm.token(1)?);
                self.code.push(Instruction::with_args(Opcode::Free, vec![base]));
            }

            StatementKind::Size | StatementKind::ArgSize => {
                let base = if stm.kind == StatementKind::Size {
                    self.array(stm.token(1)?)
                } else {
                    self.array(ARGS_ARRAY)
                };
                self.code.push(Instruction::with_args(Opcode::Size, vec![base]));
                self.store(stm.token(2)?)?;
            }

            StatementKind::Arg => {
                let index = self.variable(stm.token(1)?);
                let base = self.array(ARGS_ARRAY);
                self.code
                    .push(Instruction::with_args(Opcode::Load1A, vec![index, base]));
                self.store(stm.token(2)?)?;
            }
        }

        stm.end_pos = self.code.len();
        Ok(())
    }

    /// Intern a variable cell, creating it on first mention. A name with a
    /// leading digit becomes a read-only constant initialised from its
    /// numeric prefix.
    fn variable(&mut self, name: &str) -> usize {
        if let Some(&cell) = self.variables.get(name) {
            return cell;
        }
        let cell = self.heap.alloc_cell(numeric_prefix(name));
        self.variables.insert(name.to_string(), cell);
        cell
    }

    /// Intern an array, creating the 0-length sentinel buffer on first
    /// mention; `new` later rebinds it to a real buffer.
    fn array(&mut self, name: &str) -> usize {
        if let Some(&base) = self.arrays.get(name) {
            return base;
        }
        let base = self.heap.alloc_array(0);
        self.arrays.insert(name.to_string(), base);
        base
    }

    /// Append the operand slots for one V or A operand: a bare cell, or
    /// (index cell, array base) with the base last.
    fn push_operand(&mut self, instr: &mut Instruction, name: &str, index: Option<&str>) {
        match index {
            Some(idx) => {
                instr.push_arg(self.variable(idx));
                instr.push_arg(self.array(name));
            }
            None => instr.push_arg(self.variable(name)),
        }
    }

    fn load(&mut self, reg: u8, token: &str) {
        let (name, index) = split_indexed(token);
        let opcode = match (reg, index.is_some()) {
            (1, false) => Opcode::Load1V,
            (1, true) => Opcode::Load1A,
            (_, false) => Opcode::Load2V,
            (_, true) => Opcode::Load2A,
        };
        let mut instr = Instruction::new(opcode);
        self.push_operand(&mut instr, name, index);
        self.code.push(instr);
    }

    fn store(&mut self, token: &str) -> Result<(), String> {
        let (name, index) = split_indexed(token);
        if is_constant(name) {
            return Err(format!("cannot store to constant {}", token));
        }
        let opcode = if index.is_some() {
            Opcode::StoreA
        } else {
            Opcode::StoreV
        };
        let mut instr = Instruction::new(opcode);
        self.push_operand(&mut instr, name, index);
        self.code.push(instr);
        Ok(())
    }

    fn inc_dec(&mut self, token: &str, inc: bool) -> Result<(), String> {
        let (name, index) = split_indexed(token);
        if is_constant(name) {
            return Err(format!("cannot store to constant {}", token));
        }
        let opcode = match (inc, index.is_some()) {
            (true, false) => Opcode::IncV,
            (true, true) => Opcode::IncA,
            (false, false) => Opcode::DecV,
            (false, true) => Opcode::DecA,
        };
        let mut instr = Instruction::new(opcode);
        self.push_operand(&mut instr, name, index);
        self.code.push(instr);
        Ok(())
    }

    /// T = X (no operator): a direct source-to-target copy.
    fn assignment(&mut self, x: &str, target: &str) -> Result<(), String> {
        let (x_name, x_index) = split_indexed(x);
        let (t_name, t_index) = split_indexed(target);
        if is_constant(t_name) {
            return Err(format!("cannot store to constant {}", target));
        }

        let opcode = match (x_index.is_some(), t_index.is_some()) {
            (false, false) => Opcode::AssignVv,
            (true, false) => Opcode::AssignVa,
            (false, true) => Opcode::AssignAv,
            (true, true) => Opcode::AssignAa,
        };
        let mut instr = Instruction::new(opcode);
        self.push_operand(&mut instr, x_name, x_index);
        self.push_operand(&mut instr, t_name, t_index);
        self.code.push(instr);
        Ok(())
    }

    /// Emit one expression or condition. `+`/`-` fuse the store into the
    /// arithmetic opcode and require `target`; comparisons are targetless
    /// compare-and-branch; `*`/`/`/`%` go through the registers and leave
    /// the store to the caller.
    fn expression(
        &mut self,
        x: &str,
        oper: &str,
        y: &str,
        target: Option<&str>,
    ) -> Result<(), String> {
        if matches!(oper, "*" | "/" | "%") {
            self.load(1, x);
            self.load(2, y);
            let opcode = match oper {
                "*" => Opcode::Mul,
                "/" => Opcode::Div,
                _ => Opcode::Mod,
            };
            self.code.push(Instruction::new(opcode));
            return Ok(());
        }

        let mut x = split_indexed(x);
        let mut y = split_indexed(y);

        // swap x,y
        //  - for >,>= (implemented as <,<=)
        //  - for symmetric operations, when only x is an array, so the
        //    single-array form always carries the array in the y position
        let is_inequality = oper.starts_with('<') || oper.starts_with('>');
        if oper.starts_with('>') || (!is_inequality && x.1.is_some() && y.1.is_none()) {
            std::mem::swap(&mut x, &mut y);
        }

        let x_arr = x.1.is_some();
        let y_arr = y.1.is_some();

        if oper == "+" || oper == "-" {
            let Some(target) = target else {
                return Err(format!("operator {} cannot be used as a condition", oper));
            };
            let (t_name, t_index) = split_indexed(target);
            if is_constant(t_name) {
                return Err(format!("cannot store to constant {}", target));
            }
            let opcode = arith_opcode(oper == "+", t_index.is_some(), x_arr, y_arr);
            let mut instr = Instruction::new(opcode);
            self.push_operand(&mut instr, x.0, x.1);
            self.push_operand(&mut instr, y.0, y.1);
            self.push_operand(&mut instr, t_name, t_index);
            self.code.push(instr);
        } else {
            let mut instr = Instruction::new(compare_opcode(oper, x_arr, y_arr)?);
            self.push_operand(&mut instr, x.0, x.1);
            self.push_operand(&mut instr, y.0, y.1);
            self.code.push(instr);
        }
        Ok(())
    }

    /// Second pass: walk the tree with a stack of enclosing while loops
    /// and point every break/continue jump at the end (break) or start
    /// (continue) of the loop at the requested depth.
    fn resolve_break_continue(
        &mut self,
        program: &[Statement],
        while_stack: &mut Vec<(usize, usize)>,
    ) -> Result<(), String> {
        for stm in program {
            if matches!(stm.kind, StatementKind::Break | StatementKind::Continue) {
                let levels = match stm.tokens.get(1) {
                    Some(token) => numeric_prefix(token),
                    None => 1,
                };
                if levels < 1 || levels as usize > while_stack.len() {
                    return Err("invalid break/continue".to_string());
                }
                let (start, end) = while_stack[while_stack.len() - levels as usize];
                let target = if stm.kind == StatementKind::Break {
                    end
                } else {
                    start
                };
                // the instruction pointer is already past the jump when it
                // dispatches, hence the +1
                self.code[stm.start_pos].n = target as isize - (stm.start_pos as isize + 1);
            }

            if stm.kind == StatementKind::While {
                while_stack.push((stm.start_pos, stm.end_pos));
            }
            if let Some(body) = &stm.body {
                self.resolve_break_continue(body, while_stack)?;
            }
            if let Some(else_body) = &stm.else_body {
                self.resolve_break_continue(else_body, while_stack)?;
            }
            if stm.kind == StatementKind::While {
                while_stack.pop();
            }
        }
        Ok(())
    }
}

/// Split `name[idx]` into name and index token; a plain name has no index.
fn split_indexed(token: &str) -> (&str, Option<&str>) {
    match token.find('[') {
        Some(pos) => {
            let index = &token[pos + 1..];
            (&token[..pos], Some(index.strip_suffix(']').unwrap_or(index)))
        }
        None => (token, None),
    }
}

/// Names with a leading decimal digit are read-only integer constants.
fn is_constant(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_digit())
}

/// Value of a constant name: its leading decimal digits, 0 otherwise.
fn numeric_prefix(name: &str) -> i64 {
    if !is_constant(name) {
        return 0;
    }
    let end = name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(name.len());
    name[..end].parse().unwrap_or(0)
}

/// Inverse predicate, used to place the loop test at the bottom of a
/// while body.
fn inverse_oper(oper: &str) -> Result<&'static str, String> {
    match oper {
        "==" => Ok("!="),
        "!=" => Ok("=="),
        ">=" => Ok("<"),
        ">" => Ok("<="),
        "<=" => Ok(">"),
        "<" => Ok(">="),
        _ => Err(format!("unknown comparison operator {}", oper)),
    }
}

/// ADD/SUB variant by target mode and source modes. Sources arrive
/// normalised: a single array operand is always y, so (array, var) never
/// occurs and the source pair indexes a three-entry row.
fn arith_opcode(add: bool, t_arr: bool, x_arr: bool, y_arr: bool) -> Opcode {
    use Opcode::*;
    let table = if add {
        [AddVvv, AddVva, AddVaa, AddAvv, AddAva, AddAaa]
    } else {
        [SubVvv, SubVva, SubVaa, SubAvv, SubAva, SubAaa]
    };
    table[x_arr as usize + y_arr as usize + if t_arr { 3 } else { 0 }]
}

/// Compare-and-branch variant by operator and operand modes. `>`/`>=`
/// arrive here already swapped into `<`/`<=`.
fn compare_opcode(oper: &str, x_arr: bool, y_arr: bool) -> Result<Opcode, String> {
    use Opcode::*;
    let opcode = match oper {
        "==" => [EqVv, EqVa, EqAa][x_arr as usize + y_arr as usize],
        "!=" => [NeqVv, NeqVa, NeqAa][x_arr as usize + y_arr as usize],
        "<" | ">" => match (x_arr, y_arr) {
            (false, false) => LtVv,
            (false, true) => LtVa,
            (true, false) => LtAv,
            (true, true) => LtAa,
        },
        "<=" | ">=" => match (x_arr, y_arr) {
            (false, false) => LeVv,
            (false, true) => LeVa,
            (true, false) => LeAv,
            (true, true) => LeAa,
        },
        _ => return Err(format!("unknown operator {}", oper)),
    };
    Ok(opcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn compile(source: &str) -> Image {
        let mut program = parser::parse(source).unwrap();
        CodeGen::new(&[]).generate(&mut program).unwrap()
    }

    fn compile_err(source: &str) -> String {
        let mut program = parser::parse(source).unwrap();
        CodeGen::new(&[]).generate(&mut program).unwrap_err()
    }

    fn opcodes(image: &Image) -> Vec<Opcode> {
        image.code.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn test_split_indexed() {
        assert_eq!(split_indexed("x"), ("x", None));
        assert_eq!(split_indexed("a[i]"), ("a", Some("i")));
        assert_eq!(split_indexed("a[0]"), ("a", Some("0")));
    }

    #[test]
    fn test_numeric_prefix() {
        assert_eq!(numeric_prefix("42"), 42);
        assert_eq!(numeric_prefix("0"), 0);
        assert_eq!(numeric_prefix("12abc"), 12);
        // no leading digit: an ordinary variable, initialised to 0
        assert_eq!(numeric_prefix("x"), 0);
        assert_eq!(numeric_prefix("-5"), 0);
    }

    #[test]
    fn test_inverse_oper() {
        assert_eq!(inverse_oper("==").unwrap(), "!=");
        assert_eq!(inverse_oper("<").unwrap(), ">=");
        assert_eq!(inverse_oper(">=").unwrap(), "<");
        assert!(inverse_oper("+").is_err());
    }

    #[test]
    fn test_inc_dec_fusion() {
        use Opcode::*;
        assert_eq!(opcodes(&compile("i = i + 1\n")), vec![IncV, Halt]);
        assert_eq!(opcodes(&compile("i = 1 + i\n")), vec![IncV, Halt]);
        assert_eq!(opcodes(&compile("i = i - 1\n")), vec![DecV, Halt]);
        assert_eq!(opcodes(&compile("a[j] = a[j] + 1\n")), vec![IncA, Halt]);
    }

    #[test]
    fn test_one_minus_t_also_fuses_to_dec() {
        // reference behavior: T = 1 - T selects DEC like T = T - 1
        assert_eq!(opcodes(&compile("x = 1 - x\n")), vec![Opcode::DecV, Opcode::Halt]);
    }

    #[test]
    fn test_register_ops_load_compute_store() {
        use Opcode::*;
        assert_eq!(
            opcodes(&compile("z = x * y\n")),
            vec![Load1V, Load2V, Mul, StoreV, Halt]
        );
        assert_eq!(
            opcodes(&compile("z = x % a[i]\n")),
            vec![Load1V, Load2A, Mod, StoreV, Halt]
        );
    }

    #[test]
    fn test_fused_add_variants() {
        use Opcode::*;
        assert_eq!(opcodes(&compile("z = x + y\n")), vec![AddVvv, Halt]);
        assert_eq!(opcodes(&compile("z = x + a[i]\n")), vec![AddVva, Halt]);
        // single array operand swaps into the y position
        assert_eq!(opcodes(&compile("z = a[i] + x\n")), vec![AddVva, Halt]);
        assert_eq!(opcodes(&compile("a[i] = b[j] + c[k]\n")), vec![AddAaa, Halt]);
        assert_eq!(opcodes(&compile("a[i] = x + y\n")), vec![AddAvv, Halt]);
    }

    #[test]
    fn test_fused_sub_variants() {
        use Opcode::*;
        assert_eq!(opcodes(&compile("z = x - y\n")), vec![SubVvv, Halt]);
        assert_eq!(opcodes(&compile("z = x - a[i]\n")), vec![SubVva, Halt]);
        assert_eq!(opcodes(&compile("a[i] = x - y\n")), vec![SubAvv, Halt]);
    }

    #[test]
    fn test_assignment_variants() {
        use Opcode::*;
        assert_eq!(opcodes(&compile("x = y\n")), vec![AssignVv, Halt]);
        assert_eq!(opcodes(&compile("x = a[i]\n")), vec![AssignVa, Halt]);
        assert_eq!(opcodes(&compile("a[i] = x\n")), vec![AssignAv, Halt]);
        assert_eq!(opcodes(&compile("a[i] = b[j]\n")), vec![AssignAa, Halt]);
    }

    #[test]
    fn test_compare_fusion_emits_single_branch() {
        use Opcode::*;
        // one fused compare, no separate jump before the body
        let image = compile("if x < y\n\twriteln 1\n");
        assert_eq!(opcodes(&image), vec![LtVv, Load1V, Writeln, Halt]);
        assert_eq!(image.code[0].n, 2);
    }

    #[test]
    fn test_compare_variants_match_operand_modes() {
        use Opcode::*;
        assert_eq!(opcodes(&compile("if a[i] < y\n\twriteln 1\n"))[0], LtAv);
        assert_eq!(opcodes(&compile("if x <= a[i]\n\twriteln 1\n"))[0], LeVa);
        assert_eq!(opcodes(&compile("if a[i] == b[j]\n\twriteln 1\n"))[0], EqAa);
        // symmetric compare with one array swaps it into the y position
        assert_eq!(opcodes(&compile("if a[i] == y\n\twriteln 1\n"))[0], EqVa);
    }

    #[test]
    fn test_gt_ge_lower_to_lt_le() {
        use Opcode::*;
        assert_eq!(opcodes(&compile("if x > y\n\twriteln 1\n"))[0], LtVv);
        assert_eq!(opcodes(&compile("if x >= y\n\twriteln 1\n"))[0], LeVv);
    }

    #[test]
    fn test_while_inversion() {
        use Opcode::*;
        // while (c) { b }  =>  entry test, body, inverse test back to body
        let image = compile("while x < y\n\tx = x + 1\n");
        assert_eq!(opcodes(&image), vec![LtVv, IncV, LeVv, Halt]);
        assert_eq!(image.code[0].n, 2);
        assert_eq!(image.code[2].n, -2);
    }

    #[test]
    fn test_tautological_while_uses_plain_jump() {
        use Opcode::*;
        let image = compile("while 1 == 1\n\tbreak\n");
        assert_eq!(opcodes(&image), vec![Jump, Jump, Halt]);
        // back jump returns to the body start
        assert_eq!(image.code[1].n, -2);
        // break targets the first instruction after the loop
        assert_eq!(image.code[0].n, 1);
    }

    #[test]
    fn test_if_else_layout() {
        use Opcode::*;
        let image = compile("if x == y\n\twriteln 1\nelse\n\twriteln 2\n");
        assert_eq!(
            opcodes(&image),
            vec![EqVv, Load1V, Writeln, Jump, Load1V, Writeln, Halt]
        );
        // the guard skips body plus the jump-over-else
        assert_eq!(image.code[0].n, 3);
        assert_eq!(image.code[3].n, 2);
    }

    #[test]
    fn test_tautological_if_skips_guard() {
        use Opcode::*;
        let image = compile("if 1 == 1\n\twriteln 1\nelse\n\twriteln 2\n");
        assert_eq!(
            opcodes(&image),
            vec![Load1V, Writeln, Jump, Load1V, Writeln, Halt]
        );
        assert_eq!(image.code[2].n, 2);
    }

    #[test]
    fn test_break_depth_two() {
        let image = compile("while 1 == 1\n\twhile 1 == 1\n\t\tbreak 2\nwriteln 7\n");
        // layout: [0] break jump, [1] inner back jump, [2] outer back jump,
        //         [3] load 7, [4] writeln, [5] halt
        assert_eq!(image.code[0].n, 2); // 0 + 1 + 2 = 3, past the outer loop
        assert_eq!(image.code[1].n, -2);
        assert_eq!(image.code[2].n, -3);
    }

    #[test]
    fn test_continue_targets_loop_start() {
        let image = compile("while x < y\n\tcontinue\n");
        // [0] guard, [1] continue jump, [2] inverse test
        assert_eq!(image.code[1].n, -2); // 1 + 1 - 2 = 0, the guard
    }

    #[test]
    fn test_break_outside_loop_is_an_error() {
        assert!(compile_err("break\n").contains("invalid break"));
    }

    #[test]
    fn test_break_beyond_nesting_is_an_error() {
        let err = compile_err("while 1 == 1\n\tbreak 2\n");
        assert!(err.contains("invalid break"));
    }

    #[test]
    fn test_store_to_constant_is_an_error() {
        assert!(compile_err("5 = x\n").contains("cannot store to constant"));
        assert!(compile_err("read 5\n").contains("cannot store to constant"));
        assert!(compile_err("3 = x + y\n").contains("cannot store to constant"));
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        assert!(compile_err("z = x ^ y\n").contains("unknown operator"));
    }

    #[test]
    fn test_args_array_seeding() {
        let cg = CodeGen::new(&[3, 4, 5]);
        let base = cg.arrays[ARGS_ARRAY];
        assert_eq!(cg.heap.array_len(base), 3);
        assert_eq!(cg.heap.get(base), 3);
        assert_eq!(cg.heap.get(base + 1), 4);
        assert_eq!(cg.heap.get(base + 2), 5);
    }

    #[test]
    fn test_argument_statement_reads_args_array() {
        use Opcode::*;
        let mut program = parser::parse("argument 1 x\nargument size n\n").unwrap();
        let cg = CodeGen::new(&[9, 8]);
        let image = cg.generate(&mut program).unwrap();
        assert_eq!(
            opcodes(&image),
            vec![Load1A, StoreV, Size, StoreV, Halt]
        );
    }

    #[test]
    fn test_new_free_size_sequence() {
        use Opcode::*;
        let image = compile("new a[n]\nfree a\nsize a m\n");
        assert_eq!(
            opcodes(&image),
            vec![Load1V, New, Free, Size, StoreV, Halt]
        );
        // all three array ops reference the same interned base
        assert_eq!(image.code[1].args, image.code[2].args);
        assert_eq!(image.code[2].args, image.code[3].args);
    }

    #[test]
    fn test_constant_cells_initialised() {
        let mut program = parser::parse("x = 42\n").unwrap();
        let mut cg = CodeGen::new(&[]);
        cg.block(&mut program).unwrap();
        let cell = cg.variables["42"];
        assert_eq!(cg.heap.get(cell), 42);
        assert_eq!(cg.heap.get(cg.variables["x"]), 0);
    }

    #[test]
    fn test_branch_offsets_in_range() {
        let image = compile(
            "i = 0\nwhile i < 10\n\tif i == 5\n\t\tbreak\n\ti = i + 1\nwriteln i\n",
        );
        for (i, instr) in image.code.iter().enumerate() {
            if instr.opcode.is_branch() {
                let target = i as isize + 1 + instr.n;
                assert!(target >= 0 && (target as usize) < image.code.len());
            } else {
                assert_eq!(instr.n, -1);
            }
        }
    }
}
