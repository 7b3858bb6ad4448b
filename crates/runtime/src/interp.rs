//! The dispatch loop
//!
//! Two integer registers, an instruction pointer into the slot stream, and
//! indirect-threaded dispatch: a tight loop matching on the opcode in the
//! dispatch slot at `ip`. Each handler consumes its operand slots,
//! advances `ip` past them, and falls back to the dispatch point.
//!
//! Branch handlers find `ip` on their target slot: the fall-through path
//! skips it and the operands, the taken path loads the resolved position
//! from it. `new`/`free` rebind the stream in place, rewriting every
//! operand slot that holds the retired array base.
//!
//! The language itself is unchecked: out-of-bounds array access and
//! division by zero surface as host panics.

use rand::Rng;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use rill_core::{Image, Opcode};

use crate::config::RunConfig;
use crate::dump;
use crate::thread::{self, Slot};

/// Inclusive upper bound of the `random` statement.
const RAND_MAX: i64 = i32::MAX as i64;

/// Thread the image and execute it.
///
/// `input` feeds `read`, `output` receives `write`/`writeln` and the
/// verbose/profile dumps, and `rng` backs `random`. Execution ends at
/// HALT, or cleanly when `read` hits end of input or a non-numeric token.
pub fn run<R: BufRead, W: Write, G: Rng>(
    image: &mut Image,
    config: &RunConfig,
    input: R,
    output: W,
    rng: G,
) -> Result<(), String> {
    exec(image, config, input, output, rng).map_err(|e| format!("i/o error: {}", e))
}

fn exec<R: BufRead, W: Write, G: Rng>(
    image: &mut Image,
    config: &RunConfig,
    mut input: R,
    mut output: W,
    mut rng: G,
) -> io::Result<()> {
    let Image { code, heap } = image;

    if config.verbose {
        dump::write_code(code, &mut output)?;
    }

    let mut slots = thread::thread(code);

    // dispatch-slot position -> instruction index, for profiling only
    let profile: Option<HashMap<usize, usize>> = config.profile.then(|| {
        code.iter()
            .enumerate()
            .map(|(i, instr)| (instr.thread_pos, i))
            .collect()
    });

    let mut reg1: i64 = 0;
    let mut reg2: i64 = 0;
    let mut ip: usize = 0;

    loop {
        let op = match slots[ip] {
            Slot::Op(op) => op,
            _ => unreachable!("dispatch slot expected at {}", ip),
        };
        if let Some(map) = &profile {
            code[map[&ip]].exec_count += 1;
        }
        ip += 1;

        match op {
            Opcode::Load1V => {
                reg1 = heap.get(arg(&slots, ip));
                ip += 1;
            }
            Opcode::Load2V => {
                reg2 = heap.get(arg(&slots, ip));
                ip += 1;
            }
            Opcode::Load1A => {
                reg1 = heap.elem(arg(&slots, ip + 1), arg(&slots, ip));
                ip += 2;
            }
            Opcode::Load2A => {
                reg2 = heap.elem(arg(&slots, ip + 1), arg(&slots, ip));
                ip += 2;
            }
            Opcode::StoreV => {
                heap.set(arg(&slots, ip), reg1);
                ip += 1;
            }
            Opcode::StoreA => {
                heap.set_elem(arg(&slots, ip + 1), arg(&slots, ip), reg1);
                ip += 2;
            }

            Opcode::AssignVv => {
                let value = heap.get(arg(&slots, ip));
                heap.set(arg(&slots, ip + 1), value);
                ip += 2;
            }
            Opcode::AssignVa => {
                let value = heap.elem(arg(&slots, ip + 1), arg(&slots, ip));
                heap.set(arg(&slots, ip + 2), value);
                ip += 3;
            }
            Opcode::AssignAv => {
                let value = heap.get(arg(&slots, ip));
                heap.set_elem(arg(&slots, ip + 2), arg(&slots, ip + 1), value);
                ip += 3;
            }
            Opcode::AssignAa => {
                let value = heap.elem(arg(&slots, ip + 1), arg(&slots, ip));
                heap.set_elem(arg(&slots, ip + 3), arg(&slots, ip + 2), value);
                ip += 4;
            }

            Opcode::IncV | Opcode::DecV => {
                let cell = arg(&slots, ip);
                let delta = if op == Opcode::IncV { 1 } else { -1 };
                heap.set(cell, heap.get(cell) + delta);
                ip += 1;
            }
            Opcode::IncA | Opcode::DecA => {
                let addr = heap.elem_addr(arg(&slots, ip + 1), arg(&slots, ip));
                let delta = if op == Opcode::IncA { 1 } else { -1 };
                heap.set(addr, heap.get(addr) + delta);
                ip += 2;
            }

            Opcode::Jump => {
                ip = target(&slots, ip);
            }

            Opcode::AddVvv | Opcode::SubVvv => {
                let value = apply(op, heap.get(arg(&slots, ip)), heap.get(arg(&slots, ip + 1)));
                heap.set(arg(&slots, ip + 2), value);
                ip += 3;
            }
            Opcode::AddVva | Opcode::SubVva => {
                let value = apply(
                    op,
                    heap.get(arg(&slots, ip)),
                    heap.elem(arg(&slots, ip + 2), arg(&slots, ip + 1)),
                );
                heap.set(arg(&slots, ip + 3), value);
                ip += 4;
            }
            Opcode::AddVaa | Opcode::SubVaa => {
                let value = apply(
                    op,
                    heap.elem(arg(&slots, ip + 1), arg(&slots, ip)),
                    heap.elem(arg(&slots, ip + 3), arg(&slots, ip + 2)),
                );
                heap.set(arg(&slots, ip + 4), value);
                ip += 5;
            }
            Opcode::AddAvv | Opcode::SubAvv => {
                let value = apply(op, heap.get(arg(&slots, ip)), heap.get(arg(&slots, ip + 1)));
                heap.set_elem(arg(&slots, ip + 3), arg(&slots, ip + 2), value);
                ip += 4;
            }
            Opcode::AddAva | Opcode::SubAva => {
                let value = apply(
                    op,
                    heap.get(arg(&slots, ip)),
                    heap.elem(arg(&slots, ip + 2), arg(&slots, ip + 1)),
                );
                heap.set_elem(arg(&slots, ip + 4), arg(&slots, ip + 3), value);
                ip += 5;
            }
            Opcode::AddAaa | Opcode::SubAaa => {
                let value = apply(
                    op,
                    heap.elem(arg(&slots, ip + 1), arg(&slots, ip)),
                    heap.elem(arg(&slots, ip + 3), arg(&slots, ip + 2)),
                );
                heap.set_elem(arg(&slots, ip + 5), arg(&slots, ip + 4), value);
                ip += 6;
            }

            Opcode::Mul => reg1 *= reg2,
            Opcode::Div => reg1 /= reg2,
            Opcode::Mod => reg1 %= reg2,

            // compare-and-branch: fall through past the target and operand
            // slots when the predicate holds, take the target otherwise
            Opcode::EqVv | Opcode::NeqVv | Opcode::LeVv | Opcode::LtVv => {
                let a = heap.get(arg(&slots, ip + 1));
                let b = heap.get(arg(&slots, ip + 2));
                ip = if holds(op, a, b) { ip + 3 } else { target(&slots, ip) };
            }
            Opcode::EqVa | Opcode::NeqVa | Opcode::LeVa | Opcode::LtVa => {
                let a = heap.get(arg(&slots, ip + 1));
                let b = heap.elem(arg(&slots, ip + 3), arg(&slots, ip + 2));
                ip = if holds(op, a, b) { ip + 4 } else { target(&slots, ip) };
            }
            Opcode::LeAv | Opcode::LtAv => {
                let a = heap.elem(arg(&slots, ip + 2), arg(&slots, ip + 1));
                let b = heap.get(arg(&slots, ip + 3));
                ip = if holds(op, a, b) { ip + 4 } else { target(&slots, ip) };
            }
            Opcode::EqAa | Opcode::NeqAa | Opcode::LeAa | Opcode::LtAa => {
                let a = heap.elem(arg(&slots, ip + 2), arg(&slots, ip + 1));
                let b = heap.elem(arg(&slots, ip + 4), arg(&slots, ip + 3));
                ip = if holds(op, a, b) { ip + 5 } else { target(&slots, ip) };
            }

            Opcode::New | Opcode::Free => {
                let old_base = arg(&slots, ip);
                let len = if op == Opcode::New { reg1 as usize } else { 0 };
                let new_base = heap.alloc_array(len);
                thread::rebind(&mut slots, old_base, new_base);
                ip += 1;
            }

            Opcode::Size => {
                reg1 = heap.array_len(arg(&slots, ip));
                ip += 1;
            }

            Opcode::Write => write!(output, "{} ", reg1)?,
            Opcode::Writeln => writeln!(output, "{}", reg1)?,

            Opcode::Read => match read_int(&mut input)? {
                Some(value) => reg1 = value,
                // end of input or a non-numeric token ends execution cleanly
                None => return Ok(()),
            },

            Opcode::Rand => reg1 = rng.gen_range(0..=RAND_MAX),

            Opcode::Halt => {
                if config.profile {
                    dump::write_code(code, &mut output)?;
                }
                return Ok(());
            }
        }
    }
}

fn arg(slots: &[Slot], i: usize) -> usize {
    match slots[i] {
        Slot::Arg(a) => a,
        _ => unreachable!("operand slot expected at {}", i),
    }
}

fn target(slots: &[Slot], i: usize) -> usize {
    match slots[i] {
        Slot::Target(t) => t,
        _ => unreachable!("target slot expected at {}", i),
    }
}

fn apply(op: Opcode, a: i64, b: i64) -> i64 {
    match op {
        Opcode::AddVvv | Opcode::AddVva | Opcode::AddVaa | Opcode::AddAvv | Opcode::AddAva
        | Opcode::AddAaa => a + b,
        _ => a - b,
    }
}

fn holds(op: Opcode, a: i64, b: i64) -> bool {
    match op {
        Opcode::EqVv | Opcode::EqVa | Opcode::EqAa => a == b,
        Opcode::NeqVv | Opcode::NeqVa | Opcode::NeqAa => a != b,
        Opcode::LeVv | Opcode::LeVa | Opcode::LeAv | Opcode::LeAa => a <= b,
        _ => a < b,
    }
}

/// Scan one whitespace-delimited integer from the input. `Ok(None)` means
/// end of input or a token that does not start an integer; the delimiter
/// after the digits is left unconsumed.
fn read_int<R: BufRead>(input: &mut R) -> io::Result<Option<i64>> {
    let first = loop {
        match peek_byte(input)? {
            None => return Ok(None),
            Some(b) if b.is_ascii_whitespace() => input.consume(1),
            Some(b) => break b,
        }
    };

    let negative = first == b'-';
    if negative || first == b'+' {
        input.consume(1);
    }

    let mut value: i64 = 0;
    let mut digits = 0usize;
    while let Some(b) = peek_byte(input)? {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add((b - b'0') as i64);
        digits += 1;
        input.consume(1);
    }

    if digits == 0 {
        return Ok(None);
    }
    Ok(Some(if negative { -value } else { value }))
}

fn peek_byte<R: BufRead>(input: &mut R) -> io::Result<Option<u8>> {
    let buf = input.fill_buf()?;
    Ok(buf.first().copied())
}
