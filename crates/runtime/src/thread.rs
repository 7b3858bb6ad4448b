//! Threaded-code layout
//!
//! Bytecode is flattened into one linear stream of slots before execution.
//! Each instruction occupies a dispatch slot, then (branches only) a slot
//! holding the resolved target, then one slot per operand reference. Jump
//! offsets, which the code generator expressed in instructions, are
//! resolved here into slot positions once every instruction's place in the
//! stream is known.

use rill_core::{Instruction, Opcode};

/// One slot of the threaded stream.
///
/// The tag keeps the three value spaces apart, so the rebinding scan after
/// `new`/`free` can only ever match operand slots: every slot whose operand
/// value equals the retired array base is rewritten, and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Dispatch token for an opcode handler.
    Op(Opcode),
    /// Resolved branch target: the position of a dispatch slot.
    Target(usize),
    /// Operand reference: a word-heap index of a cell or array base.
    Arg(usize),
}

/// Lay the code out as a slot stream and resolve branch targets. Records
/// each instruction's dispatch-slot position in its `thread_pos`.
pub fn thread(code: &mut [Instruction]) -> Vec<Slot> {
    let total: usize = code
        .iter()
        .map(|i| 1 + i.args.len() + usize::from(i.opcode.is_branch()))
        .sum();
    let mut slots = Vec::with_capacity(total);

    for instr in code.iter_mut() {
        debug_assert_eq!(instr.args.len(), instr.opcode.arg_count());
        instr.thread_pos = slots.len();
        slots.push(Slot::Op(instr.opcode));
        if instr.opcode.is_branch() {
            // reserved; filled below once all positions are known
            slots.push(Slot::Target(0));
        }
        for &arg in &instr.args {
            slots.push(Slot::Arg(arg));
        }
    }
    debug_assert_eq!(slots.len(), total);

    // n is relative to the instruction after the branch, hence the +1
    for i in 0..code.len() {
        if code[i].opcode.is_branch() {
            let target = &code[(i as isize + 1 + code[i].n) as usize];
            slots[code[i].thread_pos + 1] = Slot::Target(target.thread_pos);
        }
    }

    slots
}

/// Rewrite every operand slot holding `old_base` to `new_base`. This is
/// the whole of the rebinding protocol: array bases live inline in the
/// stream, so reallocation patches the stream instead of chasing a
/// descriptor on the hot path.
pub fn rebind(slots: &mut [Slot], old_base: usize, new_base: usize) {
    for slot in slots.iter_mut() {
        if *slot == Slot::Arg(old_base) {
            *slot = Slot::Arg(new_base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::Instruction;

    fn jump(n: isize) -> Instruction {
        let mut instr = Instruction::new(Opcode::Jump);
        instr.n = n;
        instr
    }

    #[test]
    fn test_slot_layout() {
        let mut code = vec![
            Instruction::with_args(Opcode::Load1V, vec![10]),
            Instruction::with_args(Opcode::StoreA, vec![11, 12]),
            Instruction::new(Opcode::Halt),
        ];
        let slots = thread(&mut code);
        assert_eq!(
            slots,
            vec![
                Slot::Op(Opcode::Load1V),
                Slot::Arg(10),
                Slot::Op(Opcode::StoreA),
                Slot::Arg(11),
                Slot::Arg(12),
                Slot::Op(Opcode::Halt),
            ]
        );
        assert_eq!(code[0].thread_pos, 0);
        assert_eq!(code[1].thread_pos, 2);
        assert_eq!(code[2].thread_pos, 5);
    }

    #[test]
    fn test_branch_targets_resolve_to_dispatch_slots() {
        let mut code = vec![
            jump(1),                                        // to halt
            Instruction::with_args(Opcode::IncV, vec![4]),
            Instruction::new(Opcode::Halt),
        ];
        let slots = thread(&mut code);
        // target slot of the jump holds the halt's dispatch position
        assert_eq!(slots[1], Slot::Target(code[2].thread_pos));
        assert!(matches!(slots[code[2].thread_pos], Slot::Op(Opcode::Halt)));
    }

    #[test]
    fn test_backward_branch() {
        let mut code = vec![
            Instruction::with_args(Opcode::IncV, vec![4]),
            jump(-2), // back to the inc
            Instruction::new(Opcode::Halt),
        ];
        let slots = thread(&mut code);
        assert_eq!(slots[code[1].thread_pos + 1], Slot::Target(0));
    }

    #[test]
    fn test_compare_reserves_target_before_operands() {
        let mut code = vec![
            {
                let mut cmp = Instruction::with_args(Opcode::LtVv, vec![7, 8]);
                cmp.n = 0;
                cmp
            },
            Instruction::new(Opcode::Halt),
        ];
        let slots = thread(&mut code);
        assert_eq!(
            slots,
            vec![
                Slot::Op(Opcode::LtVv),
                Slot::Target(4),
                Slot::Arg(7),
                Slot::Arg(8),
                Slot::Op(Opcode::Halt),
            ]
        );
    }

    #[test]
    fn test_resolved_targets_match_offsets() {
        // every branch target equals code[i + 1 + n].thread_pos
        let mut code = vec![
            {
                let mut cmp = Instruction::with_args(Opcode::EqVv, vec![1, 2]);
                cmp.n = 2;
                cmp
            },
            Instruction::with_args(Opcode::IncV, vec![1]),
            jump(-3),
            Instruction::new(Opcode::Halt),
        ];
        let slots = thread(&mut code);
        for (i, instr) in code.iter().enumerate() {
            if instr.opcode.is_branch() {
                let expect = code[(i as isize + 1 + instr.n) as usize].thread_pos;
                assert_eq!(slots[instr.thread_pos + 1], Slot::Target(expect));
            }
        }
    }

    #[test]
    fn test_rebind_touches_only_matching_operands() {
        let mut code = vec![
            Instruction::with_args(Opcode::Size, vec![5]),
            jump(-2),
            Instruction::with_args(Opcode::StoreV, vec![5]),
            Instruction::new(Opcode::Halt),
        ];
        let mut slots = thread(&mut code);
        rebind(&mut slots, 5, 42);
        assert_eq!(slots[1], Slot::Arg(42));
        assert_eq!(slots[5], Slot::Arg(42));
        // the jump's target slot holds 0 and must not be confused with a
        // heap index
        let mut probe = code.clone();
        let mut slots2 = thread(&mut probe);
        rebind(&mut slots2, 0, 99);
        assert_eq!(slots2[3], Slot::Target(0));
    }
}
