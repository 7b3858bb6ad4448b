//! Opcode set of the Rill abstract machine
//!
//! The machine is stack-less: two integer registers, an instruction pointer
//! into the threaded slot array, and a word heap holding every variable cell
//! and array buffer.
//!
//! Opcode families are specialised by operand mode. In a variant suffix,
//! `V` means a plain variable cell and `A` an indexed array access; for the
//! three-operand arithmetic ops the suffix reads target-first (`AddVva` is
//! `var = var + arr[var]`). Symmetric operations (`+`, `==`, `!=`) are
//! normalised during code generation so that a single array operand sits in
//! the `y` position, which is why their families have no `Av` form, while
//! the inequalities (which cannot be reordered) carry all four.

/// One opcode of the abstract machine.
///
/// Comparison opcodes are fused compare-and-branch: the predicate holding
/// means fall through, the predicate failing means jump to the resolved
/// target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// print reg1 followed by a space
    Write,
    /// print reg1 followed by a newline
    Writeln,
    /// reg1 = next integer on the input stream
    Read,
    /// reg1 = cell
    Load1V,
    /// reg1 = arr[cell]
    Load1A,
    /// reg2 = cell
    Load2V,
    /// reg2 = arr[cell]
    Load2A,
    /// cell = reg1
    StoreV,
    /// arr[cell] = reg1
    StoreA,
    /// cell = cell, no registers touched
    AssignVv,
    /// cell = arr[cell]
    AssignVa,
    /// arr[cell] = cell
    AssignAv,
    /// arr[cell] = arr[cell]
    AssignAa,
    /// cell += 1
    IncV,
    /// arr[cell] += 1
    IncA,
    /// cell -= 1
    DecV,
    /// arr[cell] -= 1
    DecA,
    /// unconditional jump to the resolved target slot
    Jump,
    /// reg1 = next pseudo-random value
    Rand,
    /// reallocate the array operand with the size in reg1, rebinding the
    /// whole threaded stream to the new base
    New,
    /// as `New`, but the replacement is the 0-length sentinel buffer
    Free,
    /// reg1 = logical length of the array operand
    Size,
    /// end of execution
    Halt,
    // target = x + y, suffix is <target><x><y>
    AddVvv,
    AddVva,
    AddVaa,
    AddAvv,
    AddAva,
    AddAaa,
    // target = x - y
    SubVvv,
    SubVva,
    SubVaa,
    SubAvv,
    SubAva,
    SubAaa,
    /// reg1 = reg1 * reg2
    Mul,
    /// reg1 = reg1 / reg2 (host integer division, trunc toward zero)
    Div,
    /// reg1 = reg1 % reg2
    Mod,
    // branch unless x == y
    EqVv,
    EqVa,
    EqAa,
    // branch unless x != y
    NeqVv,
    NeqVa,
    NeqAa,
    // branch unless x <= y
    LeVv,
    LeVa,
    LeAv,
    LeAa,
    // branch unless x < y
    LtVv,
    LtVa,
    LtAv,
    LtAa,
}

impl Opcode {
    /// Whether the instruction carries a jump offset, and therefore owns a
    /// target slot in the threaded stream. True for `Jump` and the whole
    /// compare-and-branch family.
    pub fn is_branch(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Jump | EqVv
                | EqVa
                | EqAa
                | NeqVv
                | NeqVa
                | NeqAa
                | LeVv
                | LeVa
                | LeAv
                | LeAa
                | LtVv
                | LtVa
                | LtAv
                | LtAa
        )
    }

    /// Number of operand slots the instruction occupies. An `A` operand
    /// contributes two (index cell, then array base), a `V` operand one.
    pub fn arg_count(self) -> usize {
        use Opcode::*;
        match self {
            Write | Writeln | Read | Jump | Rand | Halt | Mul | Div | Mod => 0,
            Load1V | Load2V | StoreV | IncV | DecV | New | Free | Size => 1,
            Load1A | Load2A | StoreA | IncA | DecA => 2,
            AssignVv => 2,
            AssignVa | AssignAv => 3,
            AssignAa => 4,
            AddVvv | SubVvv => 3,
            AddVva | AddAvv | SubVva | SubAvv => 4,
            AddVaa | AddAva | SubVaa | SubAva => 5,
            AddAaa | SubAaa => 6,
            EqVv | NeqVv | LeVv | LtVv => 2,
            EqVa | NeqVa | LeVa | LeAv | LtVa | LtAv => 3,
            EqAa | NeqAa | LeAa | LtAa => 4,
        }
    }

    /// Name used by the verbose bytecode dump.
    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Write => "WRITE",
            Writeln => "WRITELN",
            Read => "READ",
            Load1V => "LOAD1_V",
            Load1A => "LOAD1_A",
            Load2V => "LOAD2_V",
            Load2A => "LOAD2_A",
            StoreV => "STORE_V",
            StoreA => "STORE_A",
            AssignVv => "ASSIGN_VV",
            AssignVa => "ASSIGN_VA",
            AssignAv => "ASSIGN_AV",
            AssignAa => "ASSIGN_AA",
            IncV => "INC_V",
            IncA => "INC_A",
            DecV => "DEC_V",
            DecA => "DEC_A",
            Jump => "JUMP",
            Rand => "RAND",
            New => "NEW",
            Free => "FREE",
            Size => "SIZE",
            Halt => "HALT",
            AddVvv => "ADD_VVV",
            AddVva => "ADD_VVA",
            AddVaa => "ADD_VAA",
            AddAvv => "ADD_AVV",
            AddAva => "ADD_AVA",
            AddAaa => "ADD_AAA",
            SubVvv => "SUB_VVV",
            SubVva => "SUB_VVA",
            SubVaa => "SUB_VAA",
            SubAvv => "SUB_AVV",
            SubAva => "SUB_AVA",
            SubAaa => "SUB_AAA",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            EqVv => "EQ_VV",
            EqVa => "EQ_VA",
            EqAa => "EQ_AA",
            NeqVv => "NEQ_VV",
            NeqVa => "NEQ_VA",
            NeqAa => "NEQ_AA",
            LeVv => "LE_VV",
            LeVa => "LE_VA",
            LeAv => "LE_AV",
            LeAa => "LE_AA",
            LtVv => "LT_VV",
            LtVa => "LT_VA",
            LtAv => "LT_AV",
            LtAa => "LT_AA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_classification() {
        assert!(Opcode::Jump.is_branch());
        assert!(Opcode::EqVv.is_branch());
        assert!(Opcode::LtAa.is_branch());
        assert!(!Opcode::AddVvv.is_branch());
        assert!(!Opcode::Halt.is_branch());
        assert!(!Opcode::StoreA.is_branch());
    }

    #[test]
    fn test_operand_counts() {
        // one slot per V operand, two per A operand
        assert_eq!(Opcode::Load1V.arg_count(), 1);
        assert_eq!(Opcode::Load1A.arg_count(), 2);
        assert_eq!(Opcode::AssignAa.arg_count(), 4);
        assert_eq!(Opcode::AddVvv.arg_count(), 3);
        assert_eq!(Opcode::AddAaa.arg_count(), 6);
        assert_eq!(Opcode::LeAv.arg_count(), 3);
        assert_eq!(Opcode::Mul.arg_count(), 0);
        assert_eq!(Opcode::New.arg_count(), 1);
    }

    #[test]
    fn test_dump_names_fit_field() {
        // the dump left-aligns names in a 12-character field
        let all = [
            Opcode::Write,
            Opcode::AssignVv,
            Opcode::AddAaa,
            Opcode::NeqVa,
            Opcode::Writeln,
        ];
        for op in all {
            assert!(op.name().len() <= 12, "{} too wide", op.name());
        }
    }
}
