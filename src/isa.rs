//! Instruction set definition for the simulated MIPS-like subset.

use std::fmt;

/// Register name, split into the two banks the source format supports.
///
/// `$zero` is wired separately rather than as bank member zero: it never
/// carries a busy flag and writes to it are always discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Zero,
    /// `$t0..=$t9`
    T(u8),
    /// `$s0..=$s7`
    S(u8),
}

impl Reg {
    pub const T_COUNT: usize = 10;
    pub const S_COUNT: usize = 8;

    pub fn parse(s: &str) -> Option<Reg> {
        if s == "$zero" {
            return Some(Reg::Zero);
        }
        let mut chars = s.strip_prefix('$')?.chars();
        let bank = chars.next()?;
        let digits: String = chars.collect();
        let n: u8 = digits.parse().ok()?;
        match bank {
            't' if (n as usize) < Reg::T_COUNT => Some(Reg::T(n)),
            's' if (n as usize) < Reg::S_COUNT => Some(Reg::S(n)),
            _ => None,
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Zero => write!(f, "$zero"),
            Reg::T(n) => write!(f, "$t{n}"),
            Reg::S(n) => write!(f, "$s{n}"),
        }
    }
}

/// A source operand: either a register or a decoded signed immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Imm(i32),
}

/// The arithmetic opcodes, kept distinct (rather than collapsed into a
/// shared `Add`-style enum with an "is immediate" flag) so the decoded
/// opcode name round-trips for rendering without re-deriving it from the
/// operand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Addi,
    And,
    Andi,
    Or,
    Ori,
    Slt,
    Slti,
}

impl ArithOp {
    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Addi => "addi",
            ArithOp::And => "and",
            ArithOp::Andi => "andi",
            ArithOp::Or => "or",
            ArithOp::Ori => "ori",
            ArithOp::Slt => "slt",
            ArithOp::Slti => "slti",
        }
    }

    fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            ArithOp::Add | ArithOp::Addi => a.wrapping_add(b),
            ArithOp::And | ArithOp::Andi => a & b,
            ArithOp::Or | ArithOp::Ori => a | b,
            ArithOp::Slt | ArithOp::Slti => (a < b) as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOp {
    Beq,
    Bne,
}

impl BranchOp {
    pub fn name(self) -> &'static str {
        match self {
            BranchOp::Beq => "beq",
            BranchOp::Bne => "bne",
        }
    }

    fn taken(self, a: i32, b: i32) -> bool {
        match self {
            BranchOp::Beq => a == b,
            BranchOp::Bne => a != b,
        }
    }
}

/// A decoded instruction. The original line text is kept alongside in
/// [`crate::program::Program`] / [`crate::pipeline::Slot`] rather than
/// here, since injected bubbles need the literal text `"nop"` without a
/// detour through the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Arith {
        op: ArithOp,
        dest: Reg,
        src_a: Operand,
        src_b: Operand,
    },
    Branch {
        op: BranchOp,
        /// compared register #1 (occupies the "destination" field)
        cmp_a: Reg,
        /// compared register #2
        cmp_b: Reg,
        label: String,
    },
    Nop,
}

impl Instruction {
    pub fn is_branch(&self) -> bool {
        matches!(self, Instruction::Branch { .. })
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, Instruction::Nop)
    }

    /// Destination register of a non-branch, non-nop instruction; `None`
    /// for branches and `nop` (they never reserve a register).
    pub fn destination(&self) -> Option<Reg> {
        match self {
            Instruction::Arith { dest, .. } => Some(*dest),
            _ => None,
        }
    }

    /// Operand registers to check for busy producers, in priority order
    /// (see §4.4: "checked in that order").
    pub fn hazard_operands(&self) -> Vec<Reg> {
        let regs: Vec<Option<Reg>> = match self {
            Instruction::Arith { src_a, src_b, .. } => {
                vec![operand_reg(src_a), operand_reg(src_b)]
            }
            Instruction::Branch { cmp_a, cmp_b, .. } => vec![Some(*cmp_a), Some(*cmp_b)],
            Instruction::Nop => vec![],
        };
        regs.into_iter()
            .flatten()
            .filter(|r| !matches!(r, Reg::Zero))
            .collect()
    }

    /// Evaluate an arithmetic instruction's result given its resolved
    /// operand values. Panics if called on a branch or `nop`.
    pub fn evaluate(&self, a: i32, b: i32) -> i32 {
        match self {
            Instruction::Arith { op, .. } => op.apply(a, b),
            _ => unreachable!("evaluate() is only defined for arithmetic instructions"),
        }
    }

    /// Evaluate a branch's taken/not-taken predicate.
    pub fn branch_taken(&self, a: i32, b: i32) -> bool {
        match self {
            Instruction::Branch { op, .. } => op.taken(a, b),
            _ => unreachable!("branch_taken() is only defined for branches"),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Instruction::Branch { label, .. } => Some(label),
            _ => None,
        }
    }
}

fn operand_reg(op: &Operand) -> Option<Reg> {
    match op {
        Operand::Reg(r) => Some(*r),
        Operand::Imm(_) => None,
    }
}

/// Stage a pipeline slot can occupy in a given cycle.
///
/// Ordinals are load-bearing: per-cycle advancement is "ordinal + 1" from
/// `IF` through `WB`, and render symbols are selected by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Empty = 0,
    If = 1,
    Id = 2,
    Ex = 3,
    Mem = 4,
    Wb = 5,
    Bubble = 6,
}

impl Stage {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Normal per-cycle advancement: `Bubble` is sticky, everything else
    /// moves one stage forward. Advancing past `Wb` does not happen in
    /// practice because a slot that reaches `Wb` is marked `done` before
    /// it is ever preliminarily advanced again.
    pub fn advance(self) -> Stage {
        match self {
            Stage::Bubble => Stage::Bubble,
            other => Stage::from_ordinal(other.ordinal() + 1),
        }
    }

    pub fn from_ordinal(ord: u8) -> Stage {
        match ord {
            0 => Stage::Empty,
            1 => Stage::If,
            2 => Stage::Id,
            3 => Stage::Ex,
            4 => Stage::Mem,
            5 => Stage::Wb,
            _ => Stage::Bubble,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Stage::Empty => ".",
            Stage::If => "IF",
            Stage::Id => "ID",
            Stage::Ex => "EX",
            Stage::Mem => "MEM",
            Stage::Wb => "WB",
            Stage::Bubble => "*",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_parse_roundtrip() {
        assert_eq!(Reg::parse("$zero"), Some(Reg::Zero));
        assert_eq!(Reg::parse("$t0"), Some(Reg::T(0)));
        assert_eq!(Reg::parse("$t9"), Some(Reg::T(9)));
        assert_eq!(Reg::parse("$s7"), Some(Reg::S(7)));
        assert_eq!(Reg::parse("$t10"), None);
        assert_eq!(Reg::parse("$s8"), None);
        assert_eq!(Reg::parse("$x0"), None);
        assert_eq!(format!("{}", Reg::T(3)), "$t3");
    }

    #[test]
    fn stage_advance_and_symbol() {
        assert_eq!(Stage::If.advance(), Stage::Id);
        assert_eq!(Stage::Wb.advance(), Stage::Bubble);
        assert_eq!(Stage::Bubble.advance(), Stage::Bubble);
        assert_eq!(Stage::Mem.symbol(), "MEM");
    }

    #[test]
    fn hazard_operands_filter_zero_and_immediates() {
        let inst = Instruction::Arith {
            op: ArithOp::Add,
            dest: Reg::T(0),
            src_a: Operand::Reg(Reg::Zero),
            src_b: Operand::Imm(5),
        };
        assert!(inst.hazard_operands().is_empty());

        let inst = Instruction::Branch {
            op: BranchOp::Beq,
            cmp_a: Reg::T(1),
            cmp_b: Reg::Zero,
            label: "l".into(),
        };
        assert_eq!(inst.hazard_operands(), vec![Reg::T(1)]);
    }
}
