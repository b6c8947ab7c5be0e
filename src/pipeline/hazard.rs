//! Hazard controller (§4.4): decides whether a slot entering its
//! hazard-check stage may proceed, must stall, or forces bubble
//! insertion, based on the register file's busy flags.
//!
//! Grounded on `examples/original_source/p1-1511.c`'s `check_reg_access`
//! plus the inline priority logic in `pipeline()` around the `w_table[i]`
//! hazard-check branch — reshaped here into the priority rule spelled out
//! explicitly by this crate's own design notes rather than the original's
//! loop-continuation quirk (see the project's resolved design questions).

use crate::isa::{Instruction, Reg};
use crate::regfile::RegisterFile;

use super::IssuedProgram;

/// What the hazard controller decided for the current slot this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardAction {
    Proceed,
    Stall,
    InsertBubbles(usize),
}

fn producer(slot: &Instruction) -> Option<Reg> {
    match slot {
        Instruction::Arith { dest, .. } => Some(*dest),
        _ => None,
    }
}

/// Decide the action for the slot at `index`, given the register file's
/// current busy flags. Only the *first* busy operand (in the priority
/// order the instruction defines) matters; once one is found, its
/// relationship to the two preceding slots determines the outcome.
pub fn check(program: &IssuedProgram, regs: &RegisterFile, index: usize) -> HazardAction {
    let inst = &program.get(index).inst;
    let operands = inst.hazard_operands();

    let Some(operand) = operands.into_iter().find(|r| regs.is_busy(*r)) else {
        return HazardAction::Proceed;
    };

    let prev1 = index.checked_sub(1).map(|i| program.get(i));
    let prev2 = index.checked_sub(2).map(|i| program.get(i));

    if let Some(p1) = prev1 {
        if producer(&p1.inst) == Some(operand) {
            return HazardAction::InsertBubbles(2);
        }
    }
    if let (Some(p2), Some(p1)) = (prev2, prev1) {
        if !p1.inst.is_branch() && producer(&p2.inst) == Some(operand) {
            return HazardAction::InsertBubbles(1);
        }
    }
    HazardAction::Stall
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{ArithOp, Operand};

    fn arith(dest: Reg, a: Operand, b: Operand) -> Instruction {
        Instruction::Arith {
            op: ArithOp::Add,
            dest,
            src_a: a,
            src_b: b,
        }
    }

    #[test]
    fn proceeds_when_operand_not_busy() {
        let mut program = IssuedProgram::new();
        program.fetch(
            "add $t0,$zero,$zero".into(),
            arith(Reg::T(0), Operand::Reg(Reg::Zero), Operand::Reg(Reg::Zero)),
            1,
        );
        let regs = RegisterFile::new();
        assert_eq!(check(&program, &regs, 0), HazardAction::Proceed);
    }

    #[test]
    fn immediate_predecessor_producer_forces_two_bubbles() {
        let mut program = IssuedProgram::new();
        program.fetch(
            "addi $t0,$zero,1".into(),
            arith(Reg::T(0), Operand::Reg(Reg::Zero), Operand::Imm(1)),
            1,
        );
        program.fetch(
            "add $t1,$t0,$zero".into(),
            arith(Reg::T(1), Operand::Reg(Reg::T(0)), Operand::Reg(Reg::Zero)),
            1,
        );
        let mut regs = RegisterFile::new();
        regs.set_busy(Reg::T(0));
        assert_eq!(
            check(&program, &regs, 1),
            HazardAction::InsertBubbles(2)
        );
    }

    #[test]
    fn second_predecessor_producer_forces_one_bubble_unless_prev1_is_branch() {
        let mut program = IssuedProgram::new();
        program.fetch(
            "addi $t0,$zero,1".into(),
            arith(Reg::T(0), Operand::Reg(Reg::Zero), Operand::Imm(1)),
            1,
        );
        program.fetch("nop".into(), Instruction::Nop, 2);
        program.fetch(
            "add $t1,$t0,$zero".into(),
            arith(Reg::T(1), Operand::Reg(Reg::T(0)), Operand::Reg(Reg::Zero)),
            3,
        );
        let mut regs = RegisterFile::new();
        regs.set_busy(Reg::T(0));
        assert_eq!(check(&program, &regs, 2), HazardAction::InsertBubbles(1));
    }

    #[test]
    fn busy_with_no_identifiable_producer_stalls() {
        let mut program = IssuedProgram::new();
        program.fetch(
            "add $t1,$t0,$zero".into(),
            arith(Reg::T(1), Operand::Reg(Reg::T(0)), Operand::Reg(Reg::Zero)),
            1,
        );
        let mut regs = RegisterFile::new();
        regs.set_busy(Reg::T(0));
        assert_eq!(check(&program, &regs, 0), HazardAction::Stall);
    }
}
