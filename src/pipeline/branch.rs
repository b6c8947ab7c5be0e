//! Branch resolver (§4.6): evaluates a branch's predicate at write-back,
//! squashes speculatively fetched successors on a taken branch, restores
//! their busy reservations, and resolves the redirect target.
//!
//! Grounded on `examples/original_source/p1-1511.c`'s branch-handling
//! block inside `pipeline()` (the squash loop over `w_table[j][time]`,
//! the `reset_reg_access` restore call, and the label lookup against
//! `ins->l`/`ins->l_pos`). Two of that block's behaviors are corrected
//! here rather than replicated, per this project's resolved design
//! questions: the restore-busy condition is keyed on the slot's own
//! previous-cycle stage ordinal (not a stray character offset), and a
//! taken branch reports itself so the scheduler can set the cycle's
//! stall flag (the original never does, which would double-fetch).

use anyhow::Result;

use crate::isa::Stage;
use crate::program::Program;
use crate::regfile::RegisterFile;

use super::IssuedProgram;

/// What happened when a branch slot reached its resolution point.
pub struct BranchOutcome {
    pub taken: bool,
    /// Program index to redirect fetch to, present iff `taken`.
    pub target: Option<usize>,
}

/// Resolve the branch at `index`, mutating `program`/`regs` in place for
/// a taken branch (squash + busy restore). Does not perform the
/// redirected fetch itself; the caller appends the new slot once it has
/// the target instruction's text in hand.
pub fn resolve(
    program: &mut IssuedProgram,
    regs: &mut RegisterFile,
    labels: &Program,
    index: usize,
    t: usize,
) -> Result<BranchOutcome> {
    let inst = program.get(index).inst.clone();
    let (cmp_a, cmp_b, label) = match &inst {
        crate::isa::Instruction::Branch {
            cmp_a, cmp_b, label, ..
        } => (*cmp_a, *cmp_b, label.as_str()),
        _ => unreachable!("resolve() is only called on a branch slot"),
    };

    let a = regs.read(cmp_a);
    let b = regs.read(cmp_b);
    if !inst.branch_taken(a, b) {
        return Ok(BranchOutcome {
            taken: false,
            target: None,
        });
    }

    for i in (index + 1)..program.len() {
        let slot = program.get(i);
        let squashed_inst = slot.inst.clone();
        let prev_stage = slot.stage_at(t - 1);
        if !squashed_inst.is_branch() && !squashed_inst.is_nop() && prev_stage.ordinal() >= Stage::Ex.ordinal()
        {
            if let Some(dest) = squashed_inst.destination() {
                regs.clear_busy(dest);
            }
        }
        program.get_mut(i).set_stage_at(t, Stage::Bubble);
    }

    let target = labels.resolve(label)?;
    Ok(BranchOutcome {
        taken: true,
        target: Some(target),
    })
}
