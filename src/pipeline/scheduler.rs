//! The scheduler: the outer per-cycle loop that advances every slot,
//! retires bubbles, invokes the hazard controller and branch resolver in
//! the prescribed order, executes arithmetic at write-back, and decides
//! whether to fetch (§4.8).
//!
//! Grounded directly on the cycle loop in
//! `examples/original_source/p1-1511.c`'s `pipeline()` (lines ~325-520):
//! preliminary advance, bubble retirement, then a single ascending pass
//! over slots performing busy release / hazard check / branch resolution
//! / arithmetic in that order, followed by an end-of-cycle fetch gated on
//! the cycle's stall flag. The teacher crate has no analogous scheduler
//! (its pipeline is a combinational `hcl!` graph stepped once per call),
//! so the surrounding shape — a small driver struct owning state, narrow
//! read accessors for the renderer — follows this crate's own §9 design
//! note rather than a teacher file.

use anyhow::Result;

use crate::isa::{Instruction, Stage};
use crate::program::Program;
use crate::regfile::RegisterFile;

use super::{branch, hazard, HazardAction, IssuedProgram, CYCLE_CAP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingMode {
    Forwarding,
    NoForwarding,
}

impl ForwardingMode {
    fn release_stage(self) -> Stage {
        match self {
            ForwardingMode::Forwarding => Stage::Ex,
            ForwardingMode::NoForwarding => Stage::Wb,
        }
    }
}

/// Cycle-level control signal, used only by the `--verbose` trace
/// channel (§4.10) — never part of the stdout contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleControl {
    Normal,
    Stall,
    Bubble,
}

pub struct CycleTrace {
    pub time: usize,
    pub control: CycleControl,
    pub branch_taken: Option<usize>,
}

pub struct Scheduler<'p> {
    program: &'p Program,
    regs: RegisterFile,
    issued: IssuedProgram,
    next_ins: Option<usize>,
    time: usize,
    forwarding: ForwardingMode,
}

impl<'p> Scheduler<'p> {
    pub fn new(program: &'p Program, forwarding: ForwardingMode) -> Scheduler<'p> {
        let next_ins = if program.is_empty() { None } else { Some(0) };
        Scheduler {
            program,
            regs: RegisterFile::new(),
            issued: IssuedProgram::new(),
            next_ins,
            time: 0,
            forwarding,
        }
    }

    pub fn time(&self) -> usize {
        self.time
    }

    pub fn issued(&self) -> &IssuedProgram {
        &self.issued
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn forwarding(&self) -> ForwardingMode {
        self.forwarding
    }

    /// Whether the simulation has run its course: either the cycle cap
    /// was reached, or the last issued slot has retired.
    pub fn is_finished(&self) -> bool {
        if self.time >= CYCLE_CAP {
            return true;
        }
        match self.issued.len() {
            0 => false,
            n => self.issued.get(n - 1).done,
        }
    }

    /// Advance the simulation by one cycle.
    pub fn step(&mut self) -> Result<CycleTrace> {
        self.time += 1;
        let t = self.time;
        let mut stall = false;
        let mut control = CycleControl::Normal;
        let mut branch_taken = None;

        // Preliminary advance: every not-done slot moves one stage
        // forward, Bubble stays Bubble.
        for i in 0..self.issued.len() {
            if !self.issued.get(i).done {
                let next = self.issued.get(i).stage_at(t - 1).advance();
                self.issued.get_mut(i).set_stage_at(t, next);
            }
        }

        let mut i = 0;
        while i < self.issued.len() {
            // Bubble retirement.
            if self.issued.get(i).stage_at(t - 1) == Stage::Bubble
                && bubble_retirement_due(self.issued.get(i), t)
            {
                self.issued.get_mut(i).set_stage_at(t, Stage::Empty);
                self.issued.get_mut(i).done = true;
            }

            if self.issued.get(i).inst.is_nop() {
                i += 1;
                continue;
            }

            // Busy-flag release, timed by the forwarding mode.
            if self.issued.get(i).stage_at(t - 1) == self.forwarding.release_stage() {
                if let Some(dest) = self.issued.get(i).inst.destination() {
                    self.regs.clear_busy(dest);
                }
            }

            if self.issued.get(i).done {
                i += 1;
                continue;
            }

            if self.issued.get(i).stage_at(t) == Stage::Wb {
                self.issued.get_mut(i).done = true;
            }

            let inst = self.issued.get(i).inst.clone();
            let is_branch = inst.is_branch();
            let hazard_stage = self.issued.get(i).stage_at(t);
            if (hazard_stage == Stage::Ex && !is_branch) || (hazard_stage == Stage::Mem && is_branch)
            {
                match hazard::check(&self.issued, &self.regs, i) {
                    HazardAction::Proceed => {
                        if !is_branch {
                            if let Some(dest) = inst.destination() {
                                self.regs.set_busy(dest);
                            }
                        }
                    }
                    HazardAction::Stall => {
                        freeze_from(&mut self.issued, i, t);
                        control = CycleControl::Stall;
                        stall = true;
                    }
                    HazardAction::InsertBubbles(k) => {
                        self.issued.insert_bubbles(i, k, t);
                        control = CycleControl::Bubble;
                        stall = true;
                    }
                }
            }

            // Control hazard: branch resolution immediately after MEM
            // (i.e. reaching WB this cycle).
            if self.issued.get(i).stage_at(t) == Stage::Wb && is_branch {
                let outcome = branch::resolve(&mut self.issued, &mut self.regs, self.program, i, t)?;
                if outcome.taken {
                    stall = true;
                    branch_taken = Some(i);
                    if let Some(target) = outcome.target {
                        self.issued
                            .fetch(self.program.text(target).to_string(), self.program.instruction(target).clone(), t);
                        self.next_ins = Some(target + 1);
                        if self.next_ins.map(|n| n >= self.program.len()).unwrap_or(false) {
                            self.next_ins = None;
                        }
                    } else {
                        self.next_ins = None;
                    }
                }
            }

            // Arithmetic execution at write-back.
            if self.issued.get(i).stage_at(t) == Stage::Wb && !is_branch {
                execute_arith(&mut self.regs, &inst);
            }

            i += 1;
        }

        if !stall {
            if let Some(next) = self.next_ins {
                self.issued
                    .fetch(self.program.text(next).to_string(), self.program.instruction(next).clone(), t);
                self.next_ins = if next + 1 >= self.program.len() {
                    None
                } else {
                    Some(next + 1)
                };
            }
        }

        if self.issued.len() > super::SLOT_CAP {
            anyhow::bail!(
                "issued slot count exceeded the internal cap of {} (hazard/branch handling diverged)",
                super::SLOT_CAP
            );
        }

        Ok(CycleTrace {
            time: t,
            control,
            branch_taken,
        })
    }
}

fn execute_arith(regs: &mut RegisterFile, inst: &Instruction) {
    if let Instruction::Arith {
        dest, src_a, src_b, ..
    } = inst
    {
        let a = operand_value(regs, src_a);
        let b = operand_value(regs, src_b);
        regs.write(*dest, inst.evaluate(a, b));
    }
}

fn operand_value(regs: &RegisterFile, operand: &crate::isa::Operand) -> i32 {
    match operand {
        crate::isa::Operand::Reg(r) => regs.read(*r),
        crate::isa::Operand::Imm(v) => *v,
    }
}

/// Freeze every slot from `index` onward to its previous cycle's stage,
/// undoing this cycle's preliminary advance (§4.4's plain stall case).
fn freeze_from(issued: &mut IssuedProgram, index: usize, t: usize) {
    for slot in index..issued.len() {
        let frozen = issued.get(slot).stage_at(t - 1);
        issued.get_mut(slot).set_stage_at(t, frozen);
    }
}

/// A slot that was Bubble last cycle retires when its last real stage,
/// walked forward at one stage per cycle, would have reached one cycle
/// past write-back.
fn bubble_retirement_due(slot: &super::Slot, t: usize) -> bool {
    let mut j = t;
    while j > 0 && slot.stage_at(j) == Stage::Bubble {
        j -= 1;
    }
    let s = slot.stage_at(j).ordinal() as usize;
    j + 5 - s == t - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;

    fn regs_after(src: &str, forwarding: ForwardingMode) -> (RegisterFile, usize) {
        let program = Program::parse(src).unwrap();
        let mut sched = Scheduler::new(&program, forwarding);
        while !sched.is_finished() {
            sched.step().unwrap();
        }
        let time = sched.time();
        (sched.regs().clone(), time)
    }

    #[test]
    fn single_instruction_retires_at_cycle_five() {
        let (regs, _) = regs_after("add $t0,$zero,$zero\n", ForwardingMode::Forwarding);
        assert_eq!(regs.read(crate::isa::Reg::T(0)), 0);
    }

    #[test]
    fn dependent_pair_without_forwarding_computes_correct_result() {
        let (regs, _) = regs_after(
            "addi $t0,$zero,5\naddi $t1,$t0,3\n",
            ForwardingMode::NoForwarding,
        );
        assert_eq!(regs.read(crate::isa::Reg::T(1)), 8);
    }

    #[test]
    fn dependent_pair_with_forwarding_computes_correct_result() {
        let (regs, _) = regs_after(
            "addi $t0,$zero,5\naddi $t1,$t0,3\n",
            ForwardingMode::Forwarding,
        );
        assert_eq!(regs.read(crate::isa::Reg::T(1)), 8);
    }

    #[test]
    fn taken_branch_squashes_speculative_fetch() {
        let src = "addi $t0,$zero,1\naddi $t1,$zero,1\nbeq $t0,$t1,skip\naddi $t2,$zero,9\nskip:\naddi $t3,$zero,7\n";
        let (regs, _) = regs_after(src, ForwardingMode::Forwarding);
        assert_eq!(regs.read(crate::isa::Reg::T(2)), 0);
        assert_eq!(regs.read(crate::isa::Reg::T(3)), 7);
    }

    #[test]
    fn not_taken_branch_falls_through() {
        let src = "addi $t0,$zero,1\naddi $t1,$zero,1\nbne $t0,$t1,skip\naddi $t2,$zero,9\nskip:\naddi $t3,$zero,7\n";
        let (regs, _) = regs_after(src, ForwardingMode::Forwarding);
        assert_eq!(regs.read(crate::isa::Reg::T(2)), 9);
        assert_eq!(regs.read(crate::isa::Reg::T(3)), 7);
    }

    #[test]
    fn self_targeting_branch_truncates_at_cycle_cap() {
        let src = "skip:\nbeq $zero,$zero,skip\n";
        let program = Program::parse(src).unwrap();
        let mut sched = Scheduler::new(&program, ForwardingMode::Forwarding);
        let mut cycles = 0;
        while !sched.is_finished() {
            sched.step().unwrap();
            cycles += 1;
        }
        assert_eq!(cycles, CYCLE_CAP);
    }

    #[test]
    fn empty_program_runs_to_cap_with_no_slots() {
        let program = Program::parse("").unwrap();
        let mut sched = Scheduler::new(&program, ForwardingMode::Forwarding);
        let mut cycles = 0;
        while !sched.is_finished() {
            sched.step().unwrap();
            cycles += 1;
        }
        assert_eq!(cycles, CYCLE_CAP);
        assert!(sched.issued().is_empty());
    }
}
