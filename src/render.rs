//! Renderer: formats the pipeline table and register dump after each
//! cycle, per §6.3. Every width and separator length here is load-
//! bearing — this is the graded stdout contract.
//!
//! Grounded on `examples/original_source/p1-1511.c`'s `print_table` /
//! `print_reg` (column widths `%-4d`/`%-4s`/`%-20s`, the 82-dash
//! separator, and the four-per-row register wrapping), translated from
//! `printf` format strings into Rust's `write!`/format-spec equivalents.

use std::io::Write;

use crate::pipeline::{CycleControl, Scheduler, CYCLE_CAP};
use crate::regfile::RegisterFile;

const SEPARATOR_WIDTH: usize = 82;
const TEXT_COLUMN_WIDTH: usize = 20;
const STAGE_COLUMN_WIDTH: usize = 4;
const REG_COLUMN_WIDTH: usize = 20;
const REGS_PER_ROW: usize = 4;

pub struct Renderer;

impl Renderer {
    pub fn new() -> Renderer {
        Renderer
    }

    pub fn start_banner(&self, out: &mut impl Write, forwarding_enabled: bool) -> std::io::Result<()> {
        if forwarding_enabled {
            writeln!(out, "START OF SIMULATION (forwarding)")
        } else {
            writeln!(out, "START OF SIMULATION (no forwarding)")
        }
    }

    pub fn end_banner(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "END OF SIMULATION")
    }

    /// Emit one cycle's block: separator, header row, per-slot rows,
    /// blank line, register dump.
    pub fn render_cycle(&self, out: &mut impl Write, scheduler: &Scheduler) -> std::io::Result<()> {
        writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        self.render_header(out)?;
        for (text, stages) in scheduler.issued().stage_table() {
            self.render_row(out, text, &stages[1..=CYCLE_CAP])?;
        }
        writeln!(out)?;
        self.render_registers(out, scheduler.regs())?;
        Ok(())
    }

    fn render_header(&self, out: &mut impl Write) -> std::io::Result<()> {
        write!(out, "CPU Cycles ===>     ")?;
        for cycle in 1..=CYCLE_CAP {
            if cycle == CYCLE_CAP {
                write!(out, "{cycle}")?;
            } else {
                write!(out, "{cycle:<width$}", width = STAGE_COLUMN_WIDTH)?;
            }
        }
        writeln!(out)
    }

    fn render_row(
        &self,
        out: &mut impl Write,
        text: &str,
        stages: &[crate::isa::Stage],
    ) -> std::io::Result<()> {
        write!(out, "{text:<width$}", width = TEXT_COLUMN_WIDTH)?;
        for (idx, stage) in stages.iter().enumerate() {
            if idx + 1 == CYCLE_CAP {
                write!(out, "{}", stage.symbol())?;
            } else {
                write!(out, "{:<width$}", stage.symbol(), width = STAGE_COLUMN_WIDTH)?;
            }
        }
        writeln!(out)
    }

    fn render_registers(&self, out: &mut impl Write, regs: &RegisterFile) -> std::io::Result<()> {
        for (i, (reg, value)) in regs.dump_order().enumerate() {
            let field = format!("{reg} = {value}");
            if (i + 1) % REGS_PER_ROW == 0 {
                writeln!(out, "{field}")?;
            } else {
                write!(out, "{field:<width$}", width = REG_COLUMN_WIDTH)?;
            }
        }
        // 18 registers, 4 per row: the last row (2 entries) never hits
        // the terminating branch above, so force its newline here.
        if regs.dump_order().count() % REGS_PER_ROW != 0 {
            writeln!(out)?;
        }
        Ok(())
    }

    /// Print one colorized trace line for `--verbose` (§4.10); stderr
    /// only, never part of the stdout contract above.
    pub fn render_trace(&self, out: &mut impl Write, trace: &crate::pipeline::CycleTrace) -> std::io::Result<()> {
        use ansi_term::Colour::{Green, Red};
        let label = match trace.control {
            CycleControl::Normal => Green.paint("normal"),
            CycleControl::Stall => Red.bold().paint("stall "),
            CycleControl::Bubble => Red.bold().paint("bubble"),
        };
        write!(out, "cycle {:>2}  {label}", trace.time)?;
        if let Some(slot) = trace.branch_taken {
            write!(out, "  {}", Red.paint(format!("branch taken @ slot {slot}")))?;
        }
        writeln!(out)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
