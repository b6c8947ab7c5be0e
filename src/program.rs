//! Program loader: partitions source lines into a label map and a
//! label-free instruction sequence.
//!
//! Grounded on `examples/original_source/p1-1511.c`'s `label_preprocess` /
//! `ins_parse` pair (the original scans the file once, recording a label's
//! binding as the current instruction count before decoding continues),
//! and on the teacher crate's `src/parse/mod.rs` line-oriented driver for
//! the surrounding `anyhow::Context` idiom.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use crate::decode::{decode_line, DecodedLine};
use crate::isa::Instruction;

/// Source lines are bounded to keep the issued-program table a fixed,
/// small size (§6.2).
pub const MAX_INSTRUCTIONS: usize = 10;

/// A loaded program: a label-free instruction sequence plus the label
/// bindings resolved against it. Each instruction keeps its verbatim
/// source text alongside the decoded form, since §3 requires the
/// pipeline table to render the instruction exactly as written.
pub struct Program {
    instructions: Vec<Instruction>,
    texts: Vec<String>,
    labels: HashMap<String, usize>,
}

impl Program {
    /// Parse the full source text of an instruction file.
    pub fn parse(source: &str) -> Result<Program> {
        let mut instructions = Vec::new();
        let mut texts = Vec::new();
        let mut labels: HashMap<String, usize> = HashMap::new();

        for (line_no, raw) in source.lines().enumerate() {
            let line_no = line_no + 1;
            if raw.is_empty() {
                continue;
            }
            match decode_line(raw).with_context(|| format!("line {line_no}"))? {
                DecodedLine::Label(name) => {
                    if labels.insert(name.clone(), instructions.len()).is_some() {
                        bail!("duplicate label `{name}` at line {line_no}");
                    }
                }
                DecodedLine::Instruction(inst) => {
                    if instructions.len() >= MAX_INSTRUCTIONS {
                        bail!(
                            "program exceeds the {MAX_INSTRUCTIONS}-instruction limit at line {line_no}"
                        );
                    }
                    instructions.push(inst);
                    texts.push(raw.to_string());
                }
            }
        }

        for inst in &instructions {
            if let Some(label) = inst.label() {
                if !labels.contains_key(label) {
                    bail!("branch targets undefined label `{label}`");
                }
            }
        }

        Ok(Program {
            instructions,
            texts,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }

    pub fn text(&self, index: usize) -> &str {
        &self.texts[index]
    }

    /// Resolve a label to its bound instruction index. Presence was
    /// already checked at parse time for every label a branch in this
    /// program refers to, so a lookup here never fails in practice; the
    /// scheduler still treats a miss as an `UnresolvedLabel` error rather
    /// than panicking, in case a future caller constructs labels by hand.
    pub fn resolve(&self, label: &str) -> Result<usize> {
        self.labels
            .get(label)
            .copied()
            .with_context(|| format!("branch targets undefined label `{label}`"))
    }
}
