//! Instruction-line decoder.
//!
//! Grounded on the teacher crate's `asm` module: a `pest` grammar
//! (`src/grammar.pest`) plus a thin conversion layer from parse tree to
//! the domain enum, in the same shape as the teacher's
//! `Y86AsmParser` + `impl From<pest::iterators::Pair<'_, Rule>> for ...`.
//! Unlike the teacher's grammar, this one defines no implicit whitespace
//! rule: §4.1 requires exactly one space after the opcode and nothing
//! else, so pest-level whitespace skipping would silently accept input
//! the spec rejects.

use anyhow::{bail, Context, Result};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::isa::{ArithOp, BranchOp, Instruction, Operand, Reg};

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct LineParser;

/// Outcome of decoding one non-blank source line.
pub enum DecodedLine {
    Label(String),
    Instruction(Instruction),
}

/// Decode a single line (already stripped of its line ending). The
/// decoder is pure: it holds no state across calls.
pub fn decode_line(text: &str) -> Result<DecodedLine> {
    let mut pairs = LineParser::parse(Rule::line, text)
        .with_context(|| format!("malformed instruction line: `{text}`"))?;
    let line = pairs.next().expect("line rule always produces one pair");
    let inner = line
        .into_inner()
        .next()
        .expect("line always wraps one alternative");

    match inner.as_rule() {
        Rule::label_line => {
            let name = inner.into_inner().next().unwrap().as_str().to_string();
            Ok(DecodedLine::Label(name))
        }
        Rule::nop_line => Ok(DecodedLine::Instruction(Instruction::Nop)),
        Rule::instruction_line => decode_instruction(inner).map(DecodedLine::Instruction),
        rule => unreachable!("unexpected line alternative: {rule:?}"),
    }
}

fn decode_instruction(pair: Pair<'_, Rule>) -> Result<Instruction> {
    let text = pair.as_str().to_string();
    let mut it = pair.into_inner();
    let opcode = it.next().unwrap().as_str();
    let dest = it.next().unwrap();
    let src_a = it.next().unwrap();
    let src_b = it.next().unwrap();

    if let Some(op) = branch_op(opcode) {
        let cmp_a = operand_as_reg(&dest, &text)?;
        let cmp_b = operand_as_reg(&src_a, &text)?;
        let label = operand_as_label(&src_b, &text)?;
        return Ok(Instruction::Branch {
            op,
            cmp_a,
            cmp_b,
            label,
        });
    }

    let op = arith_op(opcode).with_context(|| format!("unknown opcode `{opcode}` in `{text}`"))?;
    let dest = operand_as_reg(&dest, &text)?;
    let src_a = decode_operand(&src_a, &text)?;
    let src_b = decode_operand(&src_b, &text)?;
    Ok(Instruction::Arith {
        op,
        dest,
        src_a,
        src_b,
    })
}

fn arith_op(opcode: &str) -> Option<ArithOp> {
    Some(match opcode {
        "add" => ArithOp::Add,
        "addi" => ArithOp::Addi,
        "and" => ArithOp::And,
        "andi" => ArithOp::Andi,
        "or" => ArithOp::Or,
        "ori" => ArithOp::Ori,
        "slt" => ArithOp::Slt,
        "slti" => ArithOp::Slti,
        _ => return None,
    })
}

fn branch_op(opcode: &str) -> Option<BranchOp> {
    Some(match opcode {
        "beq" => BranchOp::Beq,
        "bne" => BranchOp::Bne,
        _ => return None,
    })
}

fn decode_operand(pair: &Pair<'_, Rule>, text: &str) -> Result<Operand> {
    let inner = pair.clone().into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::reg => Ok(Operand::Reg(
            Reg::parse(inner.as_str())
                .with_context(|| format!("register out of range in `{text}`"))?,
        )),
        Rule::imm => {
            let v: i32 = inner
                .as_str()
                .parse()
                .with_context(|| format!("immediate out of range in `{text}`"))?;
            Ok(Operand::Imm(v))
        }
        Rule::label_name => bail!("label `{}` used where a value was expected in `{text}`", inner.as_str()),
        rule => unreachable!("unexpected operand alternative: {rule:?}"),
    }
}

fn operand_as_reg(pair: &Pair<'_, Rule>, text: &str) -> Result<Reg> {
    let inner = pair.clone().into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::reg => Reg::parse(inner.as_str())
            .with_context(|| format!("register out of range in `{text}`")),
        _ => bail!("expected a register operand in `{text}`"),
    }
}

fn operand_as_label(pair: &Pair<'_, Rule>, text: &str) -> Result<String> {
    let inner = pair.clone().into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::label_name => Ok(inner.as_str().to_string()),
        _ => bail!("expected a label operand in `{text}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_arith_with_registers_and_immediate() {
        let DecodedLine::Instruction(inst) = decode_line("addi $t0,$zero,5").unwrap() else {
            panic!("expected instruction")
        };
        assert_eq!(
            inst,
            Instruction::Arith {
                op: ArithOp::Addi,
                dest: Reg::T(0),
                src_a: Operand::Reg(Reg::Zero),
                src_b: Operand::Imm(5),
            }
        );
    }

    #[test]
    fn decode_branch() {
        let DecodedLine::Instruction(inst) = decode_line("beq $t0,$t1,skip").unwrap() else {
            panic!("expected instruction")
        };
        assert_eq!(
            inst,
            Instruction::Branch {
                op: BranchOp::Beq,
                cmp_a: Reg::T(0),
                cmp_b: Reg::T(1),
                label: "skip".into(),
            }
        );
    }

    #[test]
    fn decode_nop() {
        let DecodedLine::Instruction(inst) = decode_line("nop").unwrap() else {
            panic!("expected instruction")
        };
        assert_eq!(inst, Instruction::Nop);
    }

    #[test]
    fn decode_label() {
        let DecodedLine::Label(name) = decode_line("skip:").unwrap() else {
            panic!("expected label")
        };
        assert_eq!(name, "skip");
    }

    #[test]
    fn rejects_extra_whitespace() {
        assert!(decode_line("add  $t0,$zero,$zero").is_err());
        assert!(decode_line("add $t0, $zero,$zero").is_err());
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert!(decode_line("mul $t0,$zero,$zero").is_err());
    }

    #[test]
    fn rejects_immediate_out_of_place_for_branch_operand() {
        assert!(decode_line("beq $t0,5,skip").is_err());
    }
}
