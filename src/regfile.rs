//! Register file: two banks of signed integers plus parallel busy-flag
//! arrays, as described in §4.3.
//!
//! Grounded on `examples/original_source/p1-1511.c`'s `struct registers`
//! (`t[10]`, `s[8]`, plus the `t_access`/`s_access` busy arrays and the
//! `reg_access`/`set_reg_access`/`reset_reg_access` accessors), reshaped
//! into a small owned struct rather than the C file's global instance.

use crate::isa::Reg;

#[derive(Debug, Clone)]
pub struct RegisterFile {
    t: [i32; Reg::T_COUNT],
    s: [i32; Reg::S_COUNT],
    t_busy: [bool; Reg::T_COUNT],
    s_busy: [bool; Reg::S_COUNT],
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile {
            t: [0; Reg::T_COUNT],
            s: [0; Reg::S_COUNT],
            t_busy: [false; Reg::T_COUNT],
            s_busy: [false; Reg::S_COUNT],
        }
    }

    pub fn read(&self, reg: Reg) -> i32 {
        match reg {
            Reg::Zero => 0,
            Reg::T(n) => self.t[n as usize],
            Reg::S(n) => self.s[n as usize],
        }
    }

    pub fn write(&mut self, reg: Reg, value: i32) {
        match reg {
            Reg::Zero => {}
            Reg::T(n) => self.t[n as usize] = value,
            Reg::S(n) => self.s[n as usize] = value,
        }
    }

    pub fn is_busy(&self, reg: Reg) -> bool {
        match reg {
            Reg::Zero => false,
            Reg::T(n) => self.t_busy[n as usize],
            Reg::S(n) => self.s_busy[n as usize],
        }
    }

    pub fn set_busy(&mut self, reg: Reg) {
        match reg {
            Reg::Zero => {}
            Reg::T(n) => self.t_busy[n as usize] = true,
            Reg::S(n) => self.s_busy[n as usize] = true,
        }
    }

    pub fn clear_busy(&mut self, reg: Reg) {
        match reg {
            Reg::Zero => {}
            Reg::T(n) => self.t_busy[n as usize] = false,
            Reg::S(n) => self.s_busy[n as usize] = false,
        }
    }

    /// Iterate `$s0..$s7` then `$t0..$t9`, the order §6.3 dumps them in.
    pub fn dump_order(&self) -> impl Iterator<Item = (Reg, i32)> + '_ {
        (0..Reg::S_COUNT as u8)
            .map(move |n| (Reg::S(n), self.s[n as usize]))
            .chain((0..Reg::T_COUNT as u8).map(move |n| (Reg::T(n), self.t[n as usize])))
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_register_ignores_writes_and_busy() {
        let mut regs = RegisterFile::new();
        regs.write(Reg::Zero, 42);
        regs.set_busy(Reg::Zero);
        assert_eq!(regs.read(Reg::Zero), 0);
        assert!(!regs.is_busy(Reg::Zero));
    }

    #[test]
    fn busy_flag_round_trip() {
        let mut regs = RegisterFile::new();
        assert!(!regs.is_busy(Reg::T(3)));
        regs.set_busy(Reg::T(3));
        assert!(regs.is_busy(Reg::T(3)));
        regs.clear_busy(Reg::T(3));
        assert!(!regs.is_busy(Reg::T(3)));
    }

    #[test]
    fn dump_order_is_s_then_t() {
        let regs = RegisterFile::new();
        let order: Vec<Reg> = regs.dump_order().map(|(r, _)| r).collect();
        assert_eq!(order[0], Reg::S(0));
        assert_eq!(order[7], Reg::S(7));
        assert_eq!(order[8], Reg::T(0));
        assert_eq!(order[17], Reg::T(9));
    }
}
