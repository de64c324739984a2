//! The s390x general-purpose register file.

use std::fmt;

/// One of the 16 s390x general-purpose registers.
///
/// Every instruction operand that names a register carries one of these.
/// The numeric value is the register's 4-bit ordinal as it appears in the
/// instruction encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Register {
    /// All 16 registers, in ascending order.
    pub const ALL: [Register; 16] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::R8,
        Register::R9,
        Register::R10,
        Register::R11,
        Register::R12,
        Register::R13,
        Register::R14,
        Register::R15,
    ];

    /// The 4-bit ordinal used to encode this register in an instruction.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Looks up a register by its 4-bit ordinal.
    ///
    /// # Panics
    ///
    /// Panics if `ordinal > 15`. Instruction fields that carry a register
    /// ordinal are always 4 bits wide, so a caller passing a masked nibble
    /// can never trigger this.
    pub const fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            7 => Register::R7,
            8 => Register::R8,
            9 => Register::R9,
            10 => Register::R10,
            11 => Register::R11,
            12 => Register::R12,
            13 => Register::R13,
            14 => Register::R14,
            15 => Register::R15,
            _ => panic!("register ordinal out of range"),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.ordinal())
    }
}

impl From<Register> for u8 {
    fn from(reg: Register) -> Self {
        reg.ordinal()
    }
}
