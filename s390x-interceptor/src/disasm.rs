//! The pluggable boundary between the relocator and whatever disassembly
//! facility the embedding framework already has.
//!
//! The core never parses instruction semantics itself beyond the one bit it
//! needs (which of a handful of shapes is this, and how long is it). A real
//! embedding is expected to back [`Disassembler`] with its own, much more
//! complete, decoder.

/// The small, closed set of instruction shapes the relocator knows how to
/// relocate. Anything else is reported to the relocator as a decode failure,
/// even if a fuller disassembler could technically classify it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsnId {
    /// `STMG` — copy-safe verbatim.
    Stmg,
    /// `LGR` — copy-safe verbatim.
    Lgr,
    /// `LHI` — copy-safe verbatim.
    Lhi,
    /// `LGRL` — pc-relative load, rewritten against the relocated address.
    Lgrl,
    /// `CGIJE` — compare-and-branch, rewritten into an inverted short branch
    /// followed by an unconditional long branch to the original target.
    Cgije,
}

/// One instruction as disassembled from a byte window, opaque to its caller
/// beyond the handful of fields the relocator needs.
///
/// `bytes` always holds exactly 6 valid leading bytes regardless of `len`;
/// the relocator only reads `bytes[..len]` for verbatim copies; the id-
/// specific rewrite rules in `relocator` know which trailing bytes are
/// meaningful for their shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedInsn {
    pub address: u64,
    pub len: u8,
    pub id: InsnId,
    pub bytes: [u8; 6],
}

/// Decodes one instruction at a time from a byte window.
///
/// Implementations are handed the bytes starting at `address` and must
/// either recognize the instruction at offset 0 and return it, or return
/// `None` — for both "this opcode isn't in the recognized set" and "there
/// aren't enough bytes left to tell". The relocator treats both the same
/// way: it stops reading.
pub trait Disassembler {
    fn decode(&mut self, code: &[u8], address: u64) -> Option<DecodedInsn>;
}

/// A disassembler that recognizes only the fixed byte patterns used in this
/// crate's own test fixtures.
///
/// Real opcode layouts for `STMG`/`LGR`/`LHI`/`LGRL` follow z/Architecture;
/// `CGIJE`'s fields here are the crate's own scheme (a 1-byte condition mask
/// and a 16-bit pc-relative displacement packed into the trailing bytes of a
/// 6-byte instruction) since its full real-ISA encoding carries fields the
/// relocator never needs to touch.
#[derive(Debug, Default)]
pub struct StubDisassembler;

impl Disassembler for StubDisassembler {
    fn decode(&mut self, code: &[u8], address: u64) -> Option<DecodedInsn> {
        let op0 = *code.first()?;
        let (len, id) = match op0 {
            0xEB if code.get(5) == Some(&0x24) => (6, InsnId::Stmg),
            0xB9 if code.get(1) == Some(&0x04) => (4, InsnId::Lgr),
            0xA7 if code.get(1).map(|b| b & 0xF) == Some(0x8) => (4, InsnId::Lhi),
            0xC4 if code.get(1).map(|b| b & 0xF) == Some(0x8) => (6, InsnId::Lgrl),
            0xC2 => (6, InsnId::Cgije),
            _ => return None,
        };
        if code.len() < len {
            return None;
        }
        let mut bytes = [0u8; 6];
        bytes[..len].copy_from_slice(&code[..len]);
        Some(DecodedInsn {
            address,
            len: len as u8,
            id,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_stmg() {
        let code = [0xEBu8, 0xCF, 0xF0, 0x30, 0x00, 0x24];
        let insn = StubDisassembler.decode(&code, 0x1000_0000).unwrap();
        assert_eq!(insn.id, InsnId::Stmg);
        assert_eq!(insn.len, 6);
    }

    #[test]
    fn recognizes_cgije() {
        let code = [0xC2u8, 0x18, 0x00, 0x00, 0x00, 0x40];
        let insn = StubDisassembler.decode(&code, 0x1000_0000).unwrap();
        assert_eq!(insn.id, InsnId::Cgije);
    }

    #[test]
    fn rejects_unrecognized_opcode() {
        let code = [0xFFu8; 6];
        assert!(StubDisassembler.decode(&code, 0x1000_0000).is_none());
    }

    #[test]
    fn rejects_truncated_window() {
        let code = [0xEBu8, 0xCF, 0xF0];
        assert!(StubDisassembler.decode(&code, 0x1000_0000).is_none());
    }
}
