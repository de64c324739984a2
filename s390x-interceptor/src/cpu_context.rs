//! Layout of the saved register frame the enter/leave thunks build on the
//! stack, and the argument/return-value accessor built on top of it.

/// Bytes the ABI caller-save area at the top of the frame occupies, before
/// the saved program status word mask and the saved register file.
pub const CALLER_SAVE_AREA_LEN: u32 = 160;

/// Bytes occupied by the saved program status word mask (condition code).
pub const PSWM_LEN: u32 = 8;

/// Bytes occupied by the saved 16-register file.
pub const GPRS_LEN: u32 = 128;

/// Total size of the frame the per-hook stub reserves with `LAY R15,
/// -FRAME_LEN(R15)`.
pub const FRAME_LEN: u32 = CALLER_SAVE_AREA_LEN + PSWM_LEN + GPRS_LEN;

/// Offset from the reserved frame's base to the saved program status word
/// mask; this is also the start of what the thunks call `cpu_context`.
pub const PSWM_OFFSET: u32 = CALLER_SAVE_AREA_LEN;

/// Offset from the reserved frame's base to the saved register file.
pub const GPRS_OFFSET: u32 = PSWM_OFFSET + PSWM_LEN;

/// Offset from the reserved frame's base to `gprs[n]`.
pub const fn gpr_offset(n: u32) -> u32 {
    GPRS_OFFSET + n * 8
}

/// The standard s390x argument registers: arguments 0..4 arrive in
/// `R2..R6`; anything past that is spilled to the caller's stack.
const ARG_REGISTERS: usize = 5;

/// A handler's view of a hooked call: the saved register file, plus the
/// caller-reserved stack area where arguments beyond the fifth live.
///
/// `stack` must start at the address the saved `R15` held at function entry
/// (i.e. the frame's `gprs[15]`, not this frame's own base) — the same
/// address the standard ABI has the caller reserve the argument spill area
/// relative to.
pub struct CpuContext<'a> {
    gprs: &'a mut [u64; 16],
    stack: &'a [u8],
}

impl<'a> CpuContext<'a> {
    pub fn new(gprs: &'a mut [u64; 16], stack: &'a [u8]) -> Self {
        CpuContext { gprs, stack }
    }

    /// Reads argument `n` (0-indexed).
    ///
    /// # Panics
    ///
    /// Panics if `n >= 5` and the backing `stack` slice is too short to
    /// contain the spilled slot.
    pub fn arg(&self, n: usize) -> u64 {
        if n < ARG_REGISTERS {
            self.gprs[2 + n]
        } else {
            let offset = 160 + (n - ARG_REGISTERS) * 8;
            let bytes: [u8; 8] = self.stack[offset..offset + 8].try_into().unwrap();
            u64::from_be_bytes(bytes)
        }
    }

    /// Writes argument `n` (0-indexed). Only arguments 0..4 are mutable
    /// through this accessor, since rewriting a spilled stack argument
    /// requires a mutable view of the caller's stack, which callers wanting
    /// that level of control should do directly.
    pub fn set_arg(&mut self, n: usize, value: u64) {
        assert!(n < ARG_REGISTERS, "stack-spilled arguments are read-only here");
        self.gprs[2 + n] = value;
    }

    pub fn return_value(&self) -> u64 {
        self.gprs[2]
    }

    pub fn set_return_value(&mut self, value: u64) {
        self.gprs[2] = value;
    }

    /// The link register (return address) saved at hook entry.
    pub fn link_register(&self) -> u64 {
        self.gprs[14]
    }

    pub fn set_link_register(&mut self, value: u64) {
        self.gprs[14] = value;
    }
}
