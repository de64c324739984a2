//! Builds and activates the per-function trampoline: the code a hooked
//! function is redirected into, and the machinery that gets it back.

use std::cell::RefCell;
use std::rc::Rc;

use s390x_asm::{Encoder, Register};
use tracing::{debug, instrument};

use crate::alloc::{AddressSpec, CodeAllocator, Slice};
use crate::cpu_context::{gpr_offset, FRAME_LEN, GPRS_OFFSET, PSWM_OFFSET};
use crate::disasm::Disassembler;
use crate::error::HookError;
use crate::relocator::{self, Relocator};

/// The patched-in redirect is a `BRCL`, so this many bytes of original
/// prologue must be relocatable before a hook can be installed.
pub const MIN_PROLOGUE_BYTES: usize = 6;

/// How far from the hooked function a trampoline slice may land and still
/// be reachable by a `BRCL`.
pub const MAX_SLICE_DISTANCE: u64 = 0xFFFF_FFFE;

/// Generous fixed capacity for a per-hook trampoline slice: alignment
/// padding, the function-context literal, two trampoline stubs, and the
/// relocated prologue plus its tail branch all comfortably fit.
const TRAMPOLINE_SLICE_CAPACITY: usize = 512;

/// Capacity reserved for the one-time shared enter/leave thunk pair.
const SHARED_THUNKS_SLICE_CAPACITY: usize = 256;

/// An opaque, framework-owned pointer embedded verbatim in every per-hook
/// trampoline and handed to the enter/leave thunks as the handler's first
/// argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FunctionContext(pub u64);

/// Addresses of the shared enter- and leave-thunk entry points, built once
/// per backend instance and reused by every hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedThunks {
    pub enter_thunk: u64,
    pub leave_thunk: u64,
}

/// Everything a single installed hook needs to be torn down again.
pub struct HookContext {
    pub function_address: u64,
    pub function_context: FunctionContext,
    pub trampoline_slice: Slice,
    pub on_enter_trampoline: u64,
    pub on_leave_trampoline: u64,
    pub on_invoke_trampoline: u64,
    pub overwritten_prologue: Vec<u8>,
}

/// Builds shared thunks and per-function trampolines.
#[derive(Default)]
pub struct TrampolineBuilder;

impl TrampolineBuilder {
    pub fn new() -> Self {
        TrampolineBuilder
    }

    /// Allows a framework to short-circuit relocation for prologues it
    /// already knows how to redirect some other way (e.g. a function that
    /// is itself a short indirect jump to the real body). The base
    /// implementation never does this.
    pub fn resolve_redirect(&self, _function_address: u64, _code: &[u8]) -> Option<u64> {
        None
    }

    /// Builds the one-time enter- and leave-thunks that every per-hook
    /// trampoline jumps into.
    #[instrument(skip(self, alloc))]
    pub fn build_shared_thunks(
        &self,
        alloc: &mut dyn CodeAllocator,
        on_enter_handler: u64,
        on_leave_handler: u64,
    ) -> Result<SharedThunks, HookError> {
        let slice = alloc
            .alloc_slice(SHARED_THUNKS_SLICE_CAPACITY)
            .ok_or(HookError::NoSliceAvailable)?;
        let mut buf = slice.data;
        let mut enc = Encoder::new(&mut buf, slice.address);

        let enter_thunk = emit_thunk(&mut enc, on_enter_handler, &[PSWM_OFFSET, gpr_offset(14), gpr_offset(1)]);
        let leave_thunk = emit_thunk(&mut enc, on_leave_handler, &[PSWM_OFFSET, gpr_offset(1)]);

        debug!(enter_thunk, leave_thunk, "built shared thunks");
        Ok(SharedThunks { enter_thunk, leave_thunk })
    }

    /// Relocates `code`'s prologue, builds a trampoline slice, and activates
    /// the hook by overwriting the first relocated bytes of `code` with a
    /// redirect to it.
    ///
    /// `code` must be a mutable view of the live, executable bytes at
    /// `function_address` of at least [`MIN_PROLOGUE_BYTES`] length; the
    /// caller is responsible for however it obtained writable access to
    /// that memory.
    #[instrument(skip(self, alloc, disasm, code))]
    pub fn install(
        &self,
        alloc: &mut dyn CodeAllocator,
        disasm: &mut dyn Disassembler,
        code: &mut [u8],
        function_address: u64,
        function_context: FunctionContext,
        shared_thunks: SharedThunks,
    ) -> Result<HookContext, HookError> {
        let (ok, prologue_len) = relocator::can_relocate(disasm, code, function_address, MIN_PROLOGUE_BYTES);
        if !ok {
            return Err(HookError::InsufficientPrologue {
                needed: MIN_PROLOGUE_BYTES,
                available: prologue_len,
            });
        }

        let spec = AddressSpec {
            near: function_address,
            max_distance: MAX_SLICE_DISTANCE,
        };
        let slice = alloc
            .try_alloc_slice_near(spec, 8, TRAMPOLINE_SLICE_CAPACITY)
            .ok_or(HookError::NoSliceAvailable)?;
        let mut buf = slice.data;
        let buf_len = buf.len();
        let encoder = Rc::new(RefCell::new(Encoder::new(&mut buf, slice.address)));

        let function_context_ptr_addr = {
            let mut enc = encoder.borrow_mut();
            enc.put_padding(8);
            let addr = enc.cur();
            enc.put_bytes(&function_context.0.to_be_bytes());
            addr
        };

        let on_enter_trampoline = {
            let mut enc = encoder.borrow_mut();
            emit_trampoline_stub(&mut enc, shared_thunks.enter_thunk, function_context_ptr_addr)
        };
        let on_leave_trampoline = {
            let mut enc = encoder.borrow_mut();
            emit_trampoline_stub(&mut enc, shared_thunks.leave_thunk, function_context_ptr_addr)
        };

        let on_invoke_trampoline = encoder.borrow().cur();
        let mut relocator = Relocator::init(disasm, &*code, function_address, function_address, Rc::clone(&encoder));
        let mut consumed = 0;
        while consumed < prologue_len {
            let read = relocator.read_one();
            if read == 0 {
                break;
            }
            consumed = read;
        }
        relocator.write_all();
        if !relocator.eoi() {
            let mut enc = encoder.borrow_mut();
            enc.brcl(0xF, function_address + prologue_len as u64);
        }

        let written = encoder.borrow().offset();
        debug_assert!(written <= buf_len, "trampoline slice too small");

        // Drop every handle into `buf` so it can be reclaimed into the
        // `HookContext` below instead of being discarded with the encoder.
        drop(relocator);
        drop(encoder);

        let overwritten_prologue = code[..prologue_len].to_vec();
        patch_redirect(code, function_address, on_enter_trampoline, prologue_len);

        debug!(function_address, on_enter_trampoline, on_invoke_trampoline, "installed hook");

        Ok(HookContext {
            function_address,
            function_context,
            trampoline_slice: Slice {
                address: slice.address,
                data: buf,
            },
            on_enter_trampoline,
            on_leave_trampoline,
            on_invoke_trampoline,
            overwritten_prologue,
        })
    }

    /// Restores the original prologue bytes saved at install time.
    pub fn uninstall(&self, code: &mut [u8], ctx: &HookContext) {
        let len = ctx.overwritten_prologue.len();
        code[..len].copy_from_slice(&ctx.overwritten_prologue);
        debug!(function_address = ctx.function_address, "uninstalled hook");
    }
}

/// Overwrites the first `prologue_len` bytes of `code` with `BRCL 15,
/// target`, filling any remainder with NOPs.
fn patch_redirect(code: &mut [u8], function_address: u64, target: u64, prologue_len: usize) {
    let mut enc = Encoder::new(&mut code[..prologue_len], function_address);
    enc.brcl(0xF, target);
    let filled = enc.offset();
    enc.put_nops(prologue_len - filled);
}

/// Emits one of the two generic stub layouts a per-hook trampoline uses to
/// reach the shared enter/leave thunk: reserve the frame, save every
/// register into it, then jump into the thunk with `R1` holding the thunk's
/// address and `R2` holding the function context pointer.
fn emit_trampoline_stub(enc: &mut Encoder, thunk_target: u64, function_context_ptr_addr: u64) -> u64 {
    enc.put_padding(8);
    let literal_addr = enc.cur();
    enc.put_bytes(&thunk_target.to_be_bytes());

    let entry = enc.cur();
    enc.lay(Register::R15, -(FRAME_LEN as i32), Register::R0, Register::R15);
    enc.stmg(Register::R0, Register::R15, GPRS_OFFSET as i32, Register::R15);
    enc.lgrl(Register::R1, literal_addr);
    enc.lgrl(Register::R2, function_context_ptr_addr);
    enc.bcr(0xF, Register::R1);
    entry
}

/// Emits the shared thunk body: save the condition code, call `handler`
/// with the context pointer already in `R2` and the argument slots listed
/// in `arg_slot_offsets` loaded into `R3..`, then restore everything
/// (including `R1`, which the handler repurposes as the continuation
/// address) and release the frame.
fn emit_thunk(enc: &mut Encoder, handler: u64, arg_slot_offsets: &[u32]) -> u64 {
    enc.put_padding(8);
    let literal_addr = enc.cur();
    enc.put_bytes(&handler.to_be_bytes());

    let entry = enc.cur();
    enc.ipm(Register::R1);
    enc.stg(Register::R1, PSWM_OFFSET as i32, Register::R0, Register::R15);
    enc.lgrl(Register::R1, literal_addr);

    let arg_regs = [Register::R3, Register::R4, Register::R5, Register::R6];
    for (reg, offset) in arg_regs.iter().zip(arg_slot_offsets) {
        enc.la(*reg, *offset as u16, Register::R0, Register::R15);
    }

    enc.basr(Register::R14, Register::R1);
    enc.lg(Register::R1, PSWM_OFFSET as i32, Register::R0, Register::R15);
    enc.spm(Register::R1);
    enc.lmg(Register::R0, Register::R15, GPRS_OFFSET as i32, Register::R15);
    enc.lay(Register::R15, FRAME_LEN as i32, Register::R0, Register::R15);
    enc.bcr(0xF, Register::R1);
    entry
}
