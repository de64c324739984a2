//! Prologue relocation and trampoline construction for hooking s390x
//! functions.
//!
//! This crate is the architecture-specific backend of a function
//! interceptor: given the address of a compiled function, it can relocate
//! enough of that function's prologue to make room for a redirect, build the
//! trampoline code the redirect jumps to, and wire both an "on enter" and an
//! "on leave" callback into the call. It does not itself decide where
//! executable memory comes from or how machine instructions are decoded —
//! those are the [`alloc::CodeAllocator`] and [`disasm::Disassembler`] seams,
//! which an embedding framework supplies.

pub mod alloc;
pub mod cpu_context;
pub mod disasm;
pub mod error;
pub mod relocator;
pub mod trampoline;

pub use alloc::{AddressSpec, CodeAllocator, Slice};
pub use cpu_context::CpuContext;
pub use disasm::{DecodedInsn, Disassembler, InsnId};
pub use error::HookError;
pub use relocator::Relocator;
pub use trampoline::{FunctionContext, HookContext, SharedThunks, TrampolineBuilder};
