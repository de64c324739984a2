//! Error kinds surfaced at the hook-install boundary.

use thiserror::Error;

/// Failure reasons a hook install can report.
///
/// Both variants are refusals, not partial failures: on either, no code has
/// been modified and no slice is leaked (callers that receive an `Err` owe
/// nothing back to this crate). Programming errors internal to the
/// relocator or encoder (ring overflow, buffer overflow, an impossible
/// instruction classification) are not represented here; they indicate a
/// bug and are reported via `debug_assert!`/`unreachable!()` instead, per
/// the original backend's "abort on assertion failure" model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HookError {
    /// Fewer than [`crate::trampoline::MIN_PROLOGUE_BYTES`] contiguous
    /// recognized bytes were found at the target, so the prologue cannot be
    /// safely relocated.
    #[error("only {available} relocatable prologue bytes available at the target, need at least {needed}")]
    InsufficientPrologue { needed: usize, available: usize },

    /// The code allocator could not satisfy the near-address constraint
    /// required for the trampoline slice to be reachable by a `BRCL`.
    #[error("no trampoline slice available near the target function")]
    NoSliceAvailable,
}
