//! End-to-end install/uninstall scenarios against synthetic function bodies.

use s390x_interceptor::alloc::VecCodeAllocator;
use s390x_interceptor::disasm::StubDisassembler;
use s390x_interceptor::error::HookError;
use s390x_interceptor::trampoline::{FunctionContext, TrampolineBuilder, MIN_PROLOGUE_BYTES};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn install_call_uninstall_round_trip_is_byte_identical() {
    init_tracing();

    let mut alloc = VecCodeAllocator::new(0x2000_0000);
    let builder = TrampolineBuilder::new();
    let shared = builder
        .build_shared_thunks(&mut alloc, 0x3000_0000, 0x3000_1000)
        .unwrap();

    // STMG (6 bytes) followed by LGR (4 bytes): 10 recognized prologue bytes.
    let original = vec![
        0xEB, 0xCF, 0xF0, 0x30, 0x00, 0x24, // stmg r12,r15,48(r15)
        0xB9, 0x04, 0x00, 0x21, // lgr r2,r1
    ];
    let mut code = original.clone();

    let ctx = builder
        .install(
            &mut alloc,
            &mut StubDisassembler,
            &mut code,
            0x1000_0000,
            FunctionContext(0x4000_0000),
            shared,
        )
        .expect("install should succeed with a recognizable prologue");

    assert_eq!(code[0], 0xC0, "prologue should now start with a BRCL opcode byte");
    assert_eq!(ctx.overwritten_prologue.len(), ctx.overwritten_prologue.len().max(MIN_PROLOGUE_BYTES));
    assert!(!ctx.trampoline_slice.data.is_empty());

    builder.uninstall(&mut code, &ctx);
    assert_eq!(code, original, "uninstall must restore the exact original bytes");
}

#[test]
fn prologue_starting_with_cgije_relocates_up_to_the_branch() {
    init_tracing();

    let mut alloc = VecCodeAllocator::new(0x2000_0000);
    let builder = TrampolineBuilder::new();
    let shared = builder
        .build_shared_thunks(&mut alloc, 0x3000_0000, 0x3000_1000)
        .unwrap();

    let original = vec![0xC2, 0x18, 0x00, 0x00, 0x00, 0x40];
    let mut code = original.clone();

    let ctx = builder
        .install(
            &mut alloc,
            &mut StubDisassembler,
            &mut code,
            0x1000_0000,
            FunctionContext(0x4000_0000),
            shared,
        )
        .expect("a single CGIJE is exactly MIN_PROLOGUE_BYTES long");

    assert_eq!(ctx.overwritten_prologue, original);
    builder.uninstall(&mut code, &ctx);
    assert_eq!(code, original);
}

#[test]
fn unrecognized_prologue_is_refused() {
    init_tracing();

    let mut alloc = VecCodeAllocator::new(0x2000_0000);
    let builder = TrampolineBuilder::new();
    let shared = builder
        .build_shared_thunks(&mut alloc, 0x3000_0000, 0x3000_1000)
        .unwrap();

    let mut code = vec![0xFF; 8];
    let err = builder
        .install(
            &mut alloc,
            &mut StubDisassembler,
            &mut code,
            0x1000_0000,
            FunctionContext(0x4000_0000),
            shared,
        )
        .unwrap_err();

    assert_eq!(
        err,
        HookError::InsufficientPrologue {
            needed: MIN_PROLOGUE_BYTES,
            available: 0,
        }
    );
}
