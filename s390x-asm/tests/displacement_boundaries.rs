//! Boundary cases for PC-relative and signed-20-bit displacement encoding.

use s390x_asm::encoder::{pc_relative_halfword_disp, Encoder};
use s390x_asm::Register;

#[test]
fn brcl_reaches_exactly_plus_2gib() {
    // BRCL's 32-bit field is halfword-scaled, so the largest forward
    // displacement it can express is 0xFFFF_FFFE bytes.
    let pc = 0x1_0000_0000u64;
    let target = pc + 0xFFFF_FFFE;
    let disp = pc_relative_halfword_disp(target, pc);
    assert_eq!(disp, i32::MAX);

    let mut buf = [0u8; 6];
    let mut enc = Encoder::new(&mut buf, pc);
    enc.brcl(0xF, target);
    assert_eq!(&buf[2..6], &i32::MAX.to_be_bytes());
}

#[test]
fn brcl_reaches_exactly_minus_2gib() {
    let pc = 0x1_0000_0000u64;
    let target = pc - 0x1_0000_0000;
    let disp = pc_relative_halfword_disp(target, pc);
    assert_eq!(disp, i32::MIN);

    let mut buf = [0u8; 6];
    let mut enc = Encoder::new(&mut buf, pc);
    enc.brcl(0xF, target);
    assert_eq!(&buf[2..6], &i32::MIN.to_be_bytes());
}

#[test]
fn signed_20_bit_displacement_extremes_round_trip() {
    for d2 in [-524288i32, 524287i32] {
        let mut buf = [0u8; 6];
        let mut enc = Encoder::new(&mut buf, 0x1000_0000);
        enc.stg(Register::R1, d2, Register::R0, Register::R2);

        let d2u = (d2 as u32) & 0xF_FFFF;
        let low_nibble = buf[2] & 0xF;
        let low_byte = buf[3];
        let high_byte = buf[4];
        let rebuilt = ((high_byte as u32) << 12) | ((low_nibble as u32) << 8) | (low_byte as u32);
        assert_eq!(rebuilt, d2u);
    }
}

#[test]
#[should_panic]
fn signed_20_bit_displacement_rejects_out_of_range() {
    let mut buf = [0u8; 6];
    let mut enc = Encoder::new(&mut buf, 0x1000_0000);
    enc.stg(Register::R1, 524288, Register::R0, Register::R2);
}
