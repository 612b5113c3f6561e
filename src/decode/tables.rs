//! Opcode attribute tables for the length decoder.
//!
//! One entry per opcode byte. The attributes only describe what the
//! decoder needs for length and field extraction: operand bytes that
//! follow the opcode, not what the instruction does.

/// No trailing bytes beyond the opcode.
pub(super) const NONE: u16 = 0;
/// Instruction carries a ModR/M byte (and possibly SIB/displacement).
pub(super) const MODRM: u16 = 1 << 0;
/// 8-bit immediate.
pub(super) const IMM8: u16 = 1 << 1;
/// Fixed 16-bit immediate.
pub(super) const IMM16: u16 = 1 << 2;
/// Immediate is 32 bits, or 16 with an operand-size prefix.
pub(super) const IMM_Z: u16 = 1 << 3;
/// Immediate is 32 bits, 16 with `66`, 64 with REX.W (`B8..BF`).
pub(super) const IMM_V: u16 = 1 << 4;
/// Fixed 32-bit immediate. Near branches keep rel32 in 64-bit mode
/// regardless of the operand-size prefix.
pub(super) const IMM32: u16 = 1 << 5;
/// Address-sized memory offset (`A0..A3`): 8 bytes, 4 with `67`.
pub(super) const MOFFS: u16 = 1 << 6;
/// Legacy prefix byte, consumed before opcode dispatch.
pub(super) const PREFIX: u16 = 1 << 7;
/// REX prefix byte (`40..4F`), 64-bit mode only.
pub(super) const REX: u16 = 1 << 8;
/// Not encodable in 64-bit mode.
pub(super) const INVALID: u16 = 1 << 9;
/// `F6`/`F7`: an immediate follows only when ModR/M.reg selects TEST.
pub(super) const GROUP_IMM: u16 = 1 << 10;
/// `0F` escape into the two-byte map.
pub(super) const ESCAPE: u16 = 1 << 11;
/// VEX/EVEX payload byte (`C4`/`C5`/`62`); rejected by the decoder.
pub(super) const VEX: u16 = 1 << 12;
/// `0F 38` escape into the three-byte map (ModR/M, no immediate).
pub(super) const ESCAPE_38: u16 = 1 << 13;
/// `0F 3A` escape into the three-byte map (ModR/M plus imm8).
pub(super) const ESCAPE_3A: u16 = 1 << 14;

const M: u16 = MODRM;
const I8: u16 = IMM8;
const IZ: u16 = IMM_Z;
const MI8: u16 = MODRM | IMM8;
const MIZ: u16 = MODRM | IMM_Z;
const PFX: u16 = PREFIX;
const INV: u16 = INVALID;

/// One-byte opcode map, 64-bit mode.
#[rustfmt::skip]
pub(super) const ONE_BYTE: [u16; 256] = [
    // 00-0F: add/or, 0F escape
    M, M, M, M, I8, IZ, INV, INV, M, M, M, M, I8, IZ, INV, ESCAPE,
    // 10-1F: adc/sbb
    M, M, M, M, I8, IZ, INV, INV, M, M, M, M, I8, IZ, INV, INV,
    // 20-2F: and/sub, segment prefixes
    M, M, M, M, I8, IZ, PFX, INV, M, M, M, M, I8, IZ, PFX, INV,
    // 30-3F: xor/cmp
    M, M, M, M, I8, IZ, PFX, INV, M, M, M, M, I8, IZ, PFX, INV,
    // 40-4F: REX
    REX, REX, REX, REX, REX, REX, REX, REX, REX, REX, REX, REX, REX, REX, REX, REX,
    // 50-5F: push/pop r64
    NONE, NONE, NONE, NONE, NONE, NONE, NONE, NONE,
    NONE, NONE, NONE, NONE, NONE, NONE, NONE, NONE,
    // 60-6F: movsxd, push/imul imm, ins/outs; 62 is EVEX
    INV, INV, VEX, M, PFX, PFX, PFX, PFX, IZ, MIZ, I8, MI8, NONE, NONE, NONE, NONE,
    // 70-7F: Jcc rel8
    I8, I8, I8, I8, I8, I8, I8, I8, I8, I8, I8, I8, I8, I8, I8, I8,
    // 80-8F: group1, test/xchg/mov, lea, pop r/m
    MI8, MIZ, INV, MI8, M, M, M, M, M, M, M, M, M, M, M, M,
    // 90-9F: xchg/nop, cwde, pushf
    NONE, NONE, NONE, NONE, NONE, NONE, NONE, NONE,
    NONE, NONE, INV, NONE, NONE, NONE, NONE, NONE,
    // A0-AF: moffs moves, string ops, test imm
    MOFFS, MOFFS, MOFFS, MOFFS, NONE, NONE, NONE, NONE,
    I8, IZ, NONE, NONE, NONE, NONE, NONE, NONE,
    // B0-BF: mov r8 imm8, mov r imm16/32/64
    I8, I8, I8, I8, I8, I8, I8, I8,
    IMM_V, IMM_V, IMM_V, IMM_V, IMM_V, IMM_V, IMM_V, IMM_V,
    // C0-CF: shifts, ret, VEX, mov imm, enter/leave, int
    MI8, MI8, IMM16, NONE, VEX, VEX, MI8, MIZ,
    IMM16 | IMM8, NONE, IMM16, NONE, NONE, I8, INV, NONE,
    // D0-DF: shifts by 1/cl, xlat, x87
    M, M, M, M, INV, INV, INV, NONE, M, M, M, M, M, M, M, M,
    // E0-EF: loop/jcxz, in/out, call/jmp
    I8, I8, I8, I8, I8, I8, I8, I8, IMM32, IMM32, INV, I8, NONE, NONE, NONE, NONE,
    // F0-FF: lock/rep, hlt, group3, inc/dec groups
    PFX, NONE, PFX, PFX, NONE, NONE, M | GROUP_IMM, M | GROUP_IMM,
    NONE, NONE, NONE, NONE, NONE, NONE, M, M,
];

/// Two-byte opcode map (`0F xx`), 64-bit mode.
#[rustfmt::skip]
pub(super) const TWO_BYTE: [u16; 256] = [
    // 00-0F: system groups, syscall, prefetch; 0E/0F are 3DNow
    M, M, M, M, INV, NONE, NONE, NONE, NONE, NONE, INV, NONE, INV, M, INV, INV,
    // 10-1F: SSE moves, hint nops
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // 20-2F: mov cr/dr, SSE converts
    M, M, M, M, INV, INV, INV, INV, M, M, M, M, M, M, M, M,
    // 30-3F: rdtsc/rdmsr family, 38/3A escapes
    NONE, NONE, NONE, NONE, NONE, NONE, INV, NONE,
    ESCAPE_38, INV, ESCAPE_3A, INV, INV, INV, INV, INV,
    // 40-4F: cmovcc
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // 50-5F: SSE arithmetic
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // 60-6F: MMX/SSE packing
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // 70-7F: pshuf imm8, shift groups imm8, emms
    MI8, MI8, MI8, MI8, M, M, M, NONE, M, M, INV, INV, M, M, M, M,
    // 80-8F: Jcc rel32
    IMM32, IMM32, IMM32, IMM32, IMM32, IMM32, IMM32, IMM32,
    IMM32, IMM32, IMM32, IMM32, IMM32, IMM32, IMM32, IMM32,
    // 90-9F: setcc
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // A0-AF: push/pop fs/gs, cpuid, bt, shld/shrd, group15, imul
    NONE, NONE, NONE, M, MI8, M, INV, INV, NONE, NONE, NONE, M, MI8, M, M, M,
    // B0-BF: cmpxchg, movzx/movsx, group8 imm8, bsf/bsr
    M, M, M, M, M, M, M, M, M, M, MI8, M, M, M, M, M,
    // C0-CF: xadd, cmpps imm8, pinsrw/pextrw/shufps imm8, group9, bswap
    M, M, MI8, M, MI8, MI8, MI8, M,
    NONE, NONE, NONE, NONE, NONE, NONE, NONE, NONE,
    // D0-DF: MMX/SSE
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // E0-EF: MMX/SSE
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
    // F0-FF: MMX/SSE, ud0
    M, M, M, M, M, M, M, M, M, M, M, M, M, M, M, M,
];
