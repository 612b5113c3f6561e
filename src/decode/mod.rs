//! Length disassembler for x86_64.
//!
//! Decodes a single instruction far enough to know its length and the
//! structure of its operand bytes. This is all the relocator needs: it
//! never interprets semantics beyond the handful of opcodes it rewrites.
//!
//! Coverage is the instruction set a C/C++ compiler emits in function
//! bodies: every one-byte opcode, the `0F` map (plus the `0F 38`/`0F 3A`
//! escapes), REX and all legacy prefixes, ModR/M, SIB, displacements and
//! the immediate widths modulated by `66`/REX.W. VEX/EVEX/XOP encodings
//! are rejected; they do not occur in the prologues this crate patches.

pub mod errors;
mod tables;

use bitflags::bitflags;

pub use errors::DecodeError;

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Architectural limit on x86_64 instruction length.
pub const MAX_INSN_LEN: usize = 15;

bitflags! {
    /// Legacy prefixes observed in front of the opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Prefixes: u16 {
        const LOCK     = 1 << 0;
        const REPNE    = 1 << 1;
        const REP      = 1 << 2;
        const SEGMENT  = 1 << 3;
        const OPSIZE   = 1 << 4;
        const ADDRSIZE = 1 << 5;
    }
}

/// ModR/M byte split into its three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
}

/// SIB byte split into its three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sib {
    pub scale: u8,
    pub index: u8,
    pub base: u8,
}

/// One decoded instruction.
///
/// `disp` is sign-extended at decode time; `imm` is kept raw and
/// sign-extended on demand via [`Decoded::simm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoded {
    /// Total instruction length in bytes, 1..=15.
    pub len: usize,
    pub prefixes: Prefixes,
    pub rex_w: bool,
    pub rex_r: bool,
    pub rex_x: bool,
    pub rex_b: bool,
    /// Primary opcode byte; `0x0F` when the two-byte map is selected.
    pub opcode: u8,
    /// Second opcode byte for the `0F` map, `0x38`/`0x3A` for the
    /// three-byte maps.
    pub opcode2: Option<u8>,
    /// Third opcode byte for the `0F 38`/`0F 3A` maps.
    pub opcode3: Option<u8>,
    pub modrm: Option<ModRm>,
    pub sib: Option<Sib>,
    pub disp_size: usize,
    pub disp: i64,
    pub imm_size: usize,
    pub imm: u64,
}

impl Decoded {
    /// True for a memory operand of the form `[rip + disp32]`.
    pub fn is_rip_relative(&self) -> bool {
        matches!(self.modrm, Some(m) if m.mode == 0 && m.rm == 5)
    }

    /// Immediate sign-extended to 64 bits.
    pub fn simm(&self) -> i64 {
        match self.imm_size {
            1 => self.imm as u8 as i8 as i64,
            2 => self.imm as u16 as i16 as i64,
            4 => self.imm as u32 as i32 as i64,
            _ => self.imm as i64,
        }
    }

    /// ModR/M.reg extended with REX.R.
    pub fn reg(&self) -> u8 {
        let reg = self.modrm.map(|m| m.reg).unwrap_or(0);
        reg | ((self.rex_r as u8) << 3)
    }
}

fn fetch(bytes: &[u8], at: usize) -> DecodeResult<u8> {
    if at >= MAX_INSN_LEN {
        return Err(DecodeError::TooLong);
    }
    bytes.get(at).copied().ok_or(DecodeError::Truncated)
}

/// Decodes one instruction from the start of `bytes`.
///
/// At most [`MAX_INSN_LEN`] bytes are consumed. The slice may be shorter
/// than the instruction only if the instruction itself is truncated, in
/// which case [`DecodeError::Truncated`] is returned.
pub fn decode(bytes: &[u8]) -> DecodeResult<Decoded> {
    let mut d = Decoded::default();
    let mut i = 0;
    let mut rex: Option<u8> = None;

    // Legacy and REX prefixes. A REX byte only counts when it is the
    // last prefix before the opcode; any legacy prefix after it voids it.
    loop {
        match fetch(bytes, i)? {
            b @ 0x40..=0x4F => rex = Some(b),
            0xF0 => {
                d.prefixes |= Prefixes::LOCK;
                rex = None;
            }
            0xF2 => {
                d.prefixes |= Prefixes::REPNE;
                rex = None;
            }
            0xF3 => {
                d.prefixes |= Prefixes::REP;
                rex = None;
            }
            0x26 | 0x2E | 0x36 | 0x3E | 0x64 | 0x65 => {
                d.prefixes |= Prefixes::SEGMENT;
                rex = None;
            }
            0x66 => {
                d.prefixes |= Prefixes::OPSIZE;
                rex = None;
            }
            0x67 => {
                d.prefixes |= Prefixes::ADDRSIZE;
                rex = None;
            }
            _ => break,
        }
        i += 1;
    }

    if let Some(r) = rex {
        d.rex_w = r & 0x08 != 0;
        d.rex_r = r & 0x04 != 0;
        d.rex_x = r & 0x02 != 0;
        d.rex_b = r & 0x01 != 0;
    }

    d.opcode = fetch(bytes, i)?;
    i += 1;

    let mut attrs = tables::ONE_BYTE[d.opcode as usize];

    if attrs & tables::ESCAPE != 0 {
        let op2 = fetch(bytes, i)?;
        i += 1;
        d.opcode2 = Some(op2);
        attrs = tables::TWO_BYTE[op2 as usize];

        if attrs & (tables::ESCAPE_38 | tables::ESCAPE_3A) != 0 {
            let op3 = fetch(bytes, i)?;
            i += 1;
            d.opcode3 = Some(op3);
            attrs = if attrs & tables::ESCAPE_38 != 0 {
                tables::MODRM
            } else {
                tables::MODRM | tables::IMM8
            };
        }
    }

    if attrs & tables::VEX != 0 {
        return Err(DecodeError::UnsupportedEncoding);
    }
    if attrs & tables::INVALID != 0 {
        return Err(DecodeError::InvalidInstruction);
    }

    if attrs & tables::MODRM != 0 {
        let m = fetch(bytes, i)?;
        i += 1;

        // 8F is POP r/m64 only with reg 0; anything else is an XOP
        // prefix, which this decoder does not support.
        if d.opcode == 0x8F && d.opcode2.is_none() && (m >> 3) & 7 != 0 {
            return Err(DecodeError::UnsupportedEncoding);
        }

        let modrm = ModRm {
            mode: m >> 6,
            reg: (m >> 3) & 7,
            rm: m & 7,
        };
        d.modrm = Some(modrm);

        let mut sib_base = 0u8;
        if modrm.mode != 3 && modrm.rm == 4 {
            let s = fetch(bytes, i)?;
            i += 1;
            sib_base = s & 7;
            d.sib = Some(Sib {
                scale: s >> 6,
                index: (s >> 3) & 7,
                base: sib_base,
            });
        }

        d.disp_size = match modrm.mode {
            0 if modrm.rm == 5 => 4,
            0 if modrm.rm == 4 && sib_base == 5 => 4,
            1 => 1,
            2 => 4,
            _ => 0,
        };

        if d.disp_size > 0 {
            let mut raw = 0u64;
            for k in 0..d.disp_size {
                raw |= (fetch(bytes, i + k)? as u64) << (8 * k);
            }
            i += d.disp_size;
            d.disp = match d.disp_size {
                1 => raw as u8 as i8 as i64,
                _ => raw as u32 as i32 as i64,
            };
        }
    }

    d.imm_size = immediate_size(&d, attrs);
    if d.imm_size > 0 {
        let mut raw = 0u64;
        for k in 0..d.imm_size {
            raw |= (fetch(bytes, i + k)? as u64) << (8 * k);
        }
        i += d.imm_size;
        d.imm = raw;
    }

    if i > MAX_INSN_LEN {
        return Err(DecodeError::TooLong);
    }
    d.len = i;
    Ok(d)
}

fn immediate_size(d: &Decoded, attrs: u16) -> usize {
    let z = if d.prefixes.contains(Prefixes::OPSIZE) {
        2
    } else {
        4
    };

    let mut size = 0;
    if attrs & tables::IMM8 != 0 {
        size += 1;
    }
    if attrs & tables::IMM16 != 0 {
        size += 2;
    }
    if attrs & tables::IMM32 != 0 {
        size += 4;
    }
    if attrs & tables::IMM_Z != 0 {
        size += z;
    }
    if attrs & tables::IMM_V != 0 {
        size += if d.rex_w { 8 } else { z };
    }
    if attrs & tables::MOFFS != 0 {
        size += if d.prefixes.contains(Prefixes::ADDRSIZE) {
            4
        } else {
            8
        };
    }
    if attrs & tables::GROUP_IMM != 0 {
        // TEST r/m, imm lives in reg slots 0 and 1 of group 3.
        if matches!(d.modrm, Some(m) if m.reg < 2) {
            size += if d.opcode == 0xF6 { 1 } else { z };
        }
    }
    size
}
