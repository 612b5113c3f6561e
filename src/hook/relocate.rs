//! Prologue relocation.
//!
//! Walks the first bytes of the function being hooked, decides for each
//! instruction whether it can move, and renders two overlays: the entry
//! jump that will overwrite the function, and the trampoline body that
//! re-homes the displaced instructions.

use std::slice;

use super::HookResult;
use super::errors::HookError;
use super::jmp::{self, JumpTable};
use super::overlay::Overlay;
use crate::decode::{self, MAX_INSN_LEN, Prefixes};

pub(crate) struct Relocated {
    pub fn_overlay: Overlay,
    pub t_overlay: Overlay,
    /// Bytes displaced from the hooked function, entry jump plus the
    /// tail of the last straddling instruction.
    pub displaced: usize,
}

/// Renders the entry and trampoline overlays for hooking `fn_addr`.
///
/// # Safety
/// `fn_addr` must point to at least `INITIAL_JUMP_LEN + MAX_INSN_LEN`
/// readable bytes of code.
pub(crate) unsafe fn relocate(
    fn_addr: u64,
    replacement: u64,
    t_target: u64,
    table: &mut JumpTable,
) -> HookResult<Relocated> {
    let mut fn_ov = Overlay::new(fn_addr);
    let mut t_ov = Overlay::new(t_target);

    // Phase A: the entry stub fixes how many prologue bytes die.
    jmp::initial_jump(&mut fn_ov, replacement)?;
    let clobber = fn_ov.cursor();

    // Lowest in-function branch destination seen during the walk.
    let mut hazard = u64::MAX;
    let track = |hazard: &mut u64, dest: u64| {
        if dest >= fn_addr {
            *hazard = (*hazard).min(dest);
        }
    };

    // Phase B: evacuate whole instructions until the clobbered bytes
    // are covered.
    let mut off = 0usize;
    while off < clobber {
        let insn_off = off;
        let insn_addr = fn_addr + insn_off as u64;
        let bytes = unsafe { slice::from_raw_parts(insn_addr as *const u8, MAX_INSN_LEN) };
        let s = decode::decode(bytes)?;
        off += s.len;
        let next = fn_addr + off as u64;

        log::trace!(
            "[relocate] {insn_addr:#x}: opcode {:02X} len {}",
            s.opcode,
            s.len
        );

        match (s.opcode, s.opcode2) {
            // An int3 here belongs to a debugger; back off.
            (0xCC, None) => return Err(HookError::DebugBreakpoint),

            // call rel32
            (0xE8, None) => {
                let dest = next.wrapping_add(s.simm() as u64);
                jmp::table_call(&mut t_ov, dest, table)?;
                track(&mut hazard, dest);
            }

            // jmp rel32 / jmp rel8
            (0xE9, None) | (0xEB, None) => {
                let dest = next.wrapping_add(s.simm() as u64);
                jmp::table_jump(&mut t_ov, dest, table)?;
                track(&mut hazard, dest);
            }

            // loop/loope/loopne/jrcxz only exist with rel8; there is no
            // wide form to lift them into.
            (0xE0..=0xE3, None) => {
                return Err(HookError::UnsupportedInstruction(insn_off));
            }

            // Jcc rel8
            (op @ 0x70..=0x7F, None) => {
                let dest = next.wrapping_add(s.simm() as u64);
                jmp::cond_branch(&mut t_ov, op, dest, table)?;
                track(&mut hazard, dest);
            }

            // Jcc rel32
            (0x0F, Some(op2 @ 0x80..=0x8F)) => {
                let dest = next.wrapping_add(s.simm() as u64);
                jmp::cond_branch(&mut t_ov, op2 - 0x10, dest, table)?;
                track(&mut hazard, dest);
            }

            _ if s.is_rip_relative() => {
                // Only LEA can be rewritten without a scratch register:
                // the computed address becomes a mov imm64 into the
                // same destination register.
                if s.opcode != 0x8D
                    || s.opcode2.is_some()
                    || s.prefixes.contains(Prefixes::OPSIZE)
                {
                    return Err(HookError::UnsupportedInstruction(insn_off));
                }
                let addr = next.wrapping_add(s.disp as u64);
                // A 32-bit lea zero-extends; the rewrite must agree.
                let value = if s.rex_w { addr } else { addr & 0xFFFF_FFFF };
                let reg = s.reg();
                t_ov.emit_bytes(&[0x48 | (reg >> 3), 0xB8 + (reg & 7)])?;
                t_ov.emit_u64(value)?;
                log::trace!(
                    "[relocate] rewrote lea r{reg}, [rip] to movabs {value:#x}"
                );
            }

            // Everything else is position-independent as bytes,
            // LOCK/REP prefixes included.
            _ => {
                t_ov.emit_bytes(&bytes[..s.len])?;
            }
        }
    }

    // A branch into the displaced range cannot be preserved: its target
    // bytes are gone from the function and carry no label in the
    // trampoline.
    if hazard < fn_addr + off as u64 {
        return Err(HookError::BranchHazard(hazard));
    }

    // Phase C: trap the tail of a partially clobbered instruction, then
    // route the trampoline back to the first surviving instruction.
    fn_ov.fill(0xCC, off - clobber)?;
    jmp::table_jump(&mut t_ov, fn_addr + off as u64, table)?;

    log::debug!(
        "[relocate] {fn_addr:#x}: displaced {off} bytes into {} trampoline bytes, {} jump slots",
        t_ov.cursor(),
        table.used()
    );

    Ok(Relocated {
        fn_overlay: fn_ov,
        t_overlay: t_ov,
        displaced: off,
    })
}
