//! Hook installation and the batch scope.
//!
//! Every install renders its overlays first and only then commits them
//! through the process-memory channel: trampoline before entry jump, so
//! the trampoline is whole before any caller is diverted. The channel
//! is opened per install, or once per batch when the caller brackets a
//! burst of installs with [`begin_batch`]/[`end_batch`].

use std::ffi::c_void;

use parking_lot::Mutex;

use super::HookResult;
use super::constants::MAX_JUMPS;
use super::errors::HookError;
use super::jmp::JumpTable;
use super::overlay::Overlay;
use super::relocate::relocate;
use super::trampoline::jump_table_base;
use crate::os::linux::mem::MemChannel;

/// Channel shared by all installs inside a batch. Also serialises
/// commits from concurrent installs against distinct functions.
static BATCH: Mutex<Option<MemChannel>> = Mutex::new(None);

/// Opens the process-memory channel for a run of installs.
///
/// Re-entrant: a second call while a batch is open is a no-op.
pub fn begin_batch() -> HookResult<()> {
    let mut batch = BATCH.lock();
    if batch.is_none() {
        *batch = Some(MemChannel::open()?);
        log::debug!("[install] batch opened");
    }
    Ok(())
}

/// Closes the batch channel. Idempotent.
pub fn end_batch() {
    if BATCH.lock().take().is_some() {
        log::debug!("[install] batch closed");
    }
}

/// Patches `fn_` so every call is diverted to `replacement`.
///
/// When `trampoline` names a symbol declared with
/// [`declare_trampoline!`](crate::declare_trampoline), the instructions
/// displaced from `fn_` are relocated into it and the trampoline becomes
/// a callable stand-in for the original. A null `trampoline` skips that;
/// the prologue is still fully checked.
///
/// # Safety
/// - `fn_` and `replacement` must be entry points of functions with
///   compatible signatures.
/// - `trampoline`, when non-null, must come from `declare_trampoline!`.
/// - No other thread may be executing inside the first bytes of `fn_`
///   during the install; the caller is responsible for quiescence.
pub unsafe fn install(
    fn_: *const c_void,
    replacement: *const c_void,
    trampoline: *const c_void,
) -> HookResult<()> {
    if fn_.is_null() {
        return Err(HookError::NullPointer("fn"));
    }
    if replacement.is_null() {
        return Err(HookError::NullPointer("replacement"));
    }

    log::debug!("[install] hooking {fn_:p} -> {replacement:p}, trampoline {trampoline:p}");

    let fn_addr = fn_ as u64;
    let replacement = replacement as u64;

    if trampoline.is_null() {
        // The walk still runs for hazard and support detection; the
        // rendered trampoline is discarded along with this scratch
        // jump table.
        let mut scratch = [0u64; MAX_JUMPS];
        let mut table = unsafe { JumpTable::from_raw(scratch.as_mut_ptr(), MAX_JUMPS) };
        let relocated = unsafe {
            relocate(fn_addr, replacement, scratch.as_ptr() as u64, &mut table)?
        };
        commit(None, &relocated.fn_overlay)?;
        log::debug!(
            "[install] hooked {fn_addr:#x}, {} bytes displaced, no trampoline",
            relocated.displaced
        );
    } else {
        let base = unsafe { jump_table_base(trampoline) };
        let mut table = unsafe { JumpTable::from_raw(base, MAX_JUMPS) };
        let relocated = unsafe {
            relocate(fn_addr, replacement, trampoline as u64, &mut table)?
        };
        commit(Some(&relocated.t_overlay), &relocated.fn_overlay)?;
        log::debug!(
            "[install] hooked {fn_addr:#x}, {} bytes displaced into {trampoline:p}",
            relocated.displaced
        );
    }
    Ok(())
}

fn commit(trampoline: Option<&Overlay>, entry: &Overlay) -> HookResult<()> {
    let batch = BATCH.lock();
    match batch.as_ref() {
        Some(channel) => commit_with(channel, trampoline, entry),
        None => {
            let channel = MemChannel::open()?;
            commit_with(&channel, trampoline, entry)
        }
    }
}

fn commit_with(
    channel: &MemChannel,
    trampoline: Option<&Overlay>,
    entry: &Overlay,
) -> HookResult<()> {
    if let Some(t) = trampoline {
        t.commit(channel)?;
    }
    // Publication point: a failure past here leaves the entry torn and
    // is unrecoverable, which is why short writes are hard errors.
    entry.commit(channel)?;
    Ok(())
}
