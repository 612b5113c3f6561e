//! C ABI surface.
//!
//! Mirrors the Rust entry points with integer status returns so the
//! crate can sit behind `extern "C"` callers. All error detail collapses
//! to -1; the specific failure is logged.

use std::ffi::{c_int, c_void};

use crate::hook;

/// See [`hook::install`]. Returns 0 on success, -1 on any failure.
///
/// # Safety
/// Same contract as [`hook::install`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hook_install(
    fn_: *const c_void,
    replacement: *const c_void,
    trampoline: *const c_void,
) -> c_int {
    match unsafe { hook::install(fn_, replacement, trampoline) } {
        Ok(()) => 0,
        Err(err) => {
            log::error!("[ffi] hook_install({fn_:p}) failed: {err}");
            -1
        }
    }
}

/// See [`hook::begin_batch`]. Returns 0 on success, -1 on failure.
#[unsafe(no_mangle)]
pub extern "C" fn hook_begin() -> c_int {
    match hook::begin_batch() {
        Ok(()) => 0,
        Err(err) => {
            log::error!("[ffi] hook_begin failed: {err}");
            -1
        }
    }
}

/// See [`hook::end_batch`].
#[unsafe(no_mangle)]
pub extern "C" fn hook_end() {
    hook::end_batch();
}
