//! Trampoline symbol declaration and jump-table discovery.
//!
//! A trampoline is reserved at build time: [`TRAMPOLINE_LEN`] bytes of
//! `0xCC` in the text section under the chosen name, followed by a tiny
//! helper that returns the address of the trampoline's jump table (a
//! zero-initialised `_J_<name>` block of [`JUMP_TABLE_LEN`] bytes).
//! Calling the symbol before [`install`](super::install::install) traps;
//! afterwards it runs the displaced prologue of the hooked function.

use std::ffi::c_void;

use super::constants::TRAMPOLINE_LEN;

/// Returns the jump-table base of a declared trampoline by calling the
/// helper stub that sits right behind the reserved bytes.
///
/// # Safety
/// `trampoline` must be the address of a symbol emitted by
/// [`declare_trampoline!`](crate::declare_trampoline).
pub(crate) unsafe fn jump_table_base(trampoline: *const c_void) -> *mut u64 {
    let helper = trampoline as usize + TRAMPOLINE_LEN;
    let helper: unsafe extern "C" fn() -> *mut u64 =
        unsafe { std::mem::transmute(helper) };
    unsafe { helper() }
}

/// Reserves a trampoline symbol plus its jump table.
///
/// The declared function starts as `TRAMPOLINE_LEN` breakpoint bytes;
/// `install` later overwrites them with the relocated prologue of the
/// hooked function. The signature given here is the signature callers
/// use to invoke the original behaviour.
///
/// ```ignore
/// declare_trampoline! {
///     fn real_compute(x: i32) -> i32;
/// }
///
/// unsafe {
///     install(
///         compute as usize as *const c_void,
///         compute_replacement as usize as *const c_void,
///         real_compute as usize as *const c_void,
///     )?;
///     let original = real_compute(7);
/// }
/// ```
#[macro_export]
macro_rules! declare_trampoline {
    ($(#[$meta:meta])* $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;) => {
        ::core::arch::global_asm!(
            ::core::concat!(
                ".pushsection .text,\"ax\",@progbits\n",
                ".globl ", ::core::stringify!($name), "\n",
                ".type ", ::core::stringify!($name), ",@function\n",
                ::core::stringify!($name), ":\n",
                " .skip {tramp_len}, 0xcc\n",
                " lea rax, [rip + _J_", ::core::stringify!($name), "]\n",
                " ret\n",
                ".size ", ::core::stringify!($name), ", . - ", ::core::stringify!($name), "\n",
                ".popsection\n",
                ".local _J_", ::core::stringify!($name), "\n",
                ".comm _J_", ::core::stringify!($name), ", {table_len}, 8\n",
            ),
            tramp_len = const $crate::hook::constants::TRAMPOLINE_LEN,
            table_len = const $crate::hook::constants::JUMP_TABLE_LEN,
        );

        unsafe extern "C" {
            $(#[$meta])*
            $vis fn $name($($arg: $ty),*) $(-> $ret)?;
        }
    };
}
