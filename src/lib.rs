//! libdivert
//! Inline function hooking for x86_64 Linux processes.
//!
//! Patches the first bytes of a live function so that every call is
//! diverted to a replacement, and optionally relocates the displaced
//! prologue into a caller-reserved trampoline so the original behaviour
//! stays reachable. Code is committed through `/proc/self/mem`, which
//! sidesteps the write protection of the text segment without touching
//! page permissions.

#[cfg(not(target_arch = "x86_64"))]
compile_error!("Unsupported architecture - only x86_64 supported");

#[cfg(not(target_os = "linux"))]
compile_error!("Unsupported OS - only Linux supported");

pub mod decode;
pub mod ffi;
pub mod hook;
pub mod os;
