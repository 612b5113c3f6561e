use thiserror::Error;

use crate::decode::DecodeError;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Decode error in prologue: {0}")]
    Decode(#[from] DecodeError),

    #[error("Prologue carries an int3; another tool got here first")]
    DebugBreakpoint,

    #[error("Instruction at prologue offset {0} cannot be relocated")]
    UnsupportedInstruction(usize),

    #[error("Branch destination {0:#x} lands inside the clobbered window")]
    BranchHazard(u64),

    #[error("Trampoline jump table is out of slots")]
    JumpTableFull,

    #[error("Jump-table slot {slot:#x} out of rel32 range from {rip:#x}")]
    SlotOutOfRange { rip: u64, slot: u64 },

    #[error("Overlay capacity exceeded")]
    OverlayFull,

    #[error("Null pointer argument: {0}")]
    NullPointer(&'static str),

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}
