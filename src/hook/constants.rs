/// Length of the jump sequence a hooked function's entry is clobbered
/// with: `movabs rax, imm64; jmp rax`.
pub const INITIAL_JUMP_LEN: usize = 12;

/// Length of a jump sequence in a trampoline body (`FF 25` through a
/// jump-table slot). Differs from [`INITIAL_JUMP_LEN`] since trampoline
/// code must not clobber registers.
pub const JUMP_SLOT_LEN: usize = 6;

/// Worst-case number of bytes destroyed in a hooked function: the entry
/// jump plus the tail of a partially overwritten instruction (maximum
/// instruction length on x86_64 is 15).
pub const CLOBBERED_CODE_LEN: usize = INITIAL_JUMP_LEN + 14;

/// Upper bound on control transfers relocated out of the clobbered
/// window: the shortest branch instruction is 2 bytes, plus the final
/// jump back to the unclobbered part.
pub const MAX_JUMPS: usize = INITIAL_JUMP_LEN / 2 + 1;

/// Size of the code region a trampoline symbol must reserve.
pub const TRAMPOLINE_LEN: usize = CLOBBERED_CODE_LEN + MAX_JUMPS * JUMP_SLOT_LEN;

/// Byte size of a trampoline's jump table (`MAX_JUMPS` 64-bit slots).
pub const JUMP_TABLE_LEN: usize = MAX_JUMPS * 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_sizes() {
        assert_eq!(CLOBBERED_CODE_LEN, 26);
        assert_eq!(MAX_JUMPS, 7);
        assert_eq!(TRAMPOLINE_LEN, 68);
        assert_eq!(JUMP_TABLE_LEN, 56);
    }
}
