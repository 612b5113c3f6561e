use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Byte sequence is not a valid x86_64 instruction")]
    InvalidInstruction,

    #[error("Unsupported encoding (VEX/EVEX/XOP prefix)")]
    UnsupportedEncoding,

    #[error("Instruction exceeds the 15 byte limit")]
    TooLong,

    #[error("Byte sequence ends mid-instruction")]
    Truncated,
}
