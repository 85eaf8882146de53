use thiserror::Error;

/// Reasons execution can come to a halt without running out of gas.
///
/// Every variant here maps to an "exceptional halt" in the interpreter's
/// external contract (spec §4.4): remaining gas is clamped to zero, and
/// all state changes made during the current call are discarded by the
/// caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    #[error("out of gas")]
    OutOfGas,
    #[error("stack overflow: depth would exceed {0}")]
    StackOverflow(usize),
    #[error("stack underflow")]
    StackUnderflow,
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),
    #[error("invalid jump destination {0}")]
    InvalidJump(usize),
    #[error("call depth {depth} exceeds maximum {max}")]
    CallDepthExceeded { depth: usize, max: usize },
    #[error("contract code size {0} exceeds the maximum")]
    CodeSizeExceeded(usize),
    #[error("state write attempted in a static call")]
    WriteInStaticContext,
    #[error("memory access out of bounds")]
    MemoryOutOfBounds,
    #[error("contract creation at an address that is already occupied")]
    ContractAlreadyExists,
    #[error("init code does not begin with a valid contract prefix")]
    InvalidCodePrefix,
    #[error("state error: {0}")]
    State(String),
}

impl From<state::StateError> for EvmError {
    fn from(err: state::StateError) -> Self {
        EvmError::State(err.to_string())
    }
}

impl EvmError {
    /// Exceptional halts of this kind always consume all remaining gas
    /// (spec §4.4); only `REVERT` returns gas to the caller, and reverts
    /// are not represented as an `EvmError` at all.
    #[must_use]
    pub fn consumes_all_gas(&self) -> bool {
        true
    }
}
