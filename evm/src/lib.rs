//! Stack-machine EVM interpreter (spec §4.4): gas accounting, byte
//! memory, the operand stack, sub-call/contract-creation dispatch,
//! precompiles, and the substate accumulated across a call tree.
//!
//! Generic over the same [`trie::KvStore`] backing as `state` and
//! `trie`, so the interpreter can run directly against an in-memory
//! store in tests or a persistent one in the full node.

mod context;
mod error;
mod gas;
mod interpreter;
mod memory;
mod opcodes;
mod precompiles;
mod stack;
mod substate;

pub use context::{BlockContext, CallContext, CallKind};
pub use error::EvmError;
pub use gas::final_refund;
pub use interpreter::{call, create2_address, create_address, Outcome, MAX_CALL_DEPTH, MAX_CODE_SIZE};
pub use memory::Memory;
pub use opcodes::{ForkFlag, Opcode};
pub use stack::Stack;
pub use substate::Substate;
