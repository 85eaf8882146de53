//! The fetch-decode-execute loop (spec §4.4): given a contract's code
//! and a call's environment, runs it to a `Success`, `Revert`, or
//! exceptional `Halt`, dispatching `CALL`-family and `CREATE`-family
//! opcodes back into itself for sub-calls.
//!
//! Call reversion does not use a write-journal — the in-memory arena
//! [`trie::Trie`] isn't structured for one. Instead every call frame
//! clones the whole [`State`] on entry and restores the clone if it
//! doesn't succeed. `call` takes `&mut State<S>` directly rather than
//! going through an async host trait, since this node runs its EVM
//! synchronously and in-process.

use crate::context::{BlockContext, CallContext, CallKind};
use crate::error::EvmError;
use crate::gas::{self, costs};
use crate::memory::{memory_expansion_cost, Memory};
use crate::opcodes::Opcode;
use crate::precompiles::{self, PrecompileError};
use crate::stack::Stack;
use crate::substate::Substate;
use crypto::keccak256;
use fork_config::{Fork, ForkConfig};
use num_bigint::BigUint;
use primitive_types::U256;
use primitives::{Address, Log};
use rlp::{Encodable, Item};
use state::State;
use std::collections::HashSet;
use trie::KvStore;

/// Maximum call-stack depth (Yellow Paper §9.1's `1024`).
pub const MAX_CALL_DEPTH: usize = 1024;
/// EIP-170 (Spurious Dragon): deployed contract code may not exceed this.
pub const MAX_CODE_SIZE: usize = 24_576;

/// The external result of running one call frame (spec §4.4).
pub enum Outcome {
    Success { gas_left: u64, output: Vec<u8>, substate: Substate },
    Revert { gas_left: u64, output: Vec<u8> },
    Halt(EvmError),
}

/// Enter a call (or contract creation), dispatching to a precompile or
/// the bytecode loop as appropriate. `gas` is the gas already set aside
/// for this frame; the caller is responsible for the 63/64 forwarding
/// cap and any balance check before invoking this.
pub fn call<S: KvStore + Clone>(
    state: &mut State<S>,
    block: &BlockContext,
    fork: &ForkConfig,
    ctx: CallContext,
    code: Vec<u8>,
    gas: u64,
) -> Outcome {
    if ctx.depth > MAX_CALL_DEPTH {
        return Outcome::Halt(EvmError::CallDepthExceeded { depth: ctx.depth, max: MAX_CALL_DEPTH });
    }

    if let Some(result) = precompiles::execute(&ctx.address, &ctx.call_data, gas, fork) {
        return match result {
            Ok(out) => Outcome::Success {
                gas_left: gas - out.gas_used,
                output: out.output,
                substate: Substate::new(),
            },
            Err(PrecompileError::OutOfGas) => Outcome::Halt(EvmError::OutOfGas),
            Err(PrecompileError::MalformedInput) => Outcome::Halt(EvmError::OutOfGas),
        };
    }

    let snapshot = state.clone();
    match run_bytecode(state, block, fork, &ctx, &code, gas) {
        Outcome::Success { gas_left, output, substate } => {
            if matches!(ctx.kind, CallKind::Create | CallKind::Create2 { .. }) {
                match finish_creation(state, &ctx, output, gas_left, fork) {
                    Ok((gas_left, address)) => Outcome::Success {
                        gas_left,
                        output: address_to_word(address),
                        substate,
                    },
                    Err(err) => {
                        *state = snapshot;
                        Outcome::Halt(err)
                    }
                }
            } else {
                Outcome::Success { gas_left, output, substate }
            }
        }
        Outcome::Revert { gas_left, output } => {
            *state = snapshot;
            Outcome::Revert { gas_left, output }
        }
        Outcome::Halt(err) => {
            *state = snapshot;
            Outcome::Halt(err)
        }
    }
}

/// Charge the code-deposit fee and install the deployed code, having
/// already run the init code to completion inside [`call`].
fn finish_creation<S: KvStore + Clone>(
    state: &mut State<S>,
    ctx: &CallContext,
    output: Vec<u8>,
    mut gas_left: u64,
    fork: &ForkConfig,
) -> Result<(u64, Address), EvmError> {
    if fork.fork >= Fork::SpuriousDragon && output.len() > MAX_CODE_SIZE {
        return Err(EvmError::CodeSizeExceeded(output.len()));
    }
    let deposit_cost = costs::CODE_DEPOSIT_PER_BYTE * output.len() as u64;
    gas::charge(&mut gas_left, deposit_cost)?;
    state.put_code(ctx.address, output).map_err(EvmError::from)?;
    if fork.homestead_rules {
        // EIP-161: contract accounts begin life at nonce 1.
        let mut account = state.get_account(ctx.address)?.unwrap_or_default();
        account.nonce = 1;
        state.put_account(ctx.address, &account).map_err(EvmError::from)?;
    }
    Ok((gas_left, ctx.address))
}

fn address_to_word(address: Address) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// The address a `CREATE` opcode deploys to: the low 160 bits of
/// `Keccak(RLP([creator, creator_nonce]))` (spec §4.5).
#[must_use]
pub fn create_address(creator: Address, creator_nonce: u64) -> Address {
    let bytes = rlp::encode_struct(vec![
        Item::Bytes(creator.as_bytes().to_vec()),
        creator_nonce.rlp_item(),
    ]);
    let hash = keccak256(&bytes);
    Address::from_slice(&hash.as_bytes()[12..]).expect("keccak output has 20 trailing bytes")
}

/// The address a `CREATE2` opcode deploys to (EIP-1014): `Keccak(0xff
/// ++ creator ++ salt ++ Keccak(init_code))`'s low 160 bits.
#[must_use]
pub fn create2_address(creator: Address, salt: U256, init_code: &[u8]) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(creator.as_bytes());
    let mut salt_bytes = [0u8; 32];
    salt.to_big_endian(&mut salt_bytes);
    preimage.extend_from_slice(&salt_bytes);
    preimage.extend_from_slice(keccak256(init_code).as_bytes());
    let hash = keccak256(&preimage);
    Address::from_slice(&hash.as_bytes()[12..]).expect("keccak output has 20 trailing bytes")
}

struct Frame {
    stack: Stack,
    memory: Memory,
    pc: usize,
    return_data: Vec<u8>,
    substate: Substate,
}

fn valid_jumpdests(code: &[u8]) -> HashSet<usize> {
    let mut set = HashSet::new();
    let mut i = 0;
    while i < code.len() {
        let byte = code[i];
        if byte == Opcode::JumpDest as u8 {
            set.insert(i);
            i += 1;
        } else if let Some(op) = Opcode::from_byte(byte) {
            i += 1 + op.push_size().unwrap_or(0);
        } else {
            i += 1;
        }
    }
    set
}

fn to_usize(value: U256) -> Result<usize, EvmError> {
    if value > U256::from(u32::MAX) {
        return Err(EvmError::OutOfGas);
    }
    Ok(value.as_u32() as usize)
}

fn charge_memory(gas: &mut u64, memory: &Memory, offset: usize, size: usize) -> Result<(), EvmError> {
    if size == 0 {
        return Ok(());
    }
    let old_words = ((memory.len() + 31) / 32) as u64;
    let new_words = Memory::words_for(offset, size) as u64;
    gas::charge(gas, memory_expansion_cost(old_words, new_words))
}

#[allow(clippy::too_many_lines)]
fn run_bytecode<S: KvStore + Clone>(
    state: &mut State<S>,
    block: &BlockContext,
    fork: &ForkConfig,
    ctx: &CallContext,
    code: &[u8],
    mut gas: u64,
) -> Outcome {
    let jumpdests = valid_jumpdests(code);
    let mut frame = Frame {
        stack: Stack::new(),
        memory: Memory::new(),
        pc: 0,
        return_data: Vec::new(),
        substate: Substate::new(),
    };

    macro_rules! bail {
        ($err:expr) => {
            return Outcome::Halt($err)
        };
    }
    macro_rules! try_op {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(err) => bail!(err),
            }
        };
    }

    loop {
        if frame.pc >= code.len() {
            return Outcome::Success { gas_left: gas, output: Vec::new(), substate: frame.substate };
        }
        let byte = code[frame.pc];
        let Some(op) = Opcode::from_byte(byte) else { bail!(EvmError::InvalidOpcode(byte)) };

        if let Some(flag) = op.requires_fork_flag() {
            let enabled = match flag {
                crate::opcodes::ForkFlag::Revert => fork.has_revert,
                crate::opcodes::ForkFlag::StaticCall => fork.has_static_call,
                crate::opcodes::ForkFlag::ReturnData => fork.has_returndata,
                crate::opcodes::ForkFlag::Create2 => fork.has_create2,
                crate::opcodes::ForkFlag::ExtCodeHash => fork.has_ext_code_hash,
            };
            if !enabled {
                bail!(EvmError::InvalidOpcode(byte));
            }
        }
        if ctx.is_static && op.is_state_modifying() {
            bail!(EvmError::WriteInStaticContext);
        }

        match op {
            Opcode::Stop => return Outcome::Success { gas_left: gas, output: Vec::new(), substate: frame.substate },

            Opcode::Add | Opcode::Mul | Opcode::Sub | Opcode::Div | Opcode::SDiv | Opcode::Mod
            | Opcode::SMod | Opcode::Lt | Opcode::Gt | Opcode::SLt | Opcode::SGt | Opcode::Eq
            | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Shl | Opcode::Shr | Opcode::Sar
            | Opcode::Byte | Opcode::SignExtend => {
                let cost = match op {
                    Opcode::Mul | Opcode::Div | Opcode::SDiv | Opcode::Mod | Opcode::SMod | Opcode::SignExtend => {
                        costs::LOW
                    }
                    _ => costs::VERY_LOW,
                };
                try_op!(gas::charge(&mut gas, cost));
                let a = try_op!(frame.stack.pop());
                let b = try_op!(frame.stack.pop());
                let result = binary_op(op, a, b);
                try_op!(frame.stack.push(result));
            }

            Opcode::AddMod | Opcode::MulMod => {
                try_op!(gas::charge(&mut gas, costs::MID));
                let a = try_op!(frame.stack.pop());
                let b = try_op!(frame.stack.pop());
                let m = try_op!(frame.stack.pop());
                let result = if m.is_zero() {
                    U256::zero()
                } else {
                    let a = u256_to_biguint(a);
                    let b = u256_to_biguint(b);
                    let m = u256_to_biguint(m);
                    let r = match op {
                        Opcode::AddMod => (a + b) % m,
                        _ => (a * b) % m,
                    };
                    biguint_to_u256(&r)
                };
                try_op!(frame.stack.push(result));
            }

            Opcode::Exp => {
                let base = try_op!(frame.stack.pop());
                let exponent = try_op!(frame.stack.pop());
                try_op!(gas::charge(&mut gas, gas::exp_gas_cost(exponent, fork)));
                try_op!(frame.stack.push(checked_pow(base, exponent)));
            }

            Opcode::IsZero | Opcode::Not => {
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let a = try_op!(frame.stack.pop());
                let result = if op == Opcode::IsZero {
                    if a.is_zero() { U256::one() } else { U256::zero() }
                } else {
                    !a
                };
                try_op!(frame.stack.push(result));
            }

            Opcode::Keccak256 => {
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                let size = try_op!(to_usize(try_op!(frame.stack.pop())));
                try_op!(charge_memory(&mut gas, &frame.memory, offset, size));
                let words = Memory::words_for(offset, size) as u64;
                try_op!(gas::charge(&mut gas, gas::keccak256_gas_cost(words)));
                let bytes = try_op!(frame.memory.read_bytes(offset, size));
                let hash = keccak256(&bytes);
                try_op!(frame.stack.push(U256::from_big_endian(hash.as_bytes())));
            }

            Opcode::Address => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(address_to_u256(ctx.address)));
            }
            Opcode::Origin => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(address_to_u256(ctx.origin)));
            }
            Opcode::Caller => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(address_to_u256(ctx.caller)));
            }
            Opcode::CallValue => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(ctx.value));
            }
            Opcode::GasPrice => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(ctx.gas_price));
            }
            Opcode::ChainId => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(block.chain_id)));
            }
            Opcode::SelfBalance => {
                try_op!(gas::charge(&mut gas, costs::LOW));
                let balance = try_op!(account_balance(state, ctx.address));
                try_op!(frame.stack.push(balance));
            }

            Opcode::CallDataLoad => {
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                try_op!(frame.stack.push(load_word_padded(&ctx.call_data, offset)));
            }
            Opcode::CallDataSize => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(ctx.call_data.len())));
            }
            Opcode::CallDataCopy => {
                try_op!(copy_to_memory(&mut gas, &mut frame, &ctx.call_data));
            }
            Opcode::CodeSize => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(code.len())));
            }
            Opcode::CodeCopy => {
                try_op!(copy_to_memory(&mut gas, &mut frame, code));
            }
            Opcode::ReturnDataSize => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(frame.return_data.len())));
            }
            Opcode::ReturnDataCopy => {
                let dest = try_op!(to_usize(try_op!(frame.stack.pop())));
                let src = try_op!(to_usize(try_op!(frame.stack.pop())));
                let size = try_op!(to_usize(try_op!(frame.stack.pop())));
                if src.saturating_add(size) > frame.return_data.len() {
                    bail!(EvmError::MemoryOutOfBounds);
                }
                try_op!(charge_memory(&mut gas, &frame.memory, dest, size));
                try_op!(gas::charge(&mut gas, gas::copy_gas_cost(Memory::words_for(0, size) as u64)));
                let data = frame.return_data[src..src + size].to_vec();
                try_op!(frame.memory.write_bytes(dest, &data));
            }

            Opcode::Balance => {
                try_op!(gas::charge(&mut gas, gas::ext_account_cost(fork)));
                let addr = try_op!(pop_address(&mut frame.stack));
                state.mark_touched(addr);
                let balance = try_op!(account_balance(state, addr));
                try_op!(frame.stack.push(balance));
            }
            Opcode::ExtCodeSize => {
                try_op!(gas::charge(&mut gas, gas::ext_account_cost(fork)));
                let addr = try_op!(pop_address(&mut frame.stack));
                state.mark_touched(addr);
                let len = try_op!(account_code(state, addr)).len();
                try_op!(frame.stack.push(U256::from(len)));
            }
            Opcode::ExtCodeHash => {
                try_op!(gas::charge(&mut gas, gas::ext_account_cost(fork)));
                let addr = try_op!(pop_address(&mut frame.stack));
                state.mark_touched(addr);
                let hash = match try_op!(state.get_account(addr).map_err(EvmError::from)) {
                    Some(account) if !account.is_empty() => U256::from_big_endian(account.code_hash.as_bytes()),
                    _ => U256::zero(),
                };
                try_op!(frame.stack.push(hash));
            }
            Opcode::ExtCodeCopy => {
                try_op!(gas::charge(&mut gas, gas::ext_account_cost(fork)));
                let addr = try_op!(pop_address(&mut frame.stack));
                state.mark_touched(addr);
                let ext_code = try_op!(account_code(state, addr));
                try_op!(copy_to_memory(&mut gas, &mut frame, &ext_code));
            }

            Opcode::BlockHash => {
                try_op!(gas::charge(&mut gas, costs::BLOCKHASH));
                let _number = try_op!(frame.stack.pop());
                // Ancestor lookup requires a block-hash oracle this
                // crate has no handle to; callers needing BLOCKHASH
                // results must supply one through a future extension.
                try_op!(frame.stack.push(U256::zero()));
            }
            Opcode::Coinbase => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(address_to_u256(block.header.beneficiary)));
            }
            Opcode::Timestamp => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(block.header.timestamp)));
            }
            Opcode::Number => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(block.header.number)));
            }
            Opcode::Difficulty => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(block.header.difficulty));
            }
            Opcode::GasLimit => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(block.header.gas_limit)));
            }

            Opcode::Pop => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.pop());
            }
            Opcode::MLoad => {
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                try_op!(charge_memory(&mut gas, &frame.memory, offset, 32));
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let word = try_op!(frame.memory.read_word(offset));
                try_op!(frame.stack.push(U256::from_big_endian(&word)));
            }
            Opcode::MStore => {
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                let value = try_op!(frame.stack.pop());
                try_op!(charge_memory(&mut gas, &frame.memory, offset, 32));
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let mut bytes = [0u8; 32];
                value.to_big_endian(&mut bytes);
                try_op!(frame.memory.write_word(offset, &bytes));
            }
            Opcode::MStore8 => {
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                let value = try_op!(frame.stack.pop());
                try_op!(charge_memory(&mut gas, &frame.memory, offset, 1));
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                try_op!(frame.memory.write_byte(offset, value.byte(0)));
            }
            Opcode::MSize => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(frame.memory.len())));
            }

            Opcode::SLoad => {
                try_op!(gas::charge(&mut gas, gas::sload_cost(fork)));
                let key = try_op!(frame.stack.pop());
                let value = try_op!(state.get_storage(ctx.storage_address, key).map_err(EvmError::from));
                try_op!(frame.stack.push(value));
            }
            Opcode::SStore => {
                let key = try_op!(frame.stack.pop());
                let new_value = try_op!(frame.stack.pop());
                let current = try_op!(state.get_storage(ctx.storage_address, key).map_err(EvmError::from));
                let (cost, refund) = gas::sstore_cost(current, new_value);
                try_op!(gas::charge(&mut gas, cost));
                frame.substate.refund_counter += refund;
                try_op!(state.put_storage(ctx.storage_address, key, new_value).map_err(EvmError::from));
            }

            Opcode::Jump => {
                try_op!(gas::charge(&mut gas, costs::MID));
                let dest = try_op!(to_usize(try_op!(frame.stack.pop())));
                if !jumpdests.contains(&dest) {
                    bail!(EvmError::InvalidJump(dest));
                }
                frame.pc = dest;
                continue;
            }
            Opcode::JumpI => {
                try_op!(gas::charge(&mut gas, costs::HIGH));
                let dest = try_op!(to_usize(try_op!(frame.stack.pop())));
                let cond = try_op!(frame.stack.pop());
                if !cond.is_zero() {
                    if !jumpdests.contains(&dest) {
                        bail!(EvmError::InvalidJump(dest));
                    }
                    frame.pc = dest;
                    continue;
                }
            }
            Opcode::Pc => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(frame.pc)));
            }
            Opcode::Gas => {
                try_op!(gas::charge(&mut gas, costs::BASE));
                try_op!(frame.stack.push(U256::from(gas)));
            }
            Opcode::JumpDest => {
                try_op!(gas::charge(&mut gas, costs::JUMPDEST));
            }

            Opcode::Push1 | Opcode::Push2 | Opcode::Push3 | Opcode::Push4 | Opcode::Push5
            | Opcode::Push6 | Opcode::Push7 | Opcode::Push8 | Opcode::Push9 | Opcode::Push10
            | Opcode::Push11 | Opcode::Push12 | Opcode::Push13 | Opcode::Push14 | Opcode::Push15
            | Opcode::Push16 | Opcode::Push17 | Opcode::Push18 | Opcode::Push19 | Opcode::Push20
            | Opcode::Push21 | Opcode::Push22 | Opcode::Push23 | Opcode::Push24 | Opcode::Push25
            | Opcode::Push26 | Opcode::Push27 | Opcode::Push28 | Opcode::Push29 | Opcode::Push30
            | Opcode::Push31 | Opcode::Push32 => {
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let n = op.push_size().expect("push opcode has a push size");
                let value = load_word_padded_n(code, frame.pc + 1, n);
                try_op!(frame.stack.push(value));
                frame.pc += 1 + n;
                continue;
            }

            Opcode::Dup1 | Opcode::Dup2 | Opcode::Dup3 | Opcode::Dup4 | Opcode::Dup5
            | Opcode::Dup6 | Opcode::Dup7 | Opcode::Dup8 | Opcode::Dup9 | Opcode::Dup10
            | Opcode::Dup11 | Opcode::Dup12 | Opcode::Dup13 | Opcode::Dup14 | Opcode::Dup15
            | Opcode::Dup16 => {
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let n = (op as u8 - Opcode::Dup1 as u8) as usize + 1;
                try_op!(frame.stack.dup(n));
            }
            Opcode::Swap1 | Opcode::Swap2 | Opcode::Swap3 | Opcode::Swap4 | Opcode::Swap5
            | Opcode::Swap6 | Opcode::Swap7 | Opcode::Swap8 | Opcode::Swap9 | Opcode::Swap10
            | Opcode::Swap11 | Opcode::Swap12 | Opcode::Swap13 | Opcode::Swap14 | Opcode::Swap15
            | Opcode::Swap16 => {
                try_op!(gas::charge(&mut gas, costs::VERY_LOW));
                let n = (op as u8 - Opcode::Swap1 as u8) as usize + 1;
                try_op!(frame.stack.swap(n));
            }

            Opcode::Log0 | Opcode::Log1 | Opcode::Log2 | Opcode::Log3 | Opcode::Log4 => {
                let topic_count = (op as u8 - Opcode::Log0 as u8) as usize;
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                let size = try_op!(to_usize(try_op!(frame.stack.pop())));
                let mut topics = Vec::with_capacity(topic_count);
                for _ in 0..topic_count {
                    let t = try_op!(frame.stack.pop());
                    let mut bytes = [0u8; 32];
                    t.to_big_endian(&mut bytes);
                    topics.push(primitives::Hash(bytes));
                }
                try_op!(charge_memory(&mut gas, &frame.memory, offset, size));
                try_op!(gas::charge(&mut gas, gas::log_gas_cost(topic_count as u64, size as u64)));
                let data = try_op!(frame.memory.read_bytes(offset, size));
                frame.substate.logs.push(Log { address: ctx.address, topics, data });
            }

            Opcode::Return | Opcode::Revert => {
                let offset = try_op!(to_usize(try_op!(frame.stack.pop())));
                let size = try_op!(to_usize(try_op!(frame.stack.pop())));
                try_op!(charge_memory(&mut gas, &frame.memory, offset, size));
                let output = try_op!(frame.memory.read_bytes(offset, size));
                return if op == Opcode::Return {
                    Outcome::Success { gas_left: gas, output, substate: frame.substate }
                } else {
                    Outcome::Revert { gas_left: gas, output }
                };
            }
            Opcode::Invalid => bail!(EvmError::InvalidOpcode(byte)),

            Opcode::SelfDestruct => {
                try_op!(gas::charge(&mut gas, gas::selfdestruct_base_cost(fork)));
                let beneficiary = try_op!(pop_address(&mut frame.stack));
                let balance = try_op!(account_balance(state, ctx.address));
                if fork.eip150_gas_cap
                    && !balance.is_zero()
                    && try_op!(state.get_account(beneficiary).map_err(EvmError::from)).is_none()
                {
                    try_op!(gas::charge(&mut gas, costs::NEW_ACCOUNT));
                }
                try_op!(state.add_balance(beneficiary, balance).map_err(EvmError::from));
                try_op!(state.sub_balance(ctx.address, balance).map_err(EvmError::from));
                frame.substate.self_destructs.insert(ctx.address);
                frame.substate.touched.insert(beneficiary);
                return Outcome::Success { gas_left: gas, output: Vec::new(), substate: frame.substate };
            }

            Opcode::Call | Opcode::CallCode | Opcode::DelegateCall | Opcode::StaticCall => {
                match dispatch_call(state, block, fork, ctx, &mut frame, op, &mut gas) {
                    Ok(()) => {}
                    Err(err) => bail!(err),
                }
            }

            Opcode::Create | Opcode::Create2 => {
                match dispatch_create(state, block, fork, ctx, &mut frame, op, &mut gas) {
                    Ok(()) => {}
                    Err(err) => bail!(err),
                }
            }
        }

        frame.pc += 1;
    }
}

fn binary_op(op: Opcode, a: U256, b: U256) -> U256 {
    match op {
        Opcode::Add => a.overflowing_add(b).0,
        Opcode::Mul => a.overflowing_mul(b).0,
        Opcode::Sub => a.overflowing_sub(b).0,
        Opcode::Div => if b.is_zero() { U256::zero() } else { a / b },
        Opcode::SDiv => signed_div(a, b),
        Opcode::Mod => if b.is_zero() { U256::zero() } else { a % b },
        Opcode::SMod => signed_mod(a, b),
        Opcode::Lt => bool_to_u256(a < b),
        Opcode::Gt => bool_to_u256(a > b),
        Opcode::SLt => bool_to_u256(signed_cmp(a, b) == std::cmp::Ordering::Less),
        Opcode::SGt => bool_to_u256(signed_cmp(a, b) == std::cmp::Ordering::Greater),
        Opcode::Eq => bool_to_u256(a == b),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::Byte => byte_op(a, b),
        Opcode::Shl => if a >= U256::from(256u64) { U256::zero() } else { b << (a.as_u32() as usize) },
        Opcode::Shr => if a >= U256::from(256u64) { U256::zero() } else { b >> (a.as_u32() as usize) },
        Opcode::Sar => arithmetic_shift_right(a, b),
        Opcode::SignExtend => sign_extend(a, b),
        _ => unreachable!("binary_op called with a non-binary opcode"),
    }
}

fn bool_to_u256(value: bool) -> U256 {
    if value { U256::one() } else { U256::zero() }
}

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn signed_cmp(a: U256, b: U256) -> std::cmp::Ordering {
    match (is_negative(a), is_negative(b)) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.cmp(&b),
    }
}

fn signed_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let (a_neg, a_mag) = if is_negative(a) { (true, negate(a)) } else { (false, a) };
    let (b_neg, b_mag) = if is_negative(b) { (true, negate(b)) } else { (false, b) };
    let quotient = a_mag / b_mag;
    if a_neg != b_neg { negate(quotient) } else { quotient }
}

fn signed_mod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let (a_neg, a_mag) = if is_negative(a) { (true, negate(a)) } else { (false, a) };
    let b_mag = if is_negative(b) { negate(b) } else { b };
    let remainder = a_mag % b_mag;
    if a_neg { negate(remainder) } else { remainder }
}

fn byte_op(index: U256, value: U256) -> U256 {
    if index >= U256::from(32u64) {
        return U256::zero();
    }
    let i = index.as_u32();
    U256::from(value.byte(31 - i as usize))
}

fn arithmetic_shift_right(shift: U256, value: U256) -> U256 {
    if is_negative(value) {
        if shift >= U256::from(256u64) {
            U256::MAX
        } else {
            let shift = shift.as_u32() as usize;
            let shifted = value >> shift;
            let mask = U256::MAX << (256 - shift.min(256));
            shifted | mask
        }
    } else if shift >= U256::from(256u64) {
        U256::zero()
    } else {
        value >> (shift.as_u32() as usize)
    }
}

fn sign_extend(byte_index: U256, value: U256) -> U256 {
    if byte_index >= U256::from(31u64) {
        return value;
    }
    let i = byte_index.as_u32() as usize;
    let bit = i * 8 + 7;
    if value.bit(bit) {
        value | (U256::MAX << (bit + 1))
    } else {
        value & ((U256::one() << (bit + 1)) - U256::one())
    }
}

fn u256_to_biguint(value: U256) -> BigUint {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

fn biguint_to_u256(value: &BigUint) -> U256 {
    let bytes = value.to_bytes_be();
    let mut buf = [0u8; 32];
    let start = 32usize.saturating_sub(bytes.len());
    buf[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(32)..]);
    U256::from_big_endian(&buf)
}

fn checked_pow(base: U256, exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;
    let mut exp = exponent;
    while !exp.is_zero() {
        if exp.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        base = base.overflowing_mul(base).0;
        exp >>= 1usize;
    }
    result
}

fn address_to_u256(address: Address) -> U256 {
    U256::from_big_endian(&{
        let mut buf = [0u8; 32];
        buf[12..].copy_from_slice(address.as_bytes());
        buf
    })
}

fn pop_address(stack: &mut Stack) -> Result<Address, EvmError> {
    let value = stack.pop()?;
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    Ok(Address::from_slice(&buf[12..]).expect("low 20 bytes of a 32-byte buffer"))
}

fn load_word_padded(data: &[u8], offset: usize) -> U256 {
    load_word_padded_n(data, offset, 32)
}

fn load_word_padded_n(data: &[u8], offset: usize, n: usize) -> U256 {
    let mut buf = [0u8; 32];
    for i in 0..n {
        if let Some(&byte) = data.get(offset + i) {
            buf[32 - n + i] = byte;
        }
    }
    U256::from_big_endian(&buf)
}

fn copy_to_memory(gas: &mut u64, frame: &mut Frame, source: &[u8]) -> Result<(), EvmError> {
    let dest_offset = to_usize(frame.stack.pop()?)?;
    let src_offset = to_usize(frame.stack.pop()?)?;
    let size = to_usize(frame.stack.pop()?)?;
    charge_memory(gas, &frame.memory, dest_offset, size)?;
    gas::charge(gas, gas::copy_gas_cost(Memory::words_for(0, size) as u64))?;
    frame.memory.copy_from(dest_offset, source, src_offset, size)
}

fn account_balance<S: KvStore + Clone>(state: &State<S>, address: Address) -> Result<U256, EvmError> {
    Ok(state.get_account(address)?.map_or(U256::zero(), |a| a.balance))
}

fn account_code<S: KvStore + Clone>(state: &State<S>, address: Address) -> Result<Vec<u8>, EvmError> {
    match state.get_account(address)? {
        Some(account) => Ok(state.get_code(account.code_hash).unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch_call<S: KvStore + Clone>(
    state: &mut State<S>,
    block: &BlockContext,
    fork: &ForkConfig,
    ctx: &CallContext,
    frame: &mut Frame,
    op: Opcode,
    gas: &mut u64,
) -> Result<(), EvmError> {
    let gas_requested = to_usize(frame.stack.pop()?)? as u64;
    let target = pop_address(&mut frame.stack)?;
    state.mark_touched(target);
    let value = if op == Opcode::Call || op == Opcode::CallCode { frame.stack.pop()? } else { U256::zero() };
    let args_offset = to_usize(frame.stack.pop()?)?;
    let args_size = to_usize(frame.stack.pop()?)?;
    let ret_offset = to_usize(frame.stack.pop()?)?;
    let ret_size = to_usize(frame.stack.pop()?)?;

    if op == Opcode::Call && ctx.is_static && !value.is_zero() {
        return Err(EvmError::WriteInStaticContext);
    }

    gas::charge(gas, gas::call_base_cost(fork))?;
    charge_memory(gas, &frame.memory, args_offset, args_size)?;
    charge_memory(gas, &frame.memory, ret_offset, ret_size)?;

    let exists = state.get_account(target)?.is_some();
    if op == Opcode::Call && !value.is_zero() && !exists {
        gas::charge(gas, costs::NEW_ACCOUNT)?;
    }
    if !value.is_zero() {
        gas::charge(gas, costs::CALL_VALUE_TRANSFER)?;
    }

    let call_data = frame.memory.read_bytes(args_offset, args_size)?;
    let forwarded = gas::capped_call_gas(gas_requested, *gas, fork);
    let stipend = if !value.is_zero() { costs::CALL_STIPEND } else { 0 };

    let child_ctx = match op {
        Opcode::Call => ctx.child_call(target, value, call_data, false),
        Opcode::StaticCall => ctx.child_call(target, value, call_data, true),
        Opcode::DelegateCall => ctx.child_delegatecall(target, call_data),
        Opcode::CallCode => ctx.child_callcode(target, value, call_data),
        _ => unreachable!("dispatch_call only handles the CALL family"),
    };

    let sufficient_balance = op != Opcode::Call && op != Opcode::CallCode
        || account_balance(state, ctx.address)? >= value;

    if !sufficient_balance {
        frame.stack.push(U256::zero())?;
        return Ok(());
    }

    gas::charge(gas, forwarded)?;
    if matches!(op, Opcode::Call | Opcode::CallCode) && !value.is_zero() {
        state.sub_balance(ctx.address, value)?;
        state.add_balance(target, value)?;
    }

    let code = account_code(state, if op == Opcode::DelegateCall { ctx.address } else { target })?;
    match call(state, block, fork, child_ctx, code, forwarded + stipend) {
        Outcome::Success { gas_left, output, substate } => {
            *gas += gas_left;
            frame.substate.merge(substate);
            frame.memory.write_bytes(ret_offset, &truncate(&output, ret_size))?;
            frame.return_data = output;
            frame.stack.push(U256::one())?;
        }
        Outcome::Revert { gas_left, output } => {
            *gas += gas_left;
            frame.memory.write_bytes(ret_offset, &truncate(&output, ret_size))?;
            frame.return_data = output;
            frame.stack.push(U256::zero())?;
        }
        Outcome::Halt(_) => {
            frame.return_data = Vec::new();
            frame.stack.push(U256::zero())?;
        }
    }
    Ok(())
}

fn truncate(data: &[u8], size: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    out.truncate(size);
    out.resize(size, 0);
    out
}

fn dispatch_create<S: KvStore + Clone>(
    state: &mut State<S>,
    block: &BlockContext,
    fork: &ForkConfig,
    ctx: &CallContext,
    frame: &mut Frame,
    op: Opcode,
    gas: &mut u64,
) -> Result<(), EvmError> {
    let value = frame.stack.pop()?;
    let offset = to_usize(frame.stack.pop()?)?;
    let size = to_usize(frame.stack.pop()?)?;
    let salt = if op == Opcode::Create2 { Some(frame.stack.pop()?) } else { None };

    gas::charge(gas, costs::CREATE)?;
    charge_memory(gas, &frame.memory, offset, size)?;
    let init_code = frame.memory.read_bytes(offset, size)?;
    if let Some(salt) = salt {
        let words = Memory::words_for(0, init_code.len()) as u64;
        gas::charge(gas, gas::keccak256_gas_cost(words))?;
        let _ = salt;
    }

    if account_balance(state, ctx.address)? < value {
        frame.stack.push(U256::zero())?;
        return Ok(());
    }

    let creator_nonce = state.get_account(ctx.address)?.unwrap_or_default().nonce;
    let new_address = match salt {
        Some(salt) => create2_address(ctx.address, salt, &init_code),
        None => create_address(ctx.address, creator_nonce),
    };
    if let Some(existing) = state.get_account(new_address)? {
        if existing.has_code() || existing.nonce != 0 {
            frame.stack.push(U256::zero())?;
            return Ok(());
        }
    }

    let mut creator_account = state.get_account(ctx.address)?.unwrap_or_default();
    creator_account.nonce += 1;
    state.put_account(ctx.address, &creator_account)?;

    let forwarded = gas::capped_call_gas(*gas, *gas, fork);
    gas::charge(gas, forwarded)?;
    if !value.is_zero() {
        state.sub_balance(ctx.address, value)?;
        state.add_balance(new_address, value)?;
    }

    let child_ctx = ctx.child_create(new_address, value, Vec::new(), salt);
    match call(state, block, fork, child_ctx, init_code, forwarded) {
        Outcome::Success { gas_left, output, substate } => {
            *gas += gas_left;
            frame.substate.merge(substate);
            frame.stack.push(address_to_u256(new_address))?;
            let _ = output;
        }
        Outcome::Revert { gas_left, output } => {
            *gas += gas_left;
            frame.return_data = output;
            frame.stack.push(U256::zero())?;
        }
        Outcome::Halt(_) => {
            frame.stack.push(U256::zero())?;
        }
    }
    Ok(())
}
