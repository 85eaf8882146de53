//! Precompiled contracts (spec §4.4): addressed through the same call
//! interface as ordinary contract code, but implemented natively
//! rather than interpreted.

mod bn128;
mod ecrecover;
mod identity;
mod modexp;
mod ripemd160;
mod sha256;

use fork_config::ForkConfig;
use primitives::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    #[error("precompile ran out of gas")]
    OutOfGas,
    #[error("malformed precompile input")]
    MalformedInput,
}

pub struct PrecompileOutput {
    pub gas_used: u64,
    pub output: Vec<u8>,
}

/// True iff `address` names a precompile active under `fork`.
#[must_use]
pub fn is_precompile(address: &Address, fork: &ForkConfig) -> bool {
    if !address.is_precompile() {
        return false;
    }
    let id = address.as_bytes()[19];
    id <= 4 || (id <= 8 && fork.fork >= fork_config::Fork::Byzantium)
}

/// Dispatch a call to the precompile at `address`, if one is active
/// under `fork`. Returns `None` for any other address.
pub fn execute(
    address: &Address,
    input: &[u8],
    gas_limit: u64,
    fork: &ForkConfig,
) -> Option<Result<PrecompileOutput, PrecompileError>> {
    if !is_precompile(address, fork) {
        return None;
    }
    Some(match address.as_bytes()[19] {
        1 => ecrecover::run(input, gas_limit),
        2 => sha256::run(input, gas_limit),
        3 => ripemd160::run(input, gas_limit),
        4 => identity::run(input, gas_limit),
        5 => modexp::run(input, gas_limit),
        6 => bn128::run_add(input, gas_limit),
        7 => bn128::run_mul(input, gas_limit),
        8 => bn128::run_pairing(input, gas_limit),
        _ => unreachable!("is_precompile already filtered the address range"),
    })
}

/// Number of 32-byte words `input` occupies, rounding up (used by the
/// linear-cost precompiles' `60 + 12*words` style gas formulas).
pub(crate) fn word_count(len: usize) -> u64 {
    ((len + 31) / 32) as u64
}

/// Read a big-endian 32-byte field starting at `offset`, zero-padding
/// past the end of `input` (the convention every EVM precompile's ABI
/// uses for short/missing trailing fields).
pub(crate) fn read_word(input: &[u8], offset: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    let end = (offset + 32).min(input.len());
    if offset < end {
        out[..end - offset].copy_from_slice(&input[offset..end]);
    }
    out
}

pub(crate) fn read_slice(input: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let end = (offset + len).min(input.len());
    if offset < end {
        out[..end - offset].copy_from_slice(&input[offset..end]);
    }
    out
}
