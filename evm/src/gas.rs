//! Gas cost constants and schedules (Yellow Paper Appendix G), trimmed
//! to the Frontier through Constantinople/Petersburg forks this
//! implementation covers and fork-gated through [`ForkConfig`] rather
//! than the EIP-2929 cold/warm access-list model Berlin introduced.

use crate::error::EvmError;
use fork_config::ForkConfig;
use primitive_types::U256;

/// Flat per-opcode costs that never change across the covered fork range.
pub mod costs {
    pub const ZERO: u64 = 0;
    pub const BASE: u64 = 2;
    pub const VERY_LOW: u64 = 3;
    pub const LOW: u64 = 5;
    pub const MID: u64 = 8;
    pub const HIGH: u64 = 10;
    pub const JUMPDEST: u64 = 1;

    pub const SSTORE_SET: u64 = 20_000;
    pub const SSTORE_RESET: u64 = 5_000;
    pub const SSTORE_REFUND_CLEAR: u64 = 15_000;

    pub const CREATE: u64 = 32_000;
    pub const CODE_DEPOSIT_PER_BYTE: u64 = 200;
    pub const CALL_VALUE_TRANSFER: u64 = 9_000;
    pub const CALL_STIPEND: u64 = 2_300;
    pub const NEW_ACCOUNT: u64 = 25_000;

    pub const LOG: u64 = 375;
    pub const LOG_TOPIC: u64 = 375;
    pub const LOG_DATA_BYTE: u64 = 8;

    pub const KECCAK256: u64 = 30;
    pub const KECCAK256_WORD: u64 = 6;
    pub const COPY_WORD: u64 = 3;

    pub const BLOCKHASH: u64 = 20;
    pub const EXP: u64 = 10;

    /// Pre-EIP-150: `SLOAD`, `BALANCE`, `EXTCODESIZE`, `EXTCODECOPY`,
    /// and the `CALL` family's base cost.
    pub const EXT_FRONTIER: u64 = 20;
    pub const SLOAD_FRONTIER: u64 = 50;
    pub const CALL_FRONTIER: u64 = 40;
    pub const SELFDESTRUCT_FRONTIER: u64 = 0;

    /// EIP-150 (Tangerine Whistle) repricing of the above, in response
    /// to the "Shanghai attacks" underpriced I/O-heavy opcodes.
    pub const EXT_TANGERINE: u64 = 700;
    pub const SLOAD_TANGERINE: u64 = 200;
    pub const CALL_TANGERINE: u64 = 700;
    pub const SELFDESTRUCT_TANGERINE: u64 = 5_000;

    /// EIP-160 (Spurious Dragon) repriced `EXP`'s per-byte cost.
    pub const EXP_BYTE_FRONTIER: u64 = 10;
    pub const EXP_BYTE_SPURIOUS: u64 = 50;
}

/// `SLOAD`'s base cost, fork-gated by EIP-150 (spec §4.11).
#[must_use]
pub fn sload_cost(fork: &ForkConfig) -> u64 {
    if fork.eip150_gas_cap { costs::SLOAD_TANGERINE } else { costs::SLOAD_FRONTIER }
}

/// `BALANCE`/`EXTCODESIZE`/`EXTCODECOPY`/`EXTCODEHASH`'s base cost.
#[must_use]
pub fn ext_account_cost(fork: &ForkConfig) -> u64 {
    if fork.eip150_gas_cap { costs::EXT_TANGERINE } else { costs::EXT_FRONTIER }
}

/// The `CALL` family's base cost before value-transfer/new-account surcharges.
#[must_use]
pub fn call_base_cost(fork: &ForkConfig) -> u64 {
    if fork.eip150_gas_cap { costs::CALL_TANGERINE } else { costs::CALL_FRONTIER }
}

/// `SELFDESTRUCT`'s base cost (EIP-150 made it non-free).
#[must_use]
pub fn selfdestruct_base_cost(fork: &ForkConfig) -> u64 {
    if fork.eip150_gas_cap { costs::SELFDESTRUCT_TANGERINE } else { costs::SELFDESTRUCT_FRONTIER }
}

/// `EXP`'s cost: a flat base plus a per-byte charge for the exponent's
/// significant bytes, repriced by EIP-160.
#[must_use]
pub fn exp_gas_cost(exponent: U256, fork: &ForkConfig) -> u64 {
    let bytes = significant_bytes(exponent) as u64;
    let per_byte = if fork.eip150_gas_cap && fork.fork >= fork_config::Fork::SpuriousDragon {
        costs::EXP_BYTE_SPURIOUS
    } else {
        costs::EXP_BYTE_FRONTIER
    };
    costs::EXP + per_byte * bytes
}

fn significant_bytes(value: U256) -> usize {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf.iter().position(|b| *b != 0).map_or(0, |i| 32 - i)
}

/// `KECCAK256`'s cost: a flat base plus a per-word charge for its input.
#[must_use]
pub fn keccak256_gas_cost(word_size: u64) -> u64 {
    costs::KECCAK256 + costs::KECCAK256_WORD * word_size
}

/// `CALLDATACOPY`/`CODECOPY`/`EXTCODECOPY`/`RETURNDATACOPY`'s per-word cost.
#[must_use]
pub fn copy_gas_cost(word_size: u64) -> u64 {
    costs::COPY_WORD * word_size
}

/// `LOG0`..`LOG4`'s cost: a flat base, a per-topic charge, and a
/// per-byte charge for the logged data.
#[must_use]
pub fn log_gas_cost(topic_count: u64, data_len: u64) -> u64 {
    costs::LOG + costs::LOG_TOPIC * topic_count + costs::LOG_DATA_BYTE * data_len
}

/// `SSTORE`'s cost and any refund it schedules, given the slot's value
/// before and after the write. Petersburg's flat ("gross") metering is
/// used uniformly across the whole covered fork range — Constantinople's
/// EIP-1283 net-gas metering was reverted before ever reaching mainnet
/// (see [`fork_config::Fork::Petersburg`]'s doc comment).
#[must_use]
pub fn sstore_cost(current: U256, new: U256) -> (u64, u64) {
    if current.is_zero() && !new.is_zero() {
        (costs::SSTORE_SET, 0)
    } else if !current.is_zero() && new.is_zero() {
        (costs::SSTORE_RESET, costs::SSTORE_REFUND_CLEAR)
    } else {
        (costs::SSTORE_RESET, 0)
    }
}

/// Gas forwarded to a sub-call: the 63/64 rule (EIP-150) caps how much
/// of the remaining gas a `CALL`-family opcode may pass on, so some is
/// always left for the caller to run its own cleanup after the callee
/// returns.
#[must_use]
pub fn capped_call_gas(requested: u64, remaining_after_base: u64, fork: &ForkConfig) -> u64 {
    if fork.eip150_gas_cap {
        let cap = remaining_after_base - remaining_after_base / 64;
        requested.min(cap)
    } else {
        requested.min(remaining_after_base)
    }
}

/// The final gas refund credited to the sender (spec §4.5 step 5):
/// capped at half the gas actually used, regardless of how large the
/// substate's accumulated refund counter grew. EIP-3529's lower cap is
/// a London change, out of scope.
#[must_use]
pub fn final_refund(gas_used: u64, refund_counter: u64) -> u64 {
    (gas_used / 2).min(refund_counter)
}

/// Deduct `amount` from `gas`, turning underflow into [`EvmError::OutOfGas`].
pub fn charge(gas: &mut u64, amount: u64) -> Result<(), EvmError> {
    match gas.checked_sub(amount) {
        Some(remaining) => {
            *gas = remaining;
            Ok(())
        }
        None => {
            *gas = 0;
            Err(EvmError::OutOfGas)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fork_config::ChainConfig;

    #[test]
    fn sload_is_repriced_at_tangerine_whistle() {
        let chain = ChainConfig::mainnet();
        let pre = ForkConfig::for_block(&chain, 0);
        let post = ForkConfig::for_block(&chain, chain.tangerine_whistle_block);
        assert_eq!(sload_cost(&pre), costs::SLOAD_FRONTIER);
        assert_eq!(sload_cost(&post), costs::SLOAD_TANGERINE);
    }

    #[test]
    fn sstore_set_reset_and_refund_match_yellow_paper() {
        assert_eq!(sstore_cost(U256::zero(), U256::from(1u64)), (costs::SSTORE_SET, 0));
        assert_eq!(
            sstore_cost(U256::from(1u64), U256::zero()),
            (costs::SSTORE_RESET, costs::SSTORE_REFUND_CLEAR)
        );
        assert_eq!(sstore_cost(U256::from(1u64), U256::from(2u64)), (costs::SSTORE_RESET, 0));
    }

    #[test]
    fn call_gas_is_capped_to_63_64_post_eip150() {
        let chain = ChainConfig::mainnet();
        let post = ForkConfig::for_block(&chain, chain.tangerine_whistle_block);
        let capped = capped_call_gas(1_000_000, 640, &post);
        assert_eq!(capped, 630);
    }

    #[test]
    fn charge_underflow_zeroes_gas_and_errors() {
        let mut gas = 10u64;
        assert_eq!(charge(&mut gas, 20), Err(EvmError::OutOfGas));
        assert_eq!(gas, 0);
    }

    #[test]
    fn refund_is_capped_at_half_gas_used() {
        assert_eq!(final_refund(100, 1000), 50);
        assert_eq!(final_refund(100, 10), 10);
    }
}
