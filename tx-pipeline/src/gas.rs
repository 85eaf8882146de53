use fork_config::ForkConfig;
use primitives::Transaction;

/// The gas a transaction owes before a single opcode of its payload
/// runs (spec §4.5 step 2): a flat base cost, a creation surcharge from
/// Homestead on, and a per-byte charge for the call data / init code.
#[must_use]
pub fn intrinsic_gas(tx: &Transaction, fork: &ForkConfig) -> u64 {
    let mut gas = fork.tx_base_gas;

    if tx.is_contract_creation() && fork.homestead_rules {
        gas += fork.tx_create_gas;
    }

    for &byte in &tx.payload {
        gas += if byte == 0 { fork.tx_data_zero_gas } else { fork.tx_data_non_zero_gas };
    }

    gas
}

#[cfg(test)]
mod tests {
    use super::*;
    use fork_config::ChainConfig;
    use primitive_types::U256;

    fn tx(to: Option<primitives::Address>, payload: Vec<u8>) -> Transaction {
        Transaction {
            nonce: 0,
            gas_price: U256::zero(),
            gas_limit: 100_000,
            to,
            value: U256::zero(),
            payload,
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        }
    }

    #[test]
    fn plain_call_with_no_data_costs_the_base_fee() {
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, chain.homestead_block);
        let call = tx(Some(primitives::Address::ZERO), Vec::new());
        assert_eq!(intrinsic_gas(&call, &fork), 21_000);
    }

    #[test]
    fn creation_adds_the_surcharge_only_from_homestead_on() {
        let chain = ChainConfig::mainnet();
        let frontier = ForkConfig::for_block(&chain, 0);
        let homestead = ForkConfig::for_block(&chain, chain.homestead_block);
        let create = tx(None, Vec::new());

        assert_eq!(intrinsic_gas(&create, &frontier), 21_000);
        assert_eq!(intrinsic_gas(&create, &homestead), 21_000 + 32_000);
    }

    #[test]
    fn data_bytes_are_charged_by_zero_or_non_zero() {
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, chain.homestead_block);
        let call = tx(Some(primitives::Address::ZERO), vec![0x00, 0x01, 0x00, 0xff]);
        assert_eq!(intrinsic_gas(&call, &fork), 21_000 + 2 * 4 + 2 * 68);
    }
}
