use crate::error::TxError;
use crate::gas::intrinsic_gas;
use crate::sender::recover_sender;
use evm::{self, BlockContext, CallContext, Outcome};
use fork_config::ForkConfig;
use primitive_types::U256;
use primitives::{PostState, Receipt, Transaction};
use state::State;
use trie::KvStore;

/// What running one transaction against a state produced (spec §4.5
/// steps 6-8): the receipt to fold into the block's receipt trie, and
/// the gas actually spent, which the caller adds to the block's running
/// total before validating the next transaction's gas limit.
pub struct Applied {
    pub receipt: Receipt,
    pub gas_used: u64,
}

/// Run one already-validated transaction to completion (spec §4.5
/// steps 3-8).
///
/// The upfront gas charge and the sender's nonce increment happen
/// before any snapshot is taken, so an exceptional halt or revert later
/// in the call can only roll back the value transfer and the callee's
/// state — never the fact that this nonce was consumed and this gas was
/// paid for, matching how a `CALL`/`CREATE` opcode's own caller-side
/// balance check and forwarding precede the sub-call it dispatches into.
pub fn apply_transaction<S: KvStore + Clone>(
    state: &mut State<S>,
    block: &BlockContext,
    fork: &ForkConfig,
    tx: &Transaction,
    cumulative_gas_used: u64,
) -> Result<Applied, TxError> {
    let sender = recover_sender(tx, fork)?;
    let original_nonce = tx.nonce;

    let upfront_gas_cost = U256::from(tx.gas_limit).saturating_mul(tx.gas_price);
    state.sub_balance(sender, upfront_gas_cost)?;
    state.increment_nonce(sender)?;
    state.mark_touched(sender);

    let intrinsic = intrinsic_gas(tx, fork);
    let gas_after_intrinsic = tx.gas_limit - intrinsic;

    let recipient = match tx.to {
        Some(to) => to,
        None => evm::create_address(sender, original_nonce),
    };

    state.sub_balance(sender, tx.value)?;
    state.add_balance(recipient, tx.value)?;
    state.mark_touched(recipient);

    let ctx = if tx.is_contract_creation() {
        CallContext::top_level_create(sender, recipient, tx.value, tx.payload.clone(), tx.gas_price)
    } else {
        CallContext::top_level_call(sender, recipient, tx.value, tx.payload.clone(), tx.gas_price)
    };
    let code = if tx.is_contract_creation() {
        tx.payload.clone()
    } else {
        match state.get_account(recipient)? {
            Some(account) => state.get_code(account.code_hash).unwrap_or_default(),
            None => Vec::new(),
        }
    };

    let outcome = evm::call(state, block, fork, ctx, code, gas_after_intrinsic);

    let (gas_left, logs, gas_used, succeeded) = match outcome {
        Outcome::Success { gas_left, substate, .. } => {
            for address in &substate.self_destructs {
                state.del_account(*address)?;
            }
            for address in &substate.touched {
                state.mark_touched(*address);
            }
            let gas_used_before_refund = tx.gas_limit - gas_left;
            let refund = evm::final_refund(gas_used_before_refund, substate.refund_counter);
            let gas_used = gas_used_before_refund - refund;
            (gas_left + refund, substate.logs, gas_used, true)
        }
        Outcome::Revert { gas_left, .. } => (gas_left, Vec::new(), tx.gas_limit - gas_left, false),
        Outcome::Halt(_) => (0, Vec::new(), tx.gas_limit, false),
    };

    state.add_balance(sender, U256::from(gas_left).saturating_mul(tx.gas_price))?;
    let block_author = block.header.beneficiary;
    state.add_balance(block_author, U256::from(gas_used).saturating_mul(tx.gas_price))?;
    state.mark_touched(block_author);

    state.clean_touched_accounts(fork)?;

    let bloom = crypto::bloom_of_logs(&logs);
    let post_state = if fork.byzantium_receipt_status {
        PostState::Status(succeeded)
    } else {
        PostState::Root(state.commit()?)
    };

    let receipt = Receipt {
        post_state,
        cumulative_gas_used: cumulative_gas_used + gas_used,
        bloom,
        logs,
    };

    Ok(Applied { receipt, gas_used })
}
