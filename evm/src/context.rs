use primitives::{Address, Header};
use primitive_types::U256;

/// The block-level values exposed to the `COINBASE`/`TIMESTAMP`/
/// `NUMBER`/`DIFFICULTY`/`GASLIMIT`/`CHAINID`/`BLOCKHASH` opcodes (spec
/// §4.4). `base_fee` (EIP-1559, London) is out of scope and absent.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    pub header: &'a Header,
    pub chain_id: u64,
}

impl<'a> BlockContext<'a> {
    #[must_use]
    pub fn new(header: &'a Header, chain_id: u64) -> Self {
        Self { header, chain_id }
    }
}

/// Which opcode invoked the current call, distinguishing the few ways
/// `value`, `caller`, and storage context can diverge from a plain
/// top-level message call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2 { salt: U256 },
}

/// One call frame's environment (spec §4.4's `(caller, callee, value,
/// call_data, gas, ...)` contract). `storage_address` is the account
/// whose storage `SLOAD`/`SSTORE` read and write — equal to `address`
/// except under `DELEGATECALL`, where code runs with the caller's
/// storage.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub kind: CallKind,
    pub origin: Address,
    pub caller: Address,
    pub address: Address,
    pub storage_address: Address,
    pub value: U256,
    pub call_data: Vec<u8>,
    pub gas_price: U256,
    pub depth: usize,
    pub is_static: bool,
}

impl CallContext {
    #[must_use]
    pub fn top_level_call(origin: Address, to: Address, value: U256, call_data: Vec<u8>, gas_price: U256) -> Self {
        Self {
            kind: CallKind::Call,
            origin,
            caller: origin,
            address: to,
            storage_address: to,
            value,
            call_data,
            gas_price,
            depth: 0,
            is_static: false,
        }
    }

    #[must_use]
    pub fn top_level_create(origin: Address, new_address: Address, value: U256, init_code: Vec<u8>, gas_price: U256) -> Self {
        Self {
            kind: CallKind::Create,
            origin,
            caller: origin,
            address: new_address,
            storage_address: new_address,
            value,
            call_data: init_code,
            gas_price,
            depth: 0,
            is_static: false,
        }
    }

    #[must_use]
    pub fn child_call(&self, to: Address, value: U256, call_data: Vec<u8>, is_static: bool) -> Self {
        Self {
            kind: CallKind::Call,
            origin: self.origin,
            caller: self.address,
            address: to,
            storage_address: to,
            value,
            call_data,
            gas_price: self.gas_price,
            depth: self.depth + 1,
            is_static: self.is_static || is_static,
        }
    }

    #[must_use]
    pub fn child_delegatecall(&self, code_address: Address, call_data: Vec<u8>) -> Self {
        Self {
            kind: CallKind::DelegateCall,
            origin: self.origin,
            caller: self.caller,
            address: self.address,
            storage_address: self.address,
            value: self.value,
            call_data,
            gas_price: self.gas_price,
            depth: self.depth + 1,
            is_static: self.is_static,
        }
    }

    #[must_use]
    pub fn child_callcode(&self, code_address: Address, value: U256, call_data: Vec<u8>) -> Self {
        let _ = code_address;
        Self {
            kind: CallKind::CallCode,
            origin: self.origin,
            caller: self.address,
            address: self.address,
            storage_address: self.address,
            value,
            call_data,
            gas_price: self.gas_price,
            depth: self.depth + 1,
            is_static: self.is_static,
        }
    }

    #[must_use]
    pub fn child_create(&self, new_address: Address, value: U256, init_code: Vec<u8>, salt: Option<U256>) -> Self {
        Self {
            kind: match salt {
                Some(s) => CallKind::Create2 { salt: s },
                None => CallKind::Create,
            },
            origin: self.origin,
            caller: self.address,
            address: new_address,
            storage_address: new_address,
            value,
            call_data: init_code,
            gas_price: self.gas_price,
            depth: self.depth + 1,
            is_static: self.is_static,
        }
    }
}
