use primitives::{Address, Log};
use std::collections::HashSet;

/// Accumulates across a call and its sub-calls: the self-destruct set,
/// the touched-account set, the gas refund counter, and emitted logs
/// (spec §4.4). Discarded on revert or exceptional halt, merged into
/// the caller's substate on success.
#[derive(Debug, Default, Clone)]
pub struct Substate {
    pub self_destructs: HashSet<Address>,
    pub touched: HashSet<Address>,
    pub refund_counter: u64,
    pub logs: Vec<Log>,
}

impl Substate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a successful child call's substate into this one.
    pub fn merge(&mut self, child: Substate) {
        self.self_destructs.extend(child.self_destructs);
        self.touched.extend(child.touched);
        self.refund_counter += child.refund_counter;
        self.logs.extend(child.logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_combines_all_four_fields() {
        let mut parent = Substate::new();
        parent.touched.insert(Address::ZERO);

        let mut child = Substate::new();
        child.self_destructs.insert(Address([1; 20]));
        child.refund_counter = 100;
        child.logs.push(Log { address: Address::ZERO, topics: vec![], data: vec![] });

        parent.merge(child);
        assert_eq!(parent.touched.len(), 1);
        assert_eq!(parent.self_destructs.len(), 1);
        assert_eq!(parent.refund_counter, 100);
        assert_eq!(parent.logs.len(), 1);
    }
}
