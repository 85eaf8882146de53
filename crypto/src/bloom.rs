use primitives::{Bloom, Log};

/// Fold one piece of log data (an emitter address or a topic) into
/// `bloom` (spec §4.6): Keccak the bytes, then set the three bits
/// picked out by the first two bytes of each of its three 16-bit
/// big-endian slices, masked to 11 bits.
pub fn bloom_insert(bloom: &mut Bloom, data: &[u8]) {
    let hash = crate::keccak::keccak256(data);
    for chunk in [0usize, 2, 4] {
        let pair = u16::from_be_bytes([hash.0[chunk], hash.0[chunk + 1]]);
        let index = pair & 0x07ff;
        bloom.set_bit(index);
    }
}

/// The bloom filter for a single log entry: its address folded in, then
/// every topic.
#[must_use]
pub fn bloom_of_log(log: &Log) -> Bloom {
    let mut bloom = Bloom::ZERO;
    bloom_insert(&mut bloom, log.address.as_bytes());
    for topic in &log.topics {
        bloom_insert(&mut bloom, topic.as_bytes());
    }
    bloom
}

/// The OR of every log's bloom filter (spec §4.6: a receipt's or a
/// block's bloom is the union of its constituent logs' bits).
#[must_use]
pub fn bloom_of_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom |= &bloom_of_log(log);
    }
    bloom
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::{Address, Hash};

    #[test]
    fn single_log_bloom_contains_its_own_address_and_topic() {
        let log = Log {
            address: Address([0x11; 20]),
            topics: vec![Hash([0x22; 32])],
            data: Vec::new(),
        };
        let bloom = bloom_of_log(&log);

        let mut reference = Bloom::ZERO;
        bloom_insert(&mut reference, log.address.as_bytes());
        bloom_insert(&mut reference, log.topics[0].as_bytes());
        assert_eq!(bloom, reference);
    }

    #[test]
    fn union_of_logs_matches_bitwise_or_of_individual_blooms() {
        let a = Log { address: Address([1; 20]), topics: vec![], data: vec![] };
        let b = Log { address: Address([2; 20]), topics: vec![Hash([3; 32])], data: vec![] };

        let combined = bloom_of_logs(&[a.clone(), b.clone()]);
        let mut expected = bloom_of_log(&a);
        expected |= &bloom_of_log(&b);
        assert_eq!(combined, expected);
    }
}
