use super::{word_count, PrecompileError, PrecompileOutput};
use sha2::{Digest, Sha256};

const BASE: u64 = 60;
const PER_WORD: u64 = 12;

/// `SHA256` (address `0x02`).
pub fn run(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = BASE + PER_WORD * word_count(input.len());
    if gas_used > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }
    let digest = Sha256::digest(input);
    Ok(PrecompileOutput { gas_used, output: digest.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_empty_input_to_the_well_known_digest() {
        let result = run(&[], 1_000).unwrap();
        assert_eq!(
            hex::encode(result.output),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn gas_scales_with_word_count() {
        let one_word = run(&[0u8; 32], 1_000).unwrap();
        let two_words = run(&[0u8; 33], 1_000).unwrap();
        assert_eq!(one_word.gas_used, BASE + PER_WORD);
        assert_eq!(two_words.gas_used, BASE + PER_WORD * 2);
    }
}
