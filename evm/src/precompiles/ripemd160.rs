use super::{word_count, PrecompileError, PrecompileOutput};
use ripemd::{Digest, Ripemd160};

const BASE: u64 = 600;
const PER_WORD: u64 = 120;

/// `RIPEMD160` (address `0x03`). The 20-byte digest is left-padded to
/// 32 bytes, matching every other precompile's fixed-width output.
pub fn run(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = BASE + PER_WORD * word_count(input.len());
    if gas_used > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }
    let digest = Ripemd160::digest(input);
    let mut output = vec![0u8; 32];
    output[12..].copy_from_slice(&digest);
    Ok(PrecompileOutput { gas_used, output })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_empty_input_to_the_well_known_digest() {
        let result = run(&[], 10_000).unwrap();
        assert_eq!(hex::encode(&result.output[12..]), "9c1185a5c5e9fc54612808977ee8f548b2258d31");
    }

    #[test]
    fn output_is_left_padded_to_32_bytes() {
        let result = run(b"abc", 10_000).unwrap();
        assert_eq!(result.output.len(), 32);
        assert_eq!(&result.output[..12], &[0u8; 12]);
    }
}
