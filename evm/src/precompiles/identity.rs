use super::{word_count, PrecompileError, PrecompileOutput};

const BASE: u64 = 15;
const PER_WORD: u64 = 3;

/// `IDENTITY` (address `0x04`): returns its input unchanged.
pub fn run(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = BASE + PER_WORD * word_count(input.len());
    if gas_used > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }
    Ok(PrecompileOutput { gas_used, output: input.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_input() {
        let result = run(b"hello", 1_000).unwrap();
        assert_eq!(result.output, b"hello");
    }
}
