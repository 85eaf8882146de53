use super::{read_slice, read_word, PrecompileError, PrecompileOutput};
use num_bigint::BigUint;
use primitive_types::U256;

const GQUAD_DIVISOR: u64 = 20;

/// `MODEXP` (address `0x05`, Byzantium+ per EIP-198): arbitrary-length
/// big-integer `base^exp % modulus`.
///
/// Input layout: `base_len(32) || exp_len(32) || mod_len(32) || base ||
/// exponent || modulus`. The gas formula here is EIP-198's original
/// (`GQUADDIVISOR = 20`); EIP-2565's cheaper `GQUADDIVISOR = 3` formula
/// is a Berlin change and out of scope.
pub fn run(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    let base_len = length_field(input, 0)?;
    let exp_len = length_field(input, 32)?;
    let mod_len = length_field(input, 64)?;

    let base_start = 96;
    let exp_start = base_start + base_len;
    let mod_start = exp_start + exp_len;

    let base_bytes = read_slice(input, base_start, base_len);
    let exp_bytes = read_slice(input, exp_start, exp_len);
    let mod_bytes = read_slice(input, mod_start, mod_len);

    let gas_used = gas_cost(base_len as u64, mod_len as u64, exp_len as u64, &exp_bytes);
    if gas_used > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }

    let modulus = BigUint::from_bytes_be(&mod_bytes);
    let output = if modulus == BigUint::from(0u8) {
        vec![0u8; mod_len]
    } else {
        let base = BigUint::from_bytes_be(&base_bytes);
        let exponent = BigUint::from_bytes_be(&exp_bytes);
        let result = base.modpow(&exponent, &modulus);
        let mut bytes = result.to_bytes_be();
        if bytes.len() < mod_len {
            let mut padded = vec![0u8; mod_len - bytes.len()];
            padded.append(&mut bytes);
            bytes = padded;
        }
        bytes
    };

    Ok(PrecompileOutput { gas_used, output })
}

fn length_field(input: &[u8], offset: usize) -> Result<usize, PrecompileError> {
    let word = read_word(input, offset);
    let value = U256::from_big_endian(&word);
    // A length this large would never be affordable under any gas
    // limit; reject outright rather than risk an allocation-size
    // overflow converting to `usize`.
    if value > U256::from(u32::MAX) {
        return Err(PrecompileError::MalformedInput);
    }
    Ok(value.as_u64() as usize)
}

fn mult_complexity(x: u64) -> u64 {
    if x <= 64 {
        x * x
    } else if x <= 1024 {
        x * x / 4 + 96 * x - 3072
    } else {
        x * x / 16 + 480 * x - 199_680
    }
}

fn adjusted_exponent_length(exp_len: u64, exp_bytes: &[u8]) -> u64 {
    if exp_len <= 32 {
        let exponent = BigUint::from_bytes_be(exp_bytes);
        if exponent == BigUint::from(0u8) {
            0
        } else {
            exponent.bits() - 1
        }
    } else {
        let head = &exp_bytes[..32.min(exp_bytes.len())];
        let head_value = BigUint::from_bytes_be(head);
        let high_bits = if head_value == BigUint::from(0u8) { 0 } else { head_value.bits() - 1 };
        8 * (exp_len - 32) + high_bits
    }
}

fn gas_cost(base_len: u64, mod_len: u64, exp_len: u64, exp_bytes: &[u8]) -> u64 {
    let complexity = mult_complexity(base_len.max(mod_len));
    let iterations = adjusted_exponent_length(exp_len, exp_bytes).max(1);
    (complexity * iterations) / GQUAD_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_input(base: &[u8], exp: &[u8], modulus: &[u8]) -> Vec<u8> {
        let mut input = Vec::new();
        input.extend_from_slice(&U256::from(base.len()).to_big_endian_vec());
        input.extend_from_slice(&U256::from(exp.len()).to_big_endian_vec());
        input.extend_from_slice(&U256::from(modulus.len()).to_big_endian_vec());
        input.extend_from_slice(base);
        input.extend_from_slice(exp);
        input.extend_from_slice(modulus);
        input
    }

    trait ToBigEndianVec {
        fn to_big_endian_vec(&self) -> [u8; 32];
    }
    impl ToBigEndianVec for U256 {
        fn to_big_endian_vec(&self) -> [u8; 32] {
            let mut out = [0u8; 32];
            self.to_big_endian(&mut out);
            out
        }
    }

    #[test]
    fn computes_small_modular_exponentiation() {
        // 3^5 mod 100 = 243 mod 100 = 43
        let input = encode_input(&[3], &[5], &[100]);
        let result = run(&input, 1_000_000).unwrap();
        assert_eq!(result.output, vec![43]);
    }

    #[test]
    fn zero_modulus_yields_zero_output() {
        let input = encode_input(&[3], &[5], &[0]);
        let result = run(&input, 1_000_000).unwrap();
        assert_eq!(result.output, vec![0]);
    }

    #[test]
    fn insufficient_gas_errors() {
        let input = encode_input(&[3], &[5], &[100]);
        assert_eq!(run(&input, 0), Err(PrecompileError::OutOfGas));
    }
}
