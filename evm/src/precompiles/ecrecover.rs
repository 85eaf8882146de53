use super::{read_word, PrecompileError, PrecompileOutput};
use crypto::{address_from_public_key, recover_public_key, RecoverableSignature};
use primitive_types::U256;
use primitives::Hash;

const GAS: u64 = 3_000;

/// `ECRECOVER` (address `0x01`): recover the signer address from a
/// `(hash, v, r, s)` signature. Per the Yellow Paper, a signature that
/// fails to recover returns empty output rather than erroring — the
/// caller sees a zero address, not a reverted call.
pub fn run(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    if gas_limit < GAS {
        return Err(PrecompileError::OutOfGas);
    }

    let hash = Hash(read_word(input, 0));
    let v = U256::from_big_endian(&read_word(input, 32));
    let r = U256::from_big_endian(&read_word(input, 64));
    let s = U256::from_big_endian(&read_word(input, 96));

    let empty = || PrecompileOutput { gas_used: GAS, output: Vec::new() };

    if v != U256::from(27u64) && v != U256::from(28u64) {
        return Ok(empty());
    }
    if r.is_zero() || s.is_zero() {
        return Ok(empty());
    }
    // secp256k1 group order n; reject malleable signatures with s > n/2? The
    // precompile itself never enforced low-S, only full-range validity.
    let secp256k1_n = U256::from_dec_str(
        "115792089237316195423570985008687907852837564279074904382605163141518161494337",
    )
    .expect("valid decimal literal");
    if r >= secp256k1_n || s >= secp256k1_n {
        return Ok(empty());
    }

    let recovery_id = (v - U256::from(27u64)).as_u64() as u8;
    let signature = RecoverableSignature { recovery_id, r, s };

    match recover_public_key(&hash, &signature) {
        Ok(public_key) => {
            let address = address_from_public_key(&public_key);
            let mut output = vec![0u8; 32];
            output[12..].copy_from_slice(address.as_bytes());
            Ok(PrecompileOutput { gas_used: GAS, output })
        }
        Err(_) => Ok(empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::{public_key_from_secret, sign};

    #[test]
    fn recovers_the_signing_address() {
        let secret = [0x42u8; 32];
        let digest = Hash(crypto::keccak256(b"precompile test").0);
        let signature = sign(&secret, &digest).unwrap();
        let public_key = public_key_from_secret(&secret).unwrap();
        let expected = address_from_public_key(&public_key);

        let mut input = vec![0u8; 128];
        input[0..32].copy_from_slice(&digest.0);
        input[63] = 27 + signature.recovery_id;
        let mut r_bytes = [0u8; 32];
        signature.r.to_big_endian(&mut r_bytes);
        input[64..96].copy_from_slice(&r_bytes);
        let mut s_bytes = [0u8; 32];
        signature.s.to_big_endian(&mut s_bytes);
        input[96..128].copy_from_slice(&s_bytes);

        let result = run(&input, GAS).unwrap();
        assert_eq!(&result.output[12..], expected.as_bytes());
    }

    #[test]
    fn invalid_v_yields_empty_output_not_an_error() {
        let mut input = vec![0u8; 128];
        input[63] = 5;
        let result = run(&input, GAS).unwrap();
        assert!(result.output.is_empty());
    }

    #[test]
    fn insufficient_gas_errors() {
        assert_eq!(run(&[0u8; 128], GAS - 1), Err(PrecompileError::OutOfGas));
    }
}
