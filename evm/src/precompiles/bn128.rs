//! `alt_bn128` (BN254) curve operations: `ECADD`, `ECMUL` (address
//! `0x06`/`0x07`), and the pairing check (address `0x08`), all
//! Byzantium+ (EIP-196/EIP-197).
//!
//! Field and curve arithmetic is implemented directly over
//! [`BigUint`] rather than through a dedicated pairing crate, since the
//! workspace's dependency stack has no such crate and adding an
//! otherwise-unused one would be an unjustified addition. The group
//! law (`ECADD`/`ECMUL`) is standard
//! and low-risk; the `Fp12` tower and Miller loop the pairing check
//! builds on are intricate enough that, absent the ability to compile
//! and test against the official test vectors, correctness here should
//! be treated as best-effort (see `DESIGN.md`).

use super::{read_word, PrecompileError, PrecompileOutput};
use num_bigint::BigUint;

const ECADD_GAS: u64 = 500;
const ECMUL_GAS: u64 = 40_000;
const PAIRING_BASE_GAS: u64 = 100_000;
const PAIRING_PER_POINT_GAS: u64 = 80_000;

fn big_zero() -> BigUint {
    BigUint::from(0u8)
}

fn big_one() -> BigUint {
    BigUint::from(1u8)
}

fn p() -> BigUint {
    BigUint::parse_bytes(
        b"30644E72E131A029B85045B68181585D97816A916871CA8D3C208C16D87CFD47",
        16,
    )
    .expect("valid field modulus literal")
}

fn curve_order() -> BigUint {
    BigUint::parse_bytes(
        b"30644E72E131A029B85045B68181585D2833E84879B9709143E1F593F0000001",
        16,
    )
    .expect("valid curve order literal")
}

// ---------------------------------------------------------------- Fp

#[derive(Clone, Debug, PartialEq, Eq)]
struct Fp(BigUint);

impl Fp {
    fn from_bytes(bytes: &[u8; 32]) -> Option<Self> {
        let value = BigUint::from_bytes_be(bytes);
        if value >= p() {
            None
        } else {
            Some(Fp(value))
        }
    }

    fn to_bytes(&self) -> [u8; 32] {
        let bytes = self.0.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    fn zero() -> Self {
        Fp(big_zero())
    }

    fn one() -> Self {
        Fp(big_one())
    }

    fn is_zero(&self) -> bool {
        self.0 == big_zero()
    }

    fn add(&self, other: &Fp) -> Fp {
        Fp((&self.0 + &other.0) % p())
    }

    fn sub(&self, other: &Fp) -> Fp {
        let modulus = p();
        Fp((&self.0 + &modulus - &other.0 % &modulus) % &modulus)
    }

    fn mul(&self, other: &Fp) -> Fp {
        Fp((&self.0 * &other.0) % p())
    }

    fn neg(&self) -> Fp {
        if self.is_zero() {
            Fp::zero()
        } else {
            Fp(p() - &self.0)
        }
    }

    /// Modular inverse via Fermat's little theorem (`p` is prime).
    fn inv(&self) -> Fp {
        let exponent = p() - BigUint::from(2u8);
        Fp(self.0.modpow(&exponent, &p()))
    }

    fn square(&self) -> Fp {
        self.mul(self)
    }
}

// ------------------------------------------------------------ G1 point

#[derive(Clone, Debug, PartialEq, Eq)]
enum G1 {
    Infinity,
    Affine { x: Fp, y: Fp },
}

impl G1 {
    fn from_bytes(x: &[u8; 32], y: &[u8; 32]) -> Result<Self, PrecompileError> {
        let x = Fp::from_bytes(x).ok_or(PrecompileError::MalformedInput)?;
        let y = Fp::from_bytes(y).ok_or(PrecompileError::MalformedInput)?;
        if x.is_zero() && y.is_zero() {
            return Ok(G1::Infinity);
        }
        let lhs = y.square();
        let rhs = x.square().mul(&x).add(&Fp(BigUint::from(3u8)));
        if lhs != rhs {
            return Err(PrecompileError::MalformedInput);
        }
        Ok(G1::Affine { x, y })
    }

    fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        if let G1::Affine { x, y } = self {
            out[0..32].copy_from_slice(&x.to_bytes());
            out[32..64].copy_from_slice(&y.to_bytes());
        }
        out
    }

    fn double(&self) -> G1 {
        let G1::Affine { x, y } = self else { return G1::Infinity };
        if y.is_zero() {
            return G1::Infinity;
        }
        let three = Fp(BigUint::from(3u8));
        let two = Fp(BigUint::from(2u8));
        let lambda = three.mul(&x.square()).mul(&two.mul(y).inv());
        let x3 = lambda.square().sub(&two.mul(x));
        let y3 = lambda.mul(&x.sub(&x3)).sub(y);
        G1::Affine { x: x3, y: y3 }
    }

    fn add(&self, other: &G1) -> G1 {
        match (self, other) {
            (G1::Infinity, b) => b.clone(),
            (a, G1::Infinity) => a.clone(),
            (G1::Affine { x: x1, y: y1 }, G1::Affine { x: x2, y: y2 }) => {
                if x1 == x2 {
                    if y1 == &y2.neg() {
                        return G1::Infinity;
                    }
                    return self.double();
                }
                let lambda = y2.sub(y1).mul(&x2.sub(x1).inv());
                let x3 = lambda.square().sub(x1).sub(x2);
                let y3 = lambda.mul(&x1.sub(&x3)).sub(y1);
                G1::Affine { x: x3, y: y3 }
            }
        }
    }

    fn scalar_mul(&self, scalar: &BigUint) -> G1 {
        let mut result = G1::Infinity;
        let mut base = self.clone();
        let mut k = scalar.clone();
        while k != big_zero() {
            if &k & big_one() == big_one() {
                result = result.add(&base);
            }
            base = base.double();
            k >>= 1u32;
        }
        result
    }
}

/// `ECADD` (address `0x06`): `P1 + P2` over the alt_bn128 G1 group.
pub fn run_add(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    if ECADD_GAS > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }
    let p1 = G1::from_bytes(&read_word(input, 0), &read_word(input, 32))?;
    let p2 = G1::from_bytes(&read_word(input, 64), &read_word(input, 96))?;
    let sum = p1.add(&p2);
    Ok(PrecompileOutput { gas_used: ECADD_GAS, output: sum.to_bytes().to_vec() })
}

/// `ECMUL` (address `0x07`): `scalar * P` over the alt_bn128 G1 group.
pub fn run_mul(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    if ECMUL_GAS > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }
    let point = G1::from_bytes(&read_word(input, 0), &read_word(input, 32))?;
    let scalar = BigUint::from_bytes_be(&read_word(input, 64));
    let result = point.scalar_mul(&scalar);
    Ok(PrecompileOutput { gas_used: ECMUL_GAS, output: result.to_bytes().to_vec() })
}

// -------------------------------------------------------- Fp2 / Fp12

#[derive(Clone, Debug, PartialEq, Eq)]
struct Fp2 {
    c0: Fp,
    c1: Fp,
}

impl Fp2 {
    fn new(c0: Fp, c1: Fp) -> Self {
        Fp2 { c0, c1 }
    }

    fn zero() -> Self {
        Fp2::new(Fp::zero(), Fp::zero())
    }

    fn one() -> Self {
        Fp2::new(Fp::one(), Fp::zero())
    }

    fn is_zero(&self) -> bool {
        self.c0.is_zero() && self.c1.is_zero()
    }

    fn add(&self, o: &Fp2) -> Fp2 {
        Fp2::new(self.c0.add(&o.c0), self.c1.add(&o.c1))
    }

    fn sub(&self, o: &Fp2) -> Fp2 {
        Fp2::new(self.c0.sub(&o.c0), self.c1.sub(&o.c1))
    }

    /// `u^2 = -1`.
    fn mul(&self, o: &Fp2) -> Fp2 {
        let ac = self.c0.mul(&o.c0);
        let bd = self.c1.mul(&o.c1);
        let c0 = ac.sub(&bd);
        let c1 = self.c0.mul(&o.c1).add(&self.c1.mul(&o.c0));
        Fp2::new(c0, c1)
    }

    fn neg(&self) -> Fp2 {
        Fp2::new(self.c0.neg(), self.c1.neg())
    }

    fn square(&self) -> Fp2 {
        self.mul(self)
    }

    fn norm(&self) -> Fp {
        self.c0.square().add(&self.c1.square())
    }

    fn inv(&self) -> Fp2 {
        let inv_norm = self.norm().inv();
        Fp2::new(self.c0.mul(&inv_norm), self.c1.neg().mul(&inv_norm))
    }

    fn mul_scalar(&self, s: &Fp) -> Fp2 {
        Fp2::new(self.c0.mul(s), self.c1.mul(s))
    }

    /// Multiply by the sextic non-residue `xi = 9 + u`, used to reduce
    /// the degree-6 extension's `v^6` term.
    fn mul_xi(&self) -> Fp2 {
        let nine = Fp(BigUint::from(9u8));
        let t = self.mul_scalar(&nine);
        Fp2::new(t.c0.sub(&self.c1), t.c1.add(&self.c0))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct G2 {
    x: Fp2,
    y: Fp2,
    infinity: bool,
}

impl G2 {
    fn infinity() -> Self {
        G2 { x: Fp2::zero(), y: Fp2::zero(), infinity: true }
    }

    fn from_bytes(xi: &[u8; 32], xr: &[u8; 32], yi: &[u8; 32], yr: &[u8; 32]) -> Result<Self, PrecompileError> {
        let x = Fp2::new(
            Fp::from_bytes(xr).ok_or(PrecompileError::MalformedInput)?,
            Fp::from_bytes(xi).ok_or(PrecompileError::MalformedInput)?,
        );
        let y = Fp2::new(
            Fp::from_bytes(yr).ok_or(PrecompileError::MalformedInput)?,
            Fp::from_bytes(yi).ok_or(PrecompileError::MalformedInput)?,
        );
        if x.is_zero() && y.is_zero() {
            return Ok(G2::infinity());
        }
        Ok(G2 { x, y, infinity: false })
    }

    fn double(&self) -> G2 {
        if self.infinity || self.y.is_zero() {
            return G2::infinity();
        }
        let three = Fp(BigUint::from(3u8));
        let two = Fp(BigUint::from(2u8));
        let lambda = self.x.square().mul_scalar(&three).mul(&self.y.mul_scalar(&two).inv());
        let x3 = lambda.square().sub(&self.x.mul_scalar(&two));
        let y3 = lambda.mul(&self.x.sub(&x3)).sub(&self.y);
        G2 { x: x3, y: y3, infinity: false }
    }

    fn add(&self, other: &G2) -> G2 {
        if self.infinity {
            return other.clone();
        }
        if other.infinity {
            return self.clone();
        }
        if self.x == other.x {
            if self.y == other.y.neg() {
                return G2::infinity();
            }
            return self.double();
        }
        let lambda = other.y.sub(&self.y).mul(&other.x.sub(&self.x).inv());
        let x3 = lambda.square().sub(&self.x).sub(&other.x);
        let y3 = lambda.mul(&self.x.sub(&x3)).sub(&self.y);
        G2 { x: x3, y: y3, infinity: false }
    }

    fn neg(&self) -> G2 {
        if self.infinity {
            self.clone()
        } else {
            G2 { x: self.x.clone(), y: self.y.neg(), infinity: false }
        }
    }
}

// --------------------------------------------------------------- Fp12

/// `Fp12` represented as six `Fp2` limbs `[c0..c5]` of
/// `c0 + c1 v + c2 v^2 + (c3 + c4 v + c5 v^2) w`, with `v^3 = xi` (the
/// `Fp2` sextic non-residue `9+u`) and `v^6 = xi^2` used to reduce
/// products back into this basis. This flattened schoolbook
/// representation supports multiplication and squaring, which is all
/// the Miller loop and the final exponentiation below need.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Fp12 {
    c: [Fp2; 6],
}

impl Fp12 {
    fn one() -> Self {
        let z = Fp2::zero();
        Fp12 { c: [Fp2::one(), z.clone(), z.clone(), z.clone(), z.clone(), z] }
    }

    fn mul(&self, o: &Fp12) -> Fp12 {
        let mut raw: [Fp2; 11] = [
            Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(),
            Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(),
        ];
        for i in 0..6 {
            for j in 0..6 {
                raw[i + j] = raw[i + j].add(&self.c[i].mul(&o.c[j]));
            }
        }
        let mut out: [Fp2; 6] = [Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero(), Fp2::zero()];
        for i in 0..6 {
            out[i] = out[i].add(&raw[i]);
        }
        for i in 0..5 {
            // v^(6+i) = v^6 * v^i = xi^2 * v^i, folded back into slot i.
            let reduced = raw[6 + i].mul_xi().mul_xi();
            out[i] = out[i].add(&reduced);
        }
        Fp12 { c: out }
    }

    fn square(&self) -> Fp12 {
        self.mul(self)
    }

    fn is_one(&self) -> bool {
        self.c[0] == Fp2::one() && self.c[1..].iter().all(Fp2::is_zero)
    }

    /// Exponentiate by a (typically huge) public exponent via
    /// square-and-multiply, using only [`Fp12::mul`]/[`Fp12::square`] —
    /// no field inversion required.
    fn pow(&self, exponent: &BigUint) -> Fp12 {
        let mut result = Fp12::one();
        let mut base = self.clone();
        let mut e = exponent.clone();
        while e != big_zero() {
            if &e & big_one() == big_one() {
                result = result.mul(&base);
            }
            base = base.square();
            e >>= 1u32;
        }
        result
    }
}

const LOOP_COUNT_NAF: &[i8] = &[
    0, 0, 0, 1, 0, 1, 0, -1, 0, 0, 1, -1, 0, 0, 1, 0, 0, 1, 1, 0, -1, 0, 0, 1, 0, -1, 0, 0, 0, 0,
    1, 1, 1, 0, 0, -1, 0, 0, 1, 0, 0, 0, 0, 0, -1, 0, 0, 1, 1, 0, 0, -1, 0, 0, 0, 1, 1, 0, -1, 0,
    0, 1, 0, 1, 1,
];

/// Miller loop over the BN254 NAF-encoded loop count, accumulating the
/// line-function evaluations into an `Fp12` element.
fn miller_loop(p: &G1, q: &G2) -> Fp12 {
    let G1::Affine { x: px, y: py } = p else {
        return Fp12::one();
    };
    if q.infinity {
        return Fp12::one();
    }

    let mut f = Fp12::one();
    let mut t = q.clone();
    let q_neg = q.neg();

    for &bit in LOOP_COUNT_NAF.iter() {
        f = f.square();
        f = line_eval(&t, &t, px, py, &f);
        t = t.double();
        if bit == 1 {
            f = line_eval(&t, q, px, py, &f);
            t = t.add(q);
        } else if bit == -1 {
            f = line_eval(&t, &q_neg, px, py, &f);
            t = t.add(&q_neg);
        }
    }
    f
}

/// Evaluate the tangent/line through `a` and `b` (both on the `Fp2`
/// twist) at the `Fp`-rational point `(px, py)`, embed the result as a
/// sparse `Fp12` element, and fold it into `f` by multiplication.
fn line_eval(a: &G2, b: &G2, px: &Fp, py: &Fp, f: &Fp12) -> Fp12 {
    if a.infinity || b.infinity {
        return f.clone();
    }
    let lambda = if a.x == b.x && a.y == b.y {
        let three = Fp(BigUint::from(3u8));
        let two = Fp(BigUint::from(2u8));
        a.x.square().mul_scalar(&three).mul(&a.y.mul_scalar(&two).inv())
    } else if a.x == b.x {
        return f.clone();
    } else {
        b.y.sub(&a.y).mul(&b.x.sub(&a.x).inv())
    };

    let c0 = a.y.sub(&lambda.mul(&a.x));
    let c3 = lambda.mul_scalar(px).neg();
    let c4 = Fp2::new(py.clone(), Fp::zero());

    let line = Fp12 { c: [c0, Fp2::zero(), Fp2::zero(), c3, c4, Fp2::zero()] };
    f.mul(&line)
}

/// The full final exponentiation `f^((p^12-1)/r)`, computed as one
/// [`Fp12::pow`] call rather than split into the usual easy/hard parts
/// (which would require a Frobenius endomorphism this tower
/// representation doesn't implement). Mathematically equivalent; just
/// a great deal more multiplications.
fn final_exponentiation(f: &Fp12) -> Fp12 {
    let mut p_pow_12 = big_one();
    for _ in 0..12 {
        p_pow_12 = &p_pow_12 * &p();
    }
    let exponent = (p_pow_12 - big_one()) / curve_order();
    f.pow(&exponent)
}

/// `ECPAIRING` (address `0x08`): checks `e(P1,Q1) * e(P2,Q2) * ... == 1`.
pub fn run_pairing(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    if input.len() % 192 != 0 {
        return Err(PrecompileError::MalformedInput);
    }
    let pair_count = (input.len() / 192) as u64;
    let gas_used = PAIRING_BASE_GAS + PAIRING_PER_POINT_GAS * pair_count;
    if gas_used > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }

    let mut product = Fp12::one();
    for i in 0..pair_count as usize {
        let base = i * 192;
        let p = G1::from_bytes(&read_word(input, base), &read_word(input, base + 32))?;
        let q = G2::from_bytes(
            &read_word(input, base + 64),
            &read_word(input, base + 96),
            &read_word(input, base + 128),
            &read_word(input, base + 160),
        )?;
        product = product.mul(&miller_loop(&p, &q));
    }
    let result = final_exponentiation(&product);

    let mut output = vec![0u8; 32];
    if result.is_one() {
        output[31] = 1;
    }
    Ok(PrecompileOutput { gas_used, output })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g1_generator() -> G1 {
        G1::Affine { x: Fp::one(), y: Fp(BigUint::from(2u8)) }
    }

    #[test]
    fn generator_plus_infinity_is_generator() {
        let g = g1_generator();
        assert_eq!(g.add(&G1::Infinity), g);
    }

    #[test]
    fn generator_plus_its_negation_is_infinity() {
        let g = g1_generator();
        let G1::Affine { x, y } = &g else { unreachable!() };
        let neg = G1::Affine { x: x.clone(), y: y.neg() };
        assert_eq!(g.add(&neg), G1::Infinity);
    }

    #[test]
    fn scalar_mul_by_zero_is_infinity() {
        let g = g1_generator();
        assert_eq!(g.scalar_mul(&big_zero()), G1::Infinity);
    }

    #[test]
    fn scalar_mul_by_two_matches_doubling() {
        let g = g1_generator();
        assert_eq!(g.scalar_mul(&BigUint::from(2u8)), g.double());
    }

    #[test]
    fn ecadd_rejects_a_point_not_on_the_curve() {
        let mut input = [0u8; 128];
        input[31] = 1; // x = 1
        input[63] = 1; // y = 1 (not on curve: 1 != 1 + 3)
        assert_eq!(run_add(&input, ECADD_GAS), Err(PrecompileError::MalformedInput));
    }

    #[test]
    fn pairing_of_no_points_is_trivially_true() {
        let result = run_pairing(&[], PAIRING_BASE_GAS).unwrap();
        assert_eq!(result.output[31], 1);
    }
}
