use std::fmt;
use std::ops::BitOrAssign;

/// A 2048-bit logs bloom filter (spec §3, §4.6).
///
/// Construction from a log entry lives in `crypto` (it needs Keccak);
/// this type only carries the bit vector, single-bit access, and the
/// boolean-OR merge every block header and receipt relies on.
#[derive(Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bloom(#[serde(with = "serde_bytes_256")] pub [u8; 256]);

impl Bloom {
    pub const ZERO: Self = Self([0u8; 256]);

    #[must_use]
    pub const fn new(bytes: [u8; 256]) -> Self {
        Self(bytes)
    }

    /// Set the bit at `index` (0..2048).
    pub fn set_bit(&mut self, index: u16) {
        let byte = (index / 8) as usize;
        let bit = 7 - (index % 8);
        self.0[byte] |= 1 << bit;
    }

    /// True iff the bit at `index` is set.
    #[must_use]
    pub fn bit(&self, index: u16) -> bool {
        let byte = (index / 8) as usize;
        let bit = 7 - (index % 8);
        self.0[byte] & (1 << bit) != 0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl BitOrAssign<&Bloom> for Bloom {
    fn bitor_assign(&mut self, rhs: &Bloom) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a |= b;
        }
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom(0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

mod serde_bytes_256 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 256], s: S) -> Result<S::Ok, S::Error> {
        bytes.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 256], D::Error> {
        let v = Vec::<u8>::deserialize(d)?;
        v.try_into()
            .map_err(|_| serde::de::Error::custom("expected 256 bytes"))
    }
}
