//! Shared curve parameters.
//!
//! Every proof family works in the prime-order group Ristretto255 over
//! Curve25519. Key-ownership proofs additionally use the Ed25519 basepoint
//! so a holder can prove knowledge of the secret behind a `did:key`
//! without producing a signature. Both groups share the group order and
//! field prime below.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::{RistrettoPoint, Scalar};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;

/// Prime order of both groups, big-endian hex.
pub const GROUP_ORDER_HEX: &str =
    "1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed";

/// Field prime 2^255 - 19, big-endian hex.
pub const FIELD_PRIME_HEX: &str =
    "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed";

/// Highest security level the group can honestly claim, in bits.
pub const MAX_SECURITY_LEVEL: u32 = 128;

/// Label of the primary generator.
pub const G: &str = "G";
/// Label of the Pedersen blinding generator.
pub const H: &str = "H";
/// Label of the Ed25519 basepoint.
pub const B: &str = "B";

const GENERATOR_CONTEXT: &str = "keystone zk generator v1";
const ATTRIBUTE_CONTEXT: &str = "keystone zk attribute v1";

/// The group a proof lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Ristretto255,
    Ed25519,
}

impl Group {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Group::Ristretto255 => "ristretto255",
            Group::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generators shared by all proof constructors.
#[derive(Debug, Clone)]
pub struct CurveParams {
    g: RistrettoPoint,
    h: RistrettoPoint,
}

impl CurveParams {
    /// `G` is the Ristretto basepoint; `H` is hashed to the curve so nobody
    /// knows `log_G(H)`.
    pub fn standard() -> Self {
        Self {
            g: RISTRETTO_BASEPOINT_POINT,
            h: derive_generator(H),
        }
    }

    pub fn g(&self) -> &RistrettoPoint {
        &self.g
    }

    pub fn h(&self) -> &RistrettoPoint {
        &self.h
    }

    /// Resolve a generator label. `G` and `H` are fixed; any other label
    /// hashes to an independent point.
    pub fn generator(&self, label: &str) -> RistrettoPoint {
        match label {
            G => self.g,
            H => self.h,
            other => derive_generator(other),
        }
    }
}

impl Default for CurveParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Hash a label to a Ristretto point with unknown discrete log.
pub fn derive_generator(label: &str) -> RistrettoPoint {
    let mut hasher = blake3::Hasher::new_derive_key(GENERATOR_CONTEXT);
    hasher.update(label.as_bytes());
    let mut wide = [0u8; 64];
    hasher.finalize_xof().fill(&mut wide);
    RistrettoPoint::from_uniform_bytes(&wide)
}

/// Map an arbitrary attribute to a scalar.
pub fn attribute_scalar(attribute: &[u8]) -> Scalar {
    let mut hasher = blake3::Hasher::new_derive_key(ATTRIBUTE_CONTEXT);
    hasher.update(attribute);
    let mut wide = [0u8; 64];
    hasher.finalize_xof().fill(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// A uniformly random non-zero scalar.
pub fn random_scalar() -> Scalar {
    loop {
        let s = Scalar::random(&mut OsRng);
        if s != Scalar::ZERO {
            return s;
        }
    }
}

/// The Ed25519 signing scalar for a 32-byte seed (RFC 8032 §5.1.5).
///
/// `s·B` equals the public key the seed signs with.
pub fn ed25519_secret_scalar(seed: &[u8; 32]) -> Scalar {
    let digest = Sha512::digest(seed);
    let mut lower = [0u8; 32];
    lower.copy_from_slice(&digest[..32]);
    lower[0] &= 248;
    lower[31] &= 127;
    lower[31] |= 64;
    Scalar::from_bytes_mod_order(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::EdwardsPoint;
    use keystone_core::Keypair;

    #[test]
    fn test_group_order_constant() {
        let mut le = hex::decode(GROUP_ORDER_HEX).unwrap();
        le.reverse();
        let bytes: [u8; 32] = le.try_into().unwrap();
        assert_eq!(Scalar::from_bytes_mod_order(bytes), Scalar::ZERO);
        // ℓ itself is not a canonical scalar encoding.
        assert!(bool::from(Scalar::from_canonical_bytes(bytes).is_none()));
    }

    #[test]
    fn test_h_is_independent_of_g() {
        let params = CurveParams::standard();
        assert_ne!(params.g(), params.h());
        assert_eq!(params.generator(H), *params.h());
        assert_eq!(params.generator("X1"), derive_generator("X1"));
        assert_ne!(derive_generator("X1"), derive_generator("X2"));
    }

    #[test]
    fn test_ed25519_scalar_matches_public_key() {
        let kp = Keypair::from_seed(&[0x11; 32]);
        let s = ed25519_secret_scalar(&kp.seed());
        let a = EdwardsPoint::mul_base(&s).compress().to_bytes();
        assert_eq!(a, kp.public_key().0);
    }
}
