//! Hex-serialized wire types for points, scalars and raw bytes.
//!
//! Deserialization rejects non-canonical scalars and any point that is
//! neither a Ristretto encoding nor a torsion-free Edwards point. Values
//! built in code are checked again on use: the accessors return `None`,
//! which verifiers treat as failure.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::ristretto::CompressedRistretto;
use curve25519_dalek::traits::IsIdentity;
use curve25519_dalek::{EdwardsPoint, RistrettoPoint, Scalar};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

fn hex32<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
    let s = String::deserialize(d)?;
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    bytes
        .try_into()
        .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
}

/// A compressed group element.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointBytes(pub [u8; 32]);

impl PointBytes {
    pub fn from_ristretto(p: &RistrettoPoint) -> Self {
        Self(p.compress().to_bytes())
    }

    pub fn from_edwards(p: &EdwardsPoint) -> Self {
        Self(p.compress().to_bytes())
    }

    pub fn to_ristretto(&self) -> Option<RistrettoPoint> {
        CompressedRistretto(self.0).decompress()
    }

    /// Decompress, rejecting points with a small-order component.
    pub fn to_edwards(&self) -> Option<EdwardsPoint> {
        CompressedEdwardsY(self.0)
            .decompress()
            .filter(|p| p.is_torsion_free())
    }

    /// Decompress a Ristretto point that must not be the identity.
    pub fn to_ristretto_nonidentity(&self) -> Option<RistrettoPoint> {
        self.to_ristretto().filter(|p| !p.is_identity())
    }

    pub fn to_edwards_nonidentity(&self) -> Option<EdwardsPoint> {
        self.to_edwards().filter(|p| !p.is_identity())
    }

    /// Whether the bytes decode in either supported group.
    pub fn is_valid(&self) -> bool {
        self.to_ristretto().is_some() || self.to_edwards().is_some()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PointBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", &self.to_hex()[..16])
    }
}

impl Serialize for PointBytes {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PointBytes {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let point = Self(hex32(d)?);
        if !point.is_valid() {
            return Err(serde::de::Error::custom("not a valid group element"));
        }
        Ok(point)
    }
}

/// A little-endian scalar encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarBytes(pub [u8; 32]);

impl ScalarBytes {
    pub fn from_scalar(s: &Scalar) -> Self {
        Self(s.to_bytes())
    }

    /// `None` unless the encoding is canonical, i.e. the value is below the group order.
    pub fn to_scalar(&self) -> Option<Scalar> {
        Option::from(Scalar::from_canonical_bytes(self.0))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ScalarBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", &self.to_hex()[..16])
    }
}

impl Serialize for ScalarBytes {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ScalarBytes {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let scalar = Self(hex32(d)?);
        if scalar.to_scalar().is_none() {
            return Err(serde::de::Error::custom("non-canonical scalar"));
        }
        Ok(scalar)
    }
}

/// Arbitrary bytes, hex on the wire.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBytes({})", hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map(Self).map_err(serde::de::Error::custom)
    }
}
