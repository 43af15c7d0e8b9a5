//! 64-bit perceptual fingerprint.
//!
//! Encoded externally as 16 lowercase hex digits (4 bits per digit). Two
//! fingerprints are compared by Hamming distance; distances at or below
//! [`crate::constants::PHASH_DISTANCE_THRESHOLD`] mean "the same photo".

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 64-bit perceptual fingerprint of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn from_bits(bits: u64) -> Self {
        Fingerprint(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Parse a fingerprint from its 16-hex-digit encoding.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        if s.len() != 16 {
            return Err(format!(
                "fingerprint must be 16 hex digits, got {} characters",
                s.len()
            ));
        }
        u64::from_str_radix(s, 16)
            .map(Fingerprint)
            .map_err(|e| format!("invalid fingerprint hex: {}", e))
    }

    /// Render as 16 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Hamming distance between two fingerprints, in [0, 64].
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

struct FingerprintVisitor;

impl Visitor<'_> for FingerprintVisitor {
    type Value = Fingerprint;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 16-hex-digit fingerprint string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Fingerprint, E> {
        Fingerprint::from_hex(v).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Fingerprint, D::Error> {
        deserializer.deserialize_str(FingerprintVisitor)
    }
}
