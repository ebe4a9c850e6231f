//! Hashing utilities for OpenProof
//!
//! Reasoning is bound to a payment with Keccak-256 over the raw UTF-8 bytes of
//! the justification text. Digests are rendered as `0x`-prefixed hex strings.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::{CoreError, Result};

/// Compute the Keccak-256 digest of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a reasoning text the way commitments expect it
pub fn hash_reasoning(reasoning: &str) -> ReasoningHash {
    ReasoningHash(keccak256(reasoning.as_bytes()))
}

/// Decode a 32-byte value from hex, with or without a `0x` prefix
pub fn decode_hex32(input: &str) -> Result<[u8; 32]> {
    let trimmed = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let bytes = hex::decode(trimmed)?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CoreError::InvalidLength {
            expected: 32,
            actual,
        })
}

/// Encode a 32-byte value as `0x`-prefixed hex
pub fn encode_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Serde adapter storing `[u8; 32]` as a hex string
pub mod hex32 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_hex32(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_hex32(&raw).map_err(de::Error::custom)
    }
}

/// Digest of an agent's reasoning, committed before the payment it justifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReasoningHash(#[serde(with = "hex32")] pub [u8; 32]);

impl ReasoningHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        decode_hex32(input).map(Self)
    }

    pub fn to_hex(&self) -> String {
        encode_hex32(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether `reasoning` is the preimage of this digest
    pub fn matches(&self, reasoning: &str) -> bool {
        hash_reasoning(reasoning) == *self
    }
}

impl std::fmt::Display for ReasoningHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_known_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_reasoning_hash_matches_preimage_only() {
        let hash = hash_reasoning("buy widget");
        assert!(hash.matches("buy widget"));
        assert!(!hash.matches("buy widget "));
        assert!(!hash.matches("Buy widget"));
    }

    #[test]
    fn test_hex_roundtrip_accepts_prefix() {
        let hash = hash_reasoning("restock inventory");
        let hex = hash.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(ReasoningHash::from_hex(&hex).unwrap(), hash);
        assert_eq!(ReasoningHash::from_hex(&hex[2..]).unwrap(), hash);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let result = decode_hex32("0xdeadbeef");
        assert_eq!(
            result,
            Err(CoreError::InvalidLength {
                expected: 32,
                actual: 4
            })
        );
        assert!(matches!(
            decode_hex32("0xzz"),
            Err(CoreError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_reasoning_hash_serializes_as_hex_string() {
        let hash = hash_reasoning("pay supplier");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: ReasoningHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
