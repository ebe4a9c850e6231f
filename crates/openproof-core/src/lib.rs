//! OpenProof Core - identifiers and digests for accountable agent payments
//!
//! This crate holds the primitives every other OpenProof crate speaks in:
//! - AgentId: the principal that commits, executes and reveals
//! - CommitmentId: caller-chosen 32-byte key of a commitment
//! - Amount: smallest-unit quantity of the settlement asset
//! - ReasoningHash: Keccak-256 digest binding a payment to its justification
//!
//! # Invariants
//!
//! 1. A reasoning hash is a pure function of the reasoning bytes
//! 2. Amount arithmetic is checked, never wrapping

pub mod crypto;
pub mod error;
pub mod types;

pub use crypto::*;
pub use error::*;
pub use types::*;
