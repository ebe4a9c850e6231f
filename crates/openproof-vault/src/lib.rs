//! OpenProof Vault - commit before you pay, reveal after
//!
//! An agent commits to the Keccak-256 digest of its reasoning before a
//! payment executes, and later reveals the reasoning so anyone can check it
//! against the digest. Because the digest was recorded before the transfer,
//! the reasoning cannot be invented or edited after the fact.
//!
//! Components:
//! - [`AgentRegistry`]: who may commit, and lifetime statistics
//! - [`CommitmentBook`]: the commit / execute / reveal state machine
//! - [`verify`]: recompute a commitment's reasoning binding
//! - [`EnumerationIndex`]: insertion-ordered ids for audit paging
//! - [`PaymentGateway`]: the external funds mover
//! - [`ReasoningVault`]: the service tying them together
//!
//! # Architectural Invariants
//!
//! 1. Commit precedes execute and reveal for the same identifier
//! 2. Every write is all-or-nothing
//! 3. A reveal that does not hash to the commitment changes nothing
//! 4. Only the owner moves its commitment forward

pub mod commitment;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod index;
pub mod registry;
pub mod vault;
pub mod verification;

pub use commitment::{Commitment, CommitmentBook, CommitmentStatus};
pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use events::VaultEvent;
pub use gateway::{GatewayError, LedgerGateway, PaymentGateway, TransferReceipt};
pub use index::EnumerationIndex;
pub use registry::{AgentRecord, AgentRegistry};
pub use vault::{ReasoningVault, VaultState};
pub use verification::{verify, Verification};

pub use openproof_core::{hash_reasoning, AgentId, Amount, AssetId, CommitmentId, ReasoningHash};
