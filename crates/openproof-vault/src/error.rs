//! Error types for vault operations
//!
//! Every write either applies all of its effects or fails with one of these
//! and applies none.

use openproof_core::{AgentId, CommitmentId, ReasoningHash};
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by the accountability vault
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Agent {agent} is already registered")]
    AlreadyRegistered { agent: AgentId },

    #[error("Agent {agent} is not registered")]
    NotRegistered { agent: AgentId },

    #[error("Commitment {commitment_id} already exists")]
    CommitmentExists { commitment_id: CommitmentId },

    #[error("Commitment {commitment_id} not found")]
    CommitmentNotFound { commitment_id: CommitmentId },

    #[error("Commitment {commitment_id} is not owned by {caller}")]
    NotYourCommitment {
        commitment_id: CommitmentId,
        caller: AgentId,
    },

    #[error("Commitment {commitment_id} already executed")]
    AlreadyExecuted { commitment_id: CommitmentId },

    #[error("Commitment {commitment_id} already revealed")]
    AlreadyRevealed { commitment_id: CommitmentId },

    #[error("Reasoning hash mismatch for {commitment_id}: committed {committed}, revealed {revealed}")]
    HashMismatch {
        commitment_id: CommitmentId,
        committed: ReasoningHash,
        revealed: ReasoningHash,
    },

    #[error("Transfer for {commitment_id} failed: {source}")]
    TransferFailed {
        commitment_id: CommitmentId,
        #[source]
        source: GatewayError,
    },

    #[error("Amount overflow: {message}")]
    AmountOverflow { message: String },

    /// The runtime shut down before a write finished
    #[error("Write interrupted: {message}")]
    Interrupted { message: String },
}

impl VaultError {
    /// Stable name of the error kind, for logs and wire formats
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::AlreadyRegistered { .. } => "AlreadyRegistered",
            VaultError::NotRegistered { .. } => "NotRegistered",
            VaultError::CommitmentExists { .. } => "CommitmentExists",
            VaultError::CommitmentNotFound { .. } => "CommitmentNotFound",
            VaultError::NotYourCommitment { .. } => "NotYourCommitment",
            VaultError::AlreadyExecuted { .. } => "AlreadyExecuted",
            VaultError::AlreadyRevealed { .. } => "AlreadyRevealed",
            VaultError::HashMismatch { .. } => "HashMismatch",
            VaultError::TransferFailed { .. } => "TransferFailed",
            VaultError::AmountOverflow { .. } => "AmountOverflow",
            VaultError::Interrupted { .. } => "Interrupted",
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
