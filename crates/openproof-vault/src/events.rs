//! Vault events for indexers and auditors
//!
//! Events are broadcast after a write is published, so subscribers can
//! rebuild history without re-reading the whole vault. Failed calls emit
//! nothing.

use chrono::{DateTime, Utc};
use openproof_core::{AgentId, Amount, CommitmentId, ReasoningHash};
use serde::{Deserialize, Serialize};

/// Events emitted by the accountability vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VaultEvent {
    /// An identity became a registered agent
    AgentRegistered {
        agent: AgentId,
        timestamp: DateTime<Utc>,
    },

    /// An agent committed to the digest of its reasoning
    ReasoningCommitted {
        commitment_id: CommitmentId,
        agent: AgentId,
        reasoning_hash: ReasoningHash,
        recipient: AgentId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// The payment behind a commitment was carried out
    PaymentExecuted {
        commitment_id: CommitmentId,
        agent: AgentId,
        recipient: AgentId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// The committed reasoning was disclosed and matched its digest
    ReasoningRevealed {
        commitment_id: CommitmentId,
        agent: AgentId,
        reasoning: String,
        timestamp: DateTime<Utc>,
    },
}

impl VaultEvent {
    pub fn agent(&self) -> &AgentId {
        match self {
            VaultEvent::AgentRegistered { agent, .. }
            | VaultEvent::ReasoningCommitted { agent, .. }
            | VaultEvent::PaymentExecuted { agent, .. }
            | VaultEvent::ReasoningRevealed { agent, .. } => agent,
        }
    }

    pub fn commitment_id(&self) -> Option<&CommitmentId> {
        match self {
            VaultEvent::AgentRegistered { .. } => None,
            VaultEvent::ReasoningCommitted { commitment_id, .. }
            | VaultEvent::PaymentExecuted { commitment_id, .. }
            | VaultEvent::ReasoningRevealed { commitment_id, .. } => Some(commitment_id),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            VaultEvent::AgentRegistered { timestamp, .. }
            | VaultEvent::ReasoningCommitted { timestamp, .. }
            | VaultEvent::PaymentExecuted { timestamp, .. }
            | VaultEvent::ReasoningRevealed { timestamp, .. } => *timestamp,
        }
    }
}
