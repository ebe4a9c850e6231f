//! Commitment Ledger - the commit / execute / reveal state machine
//!
//! A commitment is created in the `Committed` state and carries two
//! independent one-way flags, `executed` and `revealed`. Guards live on the
//! record itself so the vault can stage a transition on a copy and publish it
//! only once everything else in the call has succeeded.
//!
//! # Invariants
//!
//! 1. An identifier is used at most once
//! 2. `executed` and `revealed` never go back to false
//! 3. `revealed` implies the stored reasoning hashes to `reasoning_hash`
//! 4. Only the owning agent moves its commitment forward

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use openproof_core::{hash_reasoning, AgentId, Amount, CommitmentId, ReasoningHash};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Lifecycle position of a commitment, derived from its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentStatus {
    Committed,
    Executed,
    Revealed,
    /// Executed and revealed, in either order
    Settled,
}

/// Permanent record binding an agent, a reasoning digest and a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub commitment_id: CommitmentId,
    pub agent: AgentId,
    pub reasoning_hash: ReasoningHash,
    pub recipient: AgentId,
    pub amount: Amount,
    pub committed_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub revealed_at: Option<DateTime<Utc>>,
    pub executed: bool,
    pub revealed: bool,
    /// Empty until revealed
    pub reasoning: String,
}

impl Commitment {
    pub fn new(
        commitment_id: CommitmentId,
        agent: AgentId,
        reasoning_hash: ReasoningHash,
        recipient: AgentId,
        amount: Amount,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            commitment_id,
            agent,
            reasoning_hash,
            recipient,
            amount,
            committed_at,
            executed_at: None,
            revealed_at: None,
            executed: false,
            revealed: false,
            reasoning: String::new(),
        }
    }

    pub fn status(&self) -> CommitmentStatus {
        match (self.executed, self.revealed) {
            (false, false) => CommitmentStatus::Committed,
            (true, false) => CommitmentStatus::Executed,
            (false, true) => CommitmentStatus::Revealed,
            (true, true) => CommitmentStatus::Settled,
        }
    }

    pub fn ensure_owner(&self, caller: &AgentId) -> Result<()> {
        if &self.agent != caller {
            return Err(VaultError::NotYourCommitment {
                commitment_id: self.commitment_id,
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Flip `executed`; the payment itself is the caller's business
    pub fn mark_executed(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.executed {
            return Err(VaultError::AlreadyExecuted {
                commitment_id: self.commitment_id,
            });
        }
        self.executed = true;
        self.executed_at = Some(now);
        Ok(())
    }

    /// Store the reasoning if it is the committed preimage
    ///
    /// The hash is checked before anything is written, so a rejected reveal
    /// leaves the record exactly as it was.
    pub fn reveal(&mut self, reasoning: &str, now: DateTime<Utc>) -> Result<()> {
        if self.revealed {
            return Err(VaultError::AlreadyRevealed {
                commitment_id: self.commitment_id,
            });
        }
        let revealed = hash_reasoning(reasoning);
        if revealed != self.reasoning_hash {
            return Err(VaultError::HashMismatch {
                commitment_id: self.commitment_id,
                committed: self.reasoning_hash,
                revealed,
            });
        }
        self.reasoning = reasoning.to_owned();
        self.revealed = true;
        self.revealed_at = Some(now);
        Ok(())
    }

    /// Revealed, and the stored reasoning still hashes to the commitment
    pub fn binding_holds(&self) -> bool {
        self.revealed && self.reasoning_hash.matches(&self.reasoning)
    }
}

/// All commitments ever made, keyed by identifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitmentBook {
    records: HashMap<CommitmentId, Commitment>,
}

impl CommitmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, commitment_id: &CommitmentId) -> Option<&Commitment> {
        self.records.get(commitment_id)
    }

    pub fn contains(&self, commitment_id: &CommitmentId) -> bool {
        self.records.contains_key(commitment_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn ensure_absent(&self, commitment_id: &CommitmentId) -> Result<()> {
        if self.contains(commitment_id) {
            return Err(VaultError::CommitmentExists {
                commitment_id: *commitment_id,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_exists(&self, commitment_id: &CommitmentId) -> Result<&Commitment> {
        self.get(commitment_id)
            .ok_or(VaultError::CommitmentNotFound {
                commitment_id: *commitment_id,
            })
    }

    /// Publish a staged record
    pub(crate) fn put(&mut self, commitment: Commitment) {
        self.records.insert(commitment.commitment_id, commitment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn committed(reasoning: &str) -> Commitment {
        Commitment::new(
            CommitmentId::from_bytes([7; 32]),
            AgentId::from_string("agent-a"),
            hash_reasoning(reasoning),
            AgentId::from_string("recipient"),
            Amount::new(100),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_commitment_is_committed() {
        let record = committed("buy widget");
        assert_eq!(record.status(), CommitmentStatus::Committed);
        assert!(record.reasoning.is_empty());
        assert!(!record.binding_holds());
    }

    #[test]
    fn test_execute_twice_fails() {
        let mut record = committed("buy widget");
        let now = Utc::now();
        record.mark_executed(now).unwrap();
        assert_eq!(record.executed_at, Some(now));

        let again = record.mark_executed(Utc::now());
        assert!(matches!(again, Err(VaultError::AlreadyExecuted { .. })));
        assert_eq!(record.executed_at, Some(now));
    }

    #[test]
    fn test_reveal_mismatch_leaves_record_untouched() {
        let mut record = committed("real reason");
        let before = record.clone();

        let result = record.reveal("fake reason", Utc::now());
        match result {
            Err(VaultError::HashMismatch {
                committed,
                revealed,
                ..
            }) => {
                assert_eq!(committed, hash_reasoning("real reason"));
                assert_eq!(revealed, hash_reasoning("fake reason"));
            }
            other => panic!("expected HashMismatch, got {:?}", other),
        }
        assert_eq!(record, before);
    }

    #[test]
    fn test_reveal_twice_fails() {
        let mut record = committed("buy widget");
        record.reveal("buy widget", Utc::now()).unwrap();
        assert!(matches!(
            record.reveal("buy widget", Utc::now()),
            Err(VaultError::AlreadyRevealed { .. })
        ));
    }

    #[test]
    fn test_flags_are_independent() {
        let mut record = committed("ship it");
        record.reveal("ship it", Utc::now()).unwrap();
        assert_eq!(record.status(), CommitmentStatus::Revealed);
        record.mark_executed(Utc::now()).unwrap();
        assert_eq!(record.status(), CommitmentStatus::Settled);
    }

    #[test]
    fn test_only_owner_passes() {
        let record = committed("buy widget");
        assert!(record.ensure_owner(&AgentId::from_string("agent-a")).is_ok());
        assert!(matches!(
            record.ensure_owner(&AgentId::from_string("agent-b")),
            Err(VaultError::NotYourCommitment { .. })
        ));
    }

    #[test]
    fn test_book_guards() {
        let mut book = CommitmentBook::new();
        let record = committed("buy widget");
        let id = record.commitment_id;

        assert!(matches!(
            book.ensure_exists(&id),
            Err(VaultError::CommitmentNotFound { .. })
        ));
        book.put(record);
        assert!(matches!(
            book.ensure_absent(&id),
            Err(VaultError::CommitmentExists { .. })
        ));
        assert_eq!(book.len(), 1);
    }

    proptest! {
        #[test]
        fn property_reveal_roundtrip_is_byte_exact(reasoning in any::<String>()) {
            let mut record = committed(&reasoning);
            record.reveal(&reasoning, Utc::now()).unwrap();
            prop_assert!(record.binding_holds());
            prop_assert_eq!(&record.reasoning, &reasoning);
        }

        #[test]
        fn property_other_text_never_reveals(real in any::<String>(), fake in any::<String>()) {
            prop_assume!(real != fake);
            let mut record = committed(&real);
            prop_assert!(record.reveal(&fake, Utc::now()).is_err());
            prop_assert!(!record.revealed);
            prop_assert!(record.reasoning.is_empty());
        }
    }
}
