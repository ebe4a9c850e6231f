//! Agent Registry - which principals may commit, and what they have done
//!
//! Registration is one-way: there is no unregister. Lifetime counters are
//! bumped by the vault as commitments move through their lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use openproof_core::{AgentId, Amount};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::index::page_slice;

/// Lifetime record of an agent
///
/// The default value is the record of an identity that never registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub registered: bool,
    pub commit_count: u64,
    pub reveal_count: u64,
    pub executed_count: u64,
    pub total_moved: Amount,
    pub registered_at: Option<DateTime<Utc>>,
}

impl AgentRecord {
    fn registered_at(now: DateTime<Utc>) -> Self {
        Self {
            registered: true,
            registered_at: Some(now),
            ..Default::default()
        }
    }

    pub(crate) fn record_commit(&mut self) {
        self.commit_count += 1;
    }

    pub(crate) fn record_reveal(&mut self) {
        self.reveal_count += 1;
    }

    /// Count an executed payment; fails without touching the record on overflow
    pub(crate) fn record_execution(&mut self, amount: Amount) -> Result<()> {
        let total_moved = self
            .total_moved
            .try_add(amount)
            .map_err(|e| VaultError::AmountOverflow {
                message: e.to_string(),
            })?;
        self.total_moved = total_moved;
        self.executed_count += 1;
        Ok(())
    }
}

/// Registry of all agents, in registration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, AgentRecord>,
    order: Vec<AgentId>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a registration without applying it
    pub(crate) fn prepare_register(
        &self,
        agent: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<AgentRecord> {
        if self.is_registered(agent) {
            return Err(VaultError::AlreadyRegistered {
                agent: agent.clone(),
            });
        }
        Ok(AgentRecord::registered_at(now))
    }

    /// Look up a registered agent, failing for anyone else
    pub(crate) fn ensure_registered(&self, agent: &AgentId) -> Result<&AgentRecord> {
        self.agents
            .get(agent)
            .filter(|record| record.registered)
            .ok_or_else(|| VaultError::NotRegistered {
                agent: agent.clone(),
            })
    }

    /// Publish a staged record, appending first-time identities to the order
    pub(crate) fn put(&mut self, agent: AgentId, record: AgentRecord) {
        if !self.agents.contains_key(&agent) {
            self.order.push(agent.clone());
        }
        self.agents.insert(agent, record);
    }

    pub fn is_registered(&self, agent: &AgentId) -> bool {
        self.agents.get(agent).is_some_and(|r| r.registered)
    }

    /// Snapshot of an agent's record; unregistered identities get the default
    pub fn stats(&self, agent: &AgentId) -> AgentRecord {
        self.agents.get(agent).cloned().unwrap_or_default()
    }

    /// Number of identities that ever registered
    pub fn count(&self) -> usize {
        self.order.len()
    }

    /// Registered identities in registration order
    pub fn page(&self, offset: usize, limit: usize) -> Vec<AgentId> {
        page_slice(&self.order, offset, limit)
    }
}
