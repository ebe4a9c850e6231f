//! Reasoning Vault - serialized writes, snapshot reads
//!
//! Every write takes the writer lock for its whole duration, including the
//! wait on the payment gateway, so writes form one global order. A write
//! stages its changes on copies of the records it touches and publishes them
//! under the state lock only after every guard and the gateway have passed.
//! Readers only ever take the state read lock and see published state.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use openproof_core::{hash_reasoning, AgentId, Amount, CommitmentId, ReasoningHash};
use openproof_ledger::Ledger;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::commitment::{Commitment, CommitmentBook};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::events::VaultEvent;
use crate::gateway::{LedgerGateway, PaymentGateway, TransferReceipt};
use crate::index::EnumerationIndex;
use crate::registry::{AgentRecord, AgentRegistry};
use crate::verification::{self, Verification};

/// Everything the vault persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultState {
    pub registry: AgentRegistry,
    pub commitments: CommitmentBook,
    pub index: EnumerationIndex,
}

/// The accountability vault
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ReasoningVault {
    state: Arc<RwLock<VaultState>>,
    writer: Arc<Mutex<()>>,
    gateway: Arc<dyn PaymentGateway>,
    events: broadcast::Sender<VaultEvent>,
    config: VaultConfig,
}

impl ReasoningVault {
    /// Create an empty vault with default configuration
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::with_config(VaultConfig::default(), gateway)
    }

    pub fn with_config(config: VaultConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::restore(VaultState::default(), config, gateway)
    }

    /// Create a vault that settles through a [`Ledger`] as the configured operator
    pub fn with_ledger(config: VaultConfig, ledger: Ledger) -> Self {
        let gateway = Arc::new(LedgerGateway::from_config(ledger, &config));
        Self::with_config(config, gateway)
    }

    /// Resume from previously exported state
    pub fn restore(
        state: VaultState,
        config: VaultConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity());
        Self {
            state: Arc::new(RwLock::new(state)),
            writer: Arc::new(Mutex::new(())),
            gateway,
            events,
            config,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Subscribe to vault events
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: VaultEvent) {
        // Ignore send errors (no receivers)
        let _ = self.events.send(event);
    }

    /// Copy of the published state, for persistence
    pub async fn export_state(&self) -> VaultState {
        self.state.read().await.clone()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Register the caller as an agent
    pub async fn register(&self, caller: &AgentId) -> Result<AgentRecord> {
        let _writer = self.writer.lock().await;
        let now = Utc::now();

        let mut state = self.state.write().await;
        let record = state.registry.prepare_register(caller, now).inspect_err(|e| {
            debug!(agent = %caller, error = %e, "registration rejected");
        })?;
        state.registry.put(caller.clone(), record.clone());
        drop(state);

        info!(agent = %caller, "agent registered");
        self.emit(VaultEvent::AgentRegistered {
            agent: caller.clone(),
            timestamp: now,
        });
        Ok(record)
    }

    /// Commit to the digest of a justification before paying `recipient`
    pub async fn commit(
        &self,
        caller: &AgentId,
        commitment_id: CommitmentId,
        reasoning_hash: ReasoningHash,
        recipient: AgentId,
        amount: Amount,
    ) -> Result<Commitment> {
        let _writer = self.writer.lock().await;
        let now = Utc::now();

        let mut state = self.state.write().await;
        let (record, agent) =
            stage_commit(&state, caller, commitment_id, reasoning_hash, recipient, amount, now)
                .inspect_err(|e| {
                    debug!(
                        agent = %caller,
                        commitment = %commitment_id,
                        error = %e,
                        "commit rejected"
                    );
                })?;
        publish_new(&mut state, caller, record.clone(), agent);
        drop(state);

        info!(
            agent = %caller,
            commitment = %commitment_id,
            recipient = %record.recipient,
            amount = %record.amount,
            "reasoning committed"
        );
        self.emit(committed_event(&record, now));
        Ok(record)
    }

    /// Carry out the payment of a commitment
    ///
    /// The record is marked executed before the gateway is called; if the
    /// gateway fails, nothing of this call is kept. The work runs on its own
    /// task, so dropping the returned future does not stop a payment that
    /// has already started.
    pub async fn execute(
        &self,
        caller: &AgentId,
        commitment_id: CommitmentId,
    ) -> Result<TransferReceipt> {
        let vault = self.clone();
        let caller = caller.clone();
        run_detached(async move { vault.execute_inner(&caller, commitment_id).await }).await
    }

    async fn execute_inner(
        &self,
        caller: &AgentId,
        commitment_id: CommitmentId,
    ) -> Result<TransferReceipt> {
        let _writer = self.writer.lock().await;
        let now = Utc::now();

        let (mut record, mut agent) = {
            let state = self.state.read().await;
            let record = state.commitments.ensure_exists(&commitment_id)?.clone();
            record.ensure_owner(caller)?;
            (record, state.registry.stats(caller))
        };
        record.mark_executed(now)?;
        agent.record_execution(record.amount)?;

        let receipt = self.pay(caller, &record).await.inspect_err(|e| {
            warn!(agent = %caller, commitment = %commitment_id, error = %e, "execution aborted");
        })?;

        {
            let mut state = self.state.write().await;
            state.commitments.put(record.clone());
            state.registry.put(caller.clone(), agent);
        }

        info!(
            agent = %caller,
            commitment = %commitment_id,
            amount = %record.amount,
            reference = %receipt.reference,
            "payment executed"
        );
        self.emit(executed_event(&record, now));
        Ok(receipt)
    }

    /// Commit and execute in one step
    ///
    /// On success `committed_at == executed_at`. If the gateway fails the
    /// commitment never existed. Like [`execute`](Self::execute), the work
    /// survives the caller dropping the future.
    pub async fn commit_and_execute(
        &self,
        caller: &AgentId,
        commitment_id: CommitmentId,
        reasoning_hash: ReasoningHash,
        recipient: AgentId,
        amount: Amount,
    ) -> Result<TransferReceipt> {
        let vault = self.clone();
        let caller = caller.clone();
        run_detached(async move {
            vault
                .commit_and_execute_inner(&caller, commitment_id, reasoning_hash, recipient, amount)
                .await
        })
        .await
    }

    async fn commit_and_execute_inner(
        &self,
        caller: &AgentId,
        commitment_id: CommitmentId,
        reasoning_hash: ReasoningHash,
        recipient: AgentId,
        amount: Amount,
    ) -> Result<TransferReceipt> {
        let _writer = self.writer.lock().await;
        let now = Utc::now();

        let (mut record, mut agent) = {
            let state = self.state.read().await;
            stage_commit(&state, caller, commitment_id, reasoning_hash, recipient, amount, now)?
        };
        record.mark_executed(now)?;
        agent.record_execution(record.amount)?;

        let receipt = self.pay(caller, &record).await.inspect_err(|e| {
            warn!(
                agent = %caller,
                commitment = %commitment_id,
                error = %e,
                "commit-and-execute aborted"
            );
        })?;

        {
            let mut state = self.state.write().await;
            publish_new(&mut state, caller, record.clone(), agent);
        }

        info!(
            agent = %caller,
            commitment = %commitment_id,
            amount = %record.amount,
            reference = %receipt.reference,
            "reasoning committed and payment executed"
        );
        self.emit(committed_event(&record, now));
        self.emit(executed_event(&record, now));
        Ok(receipt)
    }

    /// Disclose the reasoning behind a commitment
    pub async fn reveal(
        &self,
        caller: &AgentId,
        commitment_id: CommitmentId,
        reasoning: &str,
    ) -> Result<()> {
        let _writer = self.writer.lock().await;
        let now = Utc::now();

        let mut state = self.state.write().await;
        let mut record = state.commitments.ensure_exists(&commitment_id)?.clone();
        record.ensure_owner(caller)?;
        if let Err(e) = record.reveal(reasoning, now) {
            if matches!(e, VaultError::HashMismatch { .. }) {
                warn!(
                    agent = %caller,
                    commitment = %commitment_id,
                    error = %e,
                    "reveal does not match commitment"
                );
            }
            return Err(e);
        }
        let mut agent = state.registry.stats(caller);
        agent.record_reveal();

        state.commitments.put(record);
        state.registry.put(caller.clone(), agent);
        drop(state);

        info!(agent = %caller, commitment = %commitment_id, "reasoning revealed");
        self.emit(VaultEvent::ReasoningRevealed {
            commitment_id,
            agent: caller.clone(),
            reasoning: reasoning.to_owned(),
            timestamp: now,
        });
        Ok(())
    }

    async fn pay(&self, caller: &AgentId, record: &Commitment) -> Result<TransferReceipt> {
        self.gateway
            .move_funds(caller, &record.recipient, record.amount)
            .await
            .map_err(|source| VaultError::TransferFailed {
                commitment_id: record.commitment_id,
                source,
            })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Lifetime record of an identity; zeroed if it never registered
    pub async fn stats(&self, agent: &AgentId) -> AgentRecord {
        self.state.read().await.registry.stats(agent)
    }

    /// Number of ever-registered agents
    pub async fn count(&self) -> usize {
        self.state.read().await.registry.count()
    }

    /// Registered agents in registration order
    pub async fn agents(&self, offset: usize, limit: usize) -> Vec<AgentId> {
        self.state.read().await.registry.page(offset, limit)
    }

    /// Recompute the reasoning binding of a commitment
    pub async fn verify(&self, commitment_id: &CommitmentId) -> Verification {
        let state = self.state.read().await;
        verification::verify(state.commitments.get(commitment_id))
    }

    /// Full record of a commitment
    pub async fn commitment(&self, commitment_id: &CommitmentId) -> Option<Commitment> {
        self.state.read().await.commitments.get(commitment_id).cloned()
    }

    /// Commitment ids in creation order
    pub async fn page_ids(&self, offset: usize, limit: usize) -> Vec<CommitmentId> {
        self.state.read().await.index.page(offset, limit)
    }

    /// Number of commitments ever made
    pub async fn total_count(&self) -> usize {
        self.state.read().await.index.total_count()
    }

    /// Digest an agent must commit to for `reasoning`
    pub fn reasoning_hash(reasoning: &str) -> ReasoningHash {
        hash_reasoning(reasoning)
    }
}

/// Run a write on its own task and wait for it
///
/// Once spawned, the write finishes even if the caller stops waiting, so a
/// transfer the gateway completed is always published.
async fn run_detached<T, F>(write: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(write).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(VaultError::Interrupted {
            message: e.to_string(),
        }),
    }
}

/// Check commit preconditions and build the staged record and agent
fn stage_commit(
    state: &VaultState,
    caller: &AgentId,
    commitment_id: CommitmentId,
    reasoning_hash: ReasoningHash,
    recipient: AgentId,
    amount: Amount,
    now: DateTime<Utc>,
) -> Result<(Commitment, AgentRecord)> {
    let mut agent = state.registry.ensure_registered(caller)?.clone();
    state.commitments.ensure_absent(&commitment_id)?;

    let record = Commitment::new(
        commitment_id,
        caller.clone(),
        reasoning_hash,
        recipient,
        amount,
        now,
    );
    agent.record_commit();
    Ok((record, agent))
}

fn publish_new(state: &mut VaultState, caller: &AgentId, record: Commitment, agent: AgentRecord) {
    state.index.push(record.commitment_id);
    state.commitments.put(record);
    state.registry.put(caller.clone(), agent);
}

fn committed_event(record: &Commitment, timestamp: DateTime<Utc>) -> VaultEvent {
    VaultEvent::ReasoningCommitted {
        commitment_id: record.commitment_id,
        agent: record.agent.clone(),
        reasoning_hash: record.reasoning_hash,
        recipient: record.recipient.clone(),
        amount: record.amount,
        timestamp,
    }
}

fn executed_event(record: &Commitment, timestamp: DateTime<Utc>) -> VaultEvent {
    VaultEvent::PaymentExecuted {
        commitment_id: record.commitment_id,
        agent: record.agent.clone(),
        recipient: record.recipient.clone(),
        amount: record.amount,
        timestamp,
    }
}
