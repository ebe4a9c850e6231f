//! OpenProof Ledger - reference funds mover for a single stable-value asset
//!
//! The ledger is:
//! - Single-asset (USDC by default)
//! - Account-keyed by AgentId
//! - Double-entry (every transfer writes a debit and a credit)
//! - Append-only (entries are never rewritten)
//! - Allowance-aware (a spender moves an owner's funds only up to what was approved)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Every entry has a reason
//! 3. A failed operation changes nothing

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use openproof_core::{AgentId, Amount, AssetId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account}: have {available}, need {required}")]
    InsufficientBalance {
        account: String,
        available: u128,
        required: u128,
    },

    #[error("Insufficient allowance from {owner} to {spender}: have {available}, need {required}")]
    InsufficientAllowance {
        owner: String,
        spender: String,
        available: u128,
        required: u128,
    },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unique identifier for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(format!("entry_{}", Uuid::new_v4()))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Credit (increase) to an account
    Credit,
    /// Debit (decrease) from an account
    Debit,
}

/// Reason for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// Funds created out of thin air (test faucets, issuer top-ups)
    Mint { reference: String },
    /// Transfer between accounts
    Transfer { reference: String },
}

/// A single ledger entry (one side of a double-entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub account: AgentId,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_after: Amount,
    pub reason: EntryReason,
    pub created_at: DateTime<Utc>,
}

/// Account state in the ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: Amount,
    /// spender -> remaining allowance
    pub allowances: HashMap<AgentId, Amount>,
    pub entry_count: u64,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AgentId, AccountState>,
    entries: Vec<LedgerEntry>,
}

impl LedgerState {
    fn balance(&self, account: &AgentId) -> Amount {
        self.accounts
            .get(account)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn allowance(&self, owner: &AgentId, spender: &AgentId) -> Amount {
        self.accounts
            .get(owner)
            .and_then(|a| a.allowances.get(spender).copied())
            .unwrap_or_default()
    }

    fn post(
        &mut self,
        account: &AgentId,
        entry_type: EntryType,
        amount: Amount,
        balance_after: Amount,
        reason: EntryReason,
    ) -> EntryId {
        let state = self.accounts.entry(account.clone()).or_default();
        state.balance = balance_after;
        state.entry_count += 1;

        let entry_id = EntryId::new();
        self.entries.push(LedgerEntry {
            entry_id: entry_id.clone(),
            account: account.clone(),
            entry_type,
            amount,
            balance_after,
            reason,
            created_at: Utc::now(),
        });
        entry_id
    }

    /// Move funds after checking everything that could fail.
    fn move_funds(
        &mut self,
        from: &AgentId,
        to: &AgentId,
        amount: Amount,
        reason: EntryReason,
    ) -> Result<(EntryId, EntryId)> {
        let from_balance = self.balance(from);
        let from_after =
            from_balance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::InsufficientBalance {
                    account: from.0.clone(),
                    available: from_balance.0,
                    required: amount.0,
                })?;

        let to_after = if from == to {
            from_balance
        } else {
            self.balance(to)
                .checked_add(amount)
                .ok_or_else(|| LedgerError::InvalidAmount {
                    message: "Balance overflow".to_string(),
                })?
        };

        let debit = self.post(from, EntryType::Debit, amount, from_after, reason.clone());
        let credit = self.post(to, EntryType::Credit, amount, to_after, reason);
        Ok((debit, credit))
    }
}

/// The OpenProof Ledger
///
/// A double-entry ledger for one asset. All state sits behind a single lock so
/// a transfer's checks and both of its entries happen in one critical section.
#[derive(Clone)]
pub struct Ledger {
    asset: AssetId,
    state: Arc<RwLock<LedgerState>>,
}

impl Ledger {
    /// Create a new in-memory ledger for an asset
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// The asset this ledger tracks
    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    /// Get the balance of an account
    pub async fn balance(&self, account: &AgentId) -> Amount {
        self.state.read().await.balance(account)
    }

    /// Credit an account with newly created funds
    pub async fn mint(
        &self,
        to: &AgentId,
        amount: Amount,
        reference: impl Into<String>,
    ) -> Result<(Amount, EntryId)> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                message: "Amount must be greater than zero".to_string(),
            });
        }

        let mut state = self.state.write().await;
        let new_balance =
            state
                .balance(to)
                .checked_add(amount)
                .ok_or_else(|| LedgerError::InvalidAmount {
                    message: "Balance overflow".to_string(),
                })?;
        let entry_id = state.post(
            to,
            EntryType::Credit,
            amount,
            new_balance,
            EntryReason::Mint {
                reference: reference.into(),
            },
        );

        debug!(account = %to, %amount, asset = %self.asset, "minted");
        Ok((new_balance, entry_id))
    }

    /// Move funds the caller owns
    ///
    /// This is atomic: both debit and credit happen together or neither does.
    pub async fn transfer(
        &self,
        from: &AgentId,
        to: &AgentId,
        amount: Amount,
        reference: impl Into<String>,
    ) -> Result<(EntryId, EntryId)> {
        let reason = EntryReason::Transfer {
            reference: reference.into(),
        };
        let mut state = self.state.write().await;
        let entries = state.move_funds(from, to, amount, reason)?;
        debug!(%from, %to, %amount, asset = %self.asset, "transferred");
        Ok(entries)
    }

    /// Set how much `spender` may move out of `owner`'s account
    ///
    /// Replaces any previous allowance.
    pub async fn approve(&self, owner: &AgentId, spender: &AgentId, amount: Amount) {
        let mut state = self.state.write().await;
        state
            .accounts
            .entry(owner.clone())
            .or_default()
            .allowances
            .insert(spender.clone(), amount);
        debug!(%owner, %spender, %amount, "allowance set");
    }

    /// Remaining allowance from `owner` to `spender`
    pub async fn allowance(&self, owner: &AgentId, spender: &AgentId) -> Amount {
        self.state.read().await.allowance(owner, spender)
    }

    /// Move `owner`'s funds on their behalf, consuming allowance
    pub async fn transfer_from(
        &self,
        spender: &AgentId,
        owner: &AgentId,
        to: &AgentId,
        amount: Amount,
        reference: impl Into<String>,
    ) -> Result<(EntryId, EntryId)> {
        let mut state = self.state.write().await;

        let available = state.allowance(owner, spender);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::InsufficientAllowance {
                    owner: owner.0.clone(),
                    spender: spender.0.clone(),
                    available: available.0,
                    required: amount.0,
                })?;

        let reason = EntryReason::Transfer {
            reference: reference.into(),
        };
        let entries = state.move_funds(owner, to, amount, reason)?;

        if let Some(account) = state.accounts.get_mut(owner) {
            account.allowances.insert(spender.clone(), remaining);
        }

        debug!(%spender, %owner, %to, %amount, asset = %self.asset, "transferred on behalf");
        Ok(entries)
    }

    /// Get all entries for an account
    pub async fn account_entries(&self, account: &AgentId) -> Vec<LedgerEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect()
    }

    /// Get the total number of entries
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Get account state
    pub async fn account_state(&self, account: &AgentId) -> Option<AccountState> {
        self.state.read().await.accounts.get(account).cloned()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(AssetId::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn funded(account: &AgentId, amount: u128) -> Ledger {
        let ledger = Ledger::default();
        ledger
            .mint(account, Amount::new(amount), "faucet")
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_mint_and_balance() {
        let ledger = Ledger::default();
        let account = AgentId::new();

        assert_eq!(ledger.balance(&account).await, Amount::zero());

        let (balance, _) = ledger
            .mint(&account, Amount::new(1000), "faucet")
            .await
            .unwrap();

        assert_eq!(balance, Amount::new(1000));
        assert_eq!(ledger.balance(&account).await, Amount::new(1000));
    }

    #[tokio::test]
    async fn test_zero_mint_rejected() {
        let ledger = Ledger::default();
        let result = ledger.mint(&AgentId::new(), Amount::zero(), "faucet").await;
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn test_transfer() {
        let from = AgentId::new();
        let to = AgentId::new();
        let ledger = funded(&from, 1000).await;

        ledger
            .transfer(&from, &to, Amount::new(400), "invoice-1")
            .await
            .unwrap();

        assert_eq!(ledger.balance(&from).await, Amount::new(600));
        assert_eq!(ledger.balance(&to).await, Amount::new(400));
        assert_eq!(ledger.entry_count().await, 3);
    }

    #[tokio::test]
    async fn test_no_negative_balance() {
        let from = AgentId::new();
        let to = AgentId::new();
        let ledger = funded(&from, 100).await;

        let result = ledger
            .transfer(&from, &to, Amount::new(200), "too-much")
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance(&from).await, Amount::new(100));
        assert_eq!(ledger.balance(&to).await, Amount::zero());
        assert_eq!(ledger.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_self_transfer_keeps_balance() {
        let account = AgentId::new();
        let ledger = funded(&account, 500).await;

        ledger
            .transfer(&account, &account, Amount::new(200), "loop")
            .await
            .unwrap();

        assert_eq!(ledger.balance(&account).await, Amount::new(500));
    }

    #[tokio::test]
    async fn test_transfer_from_consumes_allowance() {
        let owner = AgentId::new();
        let spender = AgentId::from_string("operator");
        let to = AgentId::new();
        let ledger = funded(&owner, 1000).await;

        ledger.approve(&owner, &spender, Amount::new(300)).await;
        ledger
            .transfer_from(&spender, &owner, &to, Amount::new(100), "commit-1")
            .await
            .unwrap();

        assert_eq!(ledger.allowance(&owner, &spender).await, Amount::new(200));
        assert_eq!(ledger.balance(&owner).await, Amount::new(900));
        assert_eq!(ledger.balance(&to).await, Amount::new(100));
    }

    #[tokio::test]
    async fn test_transfer_from_without_allowance_changes_nothing() {
        let owner = AgentId::new();
        let spender = AgentId::from_string("operator");
        let to = AgentId::new();
        let ledger = funded(&owner, 1000).await;

        ledger.approve(&owner, &spender, Amount::new(50)).await;
        let result = ledger
            .transfer_from(&spender, &owner, &to, Amount::new(100), "commit-1")
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance { .. })
        ));
        assert_eq!(ledger.allowance(&owner, &spender).await, Amount::new(50));
        assert_eq!(ledger.balance(&owner).await, Amount::new(1000));
    }

    #[tokio::test]
    async fn test_transfer_from_insufficient_balance_keeps_allowance() {
        let owner = AgentId::new();
        let spender = AgentId::from_string("operator");
        let to = AgentId::new();
        let ledger = funded(&owner, 10).await;

        ledger.approve(&owner, &spender, Amount::new(100)).await;
        let result = ledger
            .transfer_from(&spender, &owner, &to, Amount::new(100), "commit-1")
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.allowance(&owner, &spender).await, Amount::new(100));
    }

    #[tokio::test]
    async fn test_entry_tracking() {
        let account = AgentId::new();
        let ledger = funded(&account, 100).await;
        ledger
            .mint(&account, Amount::new(200), "faucet-2")
            .await
            .unwrap();

        let entries = ledger.account_entries(&account).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].balance_after, Amount::new(300));
        assert_eq!(
            ledger.account_state(&account).await.unwrap().entry_count,
            2
        );
    }
}
