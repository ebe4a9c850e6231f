//! Payment Gateway - the external funds mover the vault triggers
//!
//! The vault never holds funds. It asks a gateway to move a commitment's
//! amount from the agent to the recipient and treats any error as fatal to
//! the enclosing call.

use chrono::{DateTime, Utc};
use openproof_core::{AgentId, Amount};
use openproof_ledger::{Ledger, LedgerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::VaultConfig;

/// Errors a gateway may report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transfer declined: {reason}")]
    Declined { reason: String },

    #[error("Gateway unavailable: {message}")]
    Unavailable { message: String },
}

impl From<LedgerError> for GatewayError {
    fn from(e: LedgerError) -> Self {
        GatewayError::Declined {
            reason: e.to_string(),
        }
    }
}

/// Proof that a gateway moved funds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Gateway-side reference of the movement
    pub reference: String,
    pub payer: AgentId,
    pub payee: AgentId,
    pub amount: Amount,
    pub settled_at: DateTime<Utc>,
}

/// Capability to move funds between accounts
///
/// Implementations must not call back into the vault's write operations:
/// the vault holds its writer lock while it waits on `move_funds`.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn move_funds(
        &self,
        payer: &AgentId,
        payee: &AgentId,
        amount: Amount,
    ) -> Result<TransferReceipt, GatewayError>;
}

/// Gateway backed by an OpenProof [`Ledger`]
///
/// Moves funds with `transfer_from`, acting as `operator`. Payers enable a
/// payment by approving the operator for at least the committed amount.
#[derive(Clone)]
pub struct LedgerGateway {
    ledger: Ledger,
    operator: AgentId,
}

impl LedgerGateway {
    pub fn new(ledger: Ledger, operator: AgentId) -> Self {
        Self { ledger, operator }
    }

    /// Use the operator identity from configuration
    pub fn from_config(ledger: Ledger, config: &VaultConfig) -> Self {
        if ledger.asset() != &config.asset {
            warn!(
                ledger_asset = %ledger.asset(),
                configured_asset = %config.asset,
                "ledger asset differs from configured asset"
            );
        }
        Self::new(ledger, config.operator.clone())
    }

    pub fn operator(&self) -> &AgentId {
        &self.operator
    }
}

#[async_trait::async_trait]
impl PaymentGateway for LedgerGateway {
    async fn move_funds(
        &self,
        payer: &AgentId,
        payee: &AgentId,
        amount: Amount,
    ) -> Result<TransferReceipt, GatewayError> {
        let (debit, _credit) = self
            .ledger
            .transfer_from(&self.operator, payer, payee, amount, "openproof")
            .await?;

        debug!(%payer, %payee, %amount, entry = %debit, "gateway moved funds");
        Ok(TransferReceipt {
            reference: debit.0,
            payer: payer.clone(),
            payee: payee.clone(),
            amount,
            settled_at: Utc::now(),
        })
    }
}
