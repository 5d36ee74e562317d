//! Sending prepared calls and waiting for their receipts

use std::sync::Arc;
use ethers::providers::{Middleware, PendingTransaction};
use ethers::types::{Address, Log, TransactionReceipt, TxHash, U256, U64};
use serde::Serialize;
use crate::contracts::liquidity_launcher;
use crate::encoding::{
    create_token, distribute_to_auction, AuctionParameters, PreparedCall, TokenLaunch,
};
use crate::utils::{CcaError, Result};

/// Final status of a mined transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

impl From<TransactionReceipt> for TxOutcome {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            success: receipt.status == Some(U64::from(1)),
            block_number: receipt.block_number.map(|b| b.as_u64()),
            logs: receipt.logs,
        }
    }
}

impl TxOutcome {
    fn require_success(&self, what: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(CcaError::TransactionError(format!("{} reverted in {:?}", what, self.tx_hash)))
        }
    }

    /// Token announced by a successful `createToken`
    pub fn created_token(&self) -> Result<Address> {
        self.require_success("createToken")?;
        liquidity_launcher::created_token(&self.logs).ok_or_else(|| {
            CcaError::TransactionError(format!("no TokenCreated event in {:?}", self.tx_hash))
        })
    }

    /// Auction deployed by a successful `distributeToken`
    pub fn distributed_auction(&self) -> Result<Address> {
        self.require_success("distributeToken")?;
        liquidity_launcher::distributed_auction(&self.logs).ok_or_else(|| {
            CcaError::TransactionError(format!("no TokenDistributed event in {:?}", self.tx_hash))
        })
    }
}

/// Result of a two-step token and auction launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchOutcome {
    pub token: Address,
    pub auction: Address,
    pub create_tx: TxHash,
    pub distribute_tx: TxHash,
}

/// Submits calls through any signing middleware. Single attempt, no retries.
pub struct TransactionSubmitter<M> {
    client: Arc<M>,
    confirmations: usize,
}

impl<M: Middleware> TransactionSubmitter<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client, confirmations: 1 }
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    /// Broadcast `call`, returning the transaction hash
    pub async fn submit(&self, call: &PreparedCall) -> Result<TxHash> {
        tracing::info!("📤 Sending call to {:?} ({} bytes, value {})", call.to, call.data.len(), call.value);

        let pending = self
            .client
            .send_transaction(call.to_request(), None)
            .await
            .map_err(|e| CcaError::TransactionError(e.to_string()))?;

        let tx_hash = pending.tx_hash();
        tracing::info!("Transaction sent: {:?}", tx_hash);
        Ok(tx_hash)
    }

    /// Wait until `tx_hash` is mined with the configured confirmations
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxOutcome> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .confirmations(self.confirmations)
            .await?
            .ok_or_else(|| CcaError::TransactionError(format!("{:?} was dropped from the mempool", tx_hash)))?;

        let outcome = TxOutcome::from(receipt);
        if outcome.success {
            tracing::info!("✅ {:?} mined in block {:?}", tx_hash, outcome.block_number);
        } else {
            tracing::warn!("❌ {:?} reverted in block {:?}", tx_hash, outcome.block_number);
        }
        Ok(outcome)
    }

    pub async fn submit_and_wait(&self, call: &PreparedCall) -> Result<TxOutcome> {
        let tx_hash = self.submit(call).await?;
        self.wait_for_receipt(tx_hash).await
    }

    /// Mint `token` through the launcher, then distribute the whole supply
    /// into a new auction. The second transaction is only sent once the
    /// first receipt names the token.
    pub async fn launch_auction(
        &self,
        token: &TokenLaunch,
        params: &AuctionParameters,
        decimals: u8,
        sender: Address,
        nonce: U256,
    ) -> Result<LaunchOutcome> {
        token.validate(decimals)?;
        let supply = token.supply_units(decimals)?;

        tracing::info!("🪙 Creating {} ({})", token.name, token.symbol);
        let created = self
            .submit_and_wait(&create_token(&token.name, &token.symbol, decimals, supply))
            .await?;
        let token_address = created.created_token()?;
        tracing::info!("Token deployed at {:?}", token_address);

        tracing::info!("🏁 Distributing supply into a new auction");
        let distributed = self
            .submit_and_wait(&distribute_to_auction(token_address, supply, params, sender, nonce))
            .await?;
        let auction = distributed.distributed_auction()?;
        tracing::info!("✅ Auction deployed at {:?}", auction);

        Ok(LaunchOutcome {
            token: token_address,
            auction,
            create_tx: created.tx_hash,
            distribute_tx: distributed.tx_hash,
        })
    }
}
