//! On-chain payment verification with replay protection.
//!
//! A verification walks `Received -> ReplayChecked -> ReceiptFetched ->
//! StatusChecked -> TransferMatched -> Granted` and stops at the first failing
//! step. A reference is recorded as consumed only when every step passed.

use crate::services::chain::{decode_transfers, ChainClient, ChainError, PaymentReference};
use crate::services::pricing::{units_to_usd, usd_to_units};
use crate::services::replay::ReplayGuard;
use ethers::types::{Address, U256, U64};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Payment hash already used")]
    PaymentAlreadyUsed,

    #[error("Transaction not found")]
    TransactionNotFound { cause: ChainError },

    #[error("Transaction failed on-chain")]
    TransactionFailedOnChain,

    #[error(
        "No valid USDC transfer found. Required: ${required_usd} USD ({required_units} units) to {recipient:?}"
    )]
    NoValidTransferFound {
        required_usd: f64,
        required_units: u64,
        recipient: Address,
    },

    #[error("Server misconfigured: {0}")]
    ServerMisconfigured(String),
}

impl PaymentError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::PaymentAlreadyUsed => "PAYMENT_ALREADY_USED",
            PaymentError::TransactionNotFound { .. } => "TRANSACTION_NOT_FOUND",
            PaymentError::TransactionFailedOnChain => "TRANSACTION_FAILED_ON_CHAIN",
            PaymentError::NoValidTransferFound { .. } => "NO_VALID_TRANSFER_FOUND",
            PaymentError::ServerMisconfigured(_) => "SERVER_MISCONFIGURED",
        }
    }

    pub fn is_operator_fault(&self) -> bool {
        matches!(self, PaymentError::ServerMisconfigured(_))
    }
}

#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub receiving_address: Address,
    pub token_contract: Address,
}

/// Proof handed to downstream handlers once a payment is granted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentProof {
    pub tx_hash: PaymentReference,
    pub payer: Address,
    pub amount_units: U256,
    pub required_units: u64,
}

pub struct PaymentVerifier {
    chain: Arc<dyn ChainClient>,
    guard: ReplayGuard,
    settings: VerifierSettings,
}

impl PaymentVerifier {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        guard: ReplayGuard,
        settings: VerifierSettings,
    ) -> Result<Self, PaymentError> {
        if settings.receiving_address.is_zero() {
            return Err(PaymentError::ServerMisconfigured(
                "receiving address is not set".to_string(),
            ));
        }
        if settings.token_contract.is_zero() {
            return Err(PaymentError::ServerMisconfigured(
                "settlement token contract is not set".to_string(),
            ));
        }

        Ok(Self {
            chain,
            guard,
            settings,
        })
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    pub fn guard(&self) -> &ReplayGuard {
        &self.guard
    }

    /// Verify that `tx_ref` pays at least `required_amount_usd`.
    pub async fn verify(
        &self,
        required_amount_usd: f64,
        tx_ref: &str,
    ) -> Result<PaymentProof, PaymentError> {
        let required_units = usd_to_units(required_amount_usd)
            .map_err(|e| PaymentError::ServerMisconfigured(e.to_string()))?;

        self.verify_units(required_units, tx_ref).await
    }

    /// Verify that `tx_ref` pays at least `required_units` of the settlement token.
    pub async fn verify_units(
        &self,
        required_units: u64,
        tx_ref: &str,
    ) -> Result<PaymentProof, PaymentError> {
        let result = self.run(required_units, tx_ref).await;

        match &result {
            Ok(proof) => tracing::info!(
                tx_hash = %proof.tx_hash,
                payer = ?proof.payer,
                amount_units = %proof.amount_units,
                required_units,
                "Payment verified"
            ),
            Err(PaymentError::TransactionNotFound { cause }) => tracing::warn!(
                tx_ref,
                kind = "TRANSACTION_NOT_FOUND",
                cause = cause.code(),
                detail = %cause,
                "Payment rejected"
            ),
            Err(e) => tracing::warn!(tx_ref, kind = e.kind(), "Payment rejected: {}", e),
        }

        result
    }

    async fn run(&self, required_units: u64, tx_ref: &str) -> Result<PaymentProof, PaymentError> {
        let reference = PaymentReference::parse(tx_ref)
            .map_err(|cause| PaymentError::TransactionNotFound { cause })?;

        // ReplayChecked: no network I/O before this.
        if self.guard.contains(&reference) {
            return Err(PaymentError::PaymentAlreadyUsed);
        }

        // ReceiptFetched
        let receipt = self
            .chain
            .fetch_receipt(&reference)
            .await
            .map_err(|cause| PaymentError::TransactionNotFound { cause })?;

        // StatusChecked
        if receipt.status != Some(U64::one()) {
            return Err(PaymentError::TransactionFailedOnChain);
        }

        // TransferMatched: first transfer to us that covers the price wins.
        let required = U256::from(required_units);
        let transfer = decode_transfers(&receipt, self.settings.token_contract)
            .into_iter()
            .find(|t| t.to == self.settings.receiving_address && t.amount >= required)
            .ok_or(PaymentError::NoValidTransferFound {
                required_usd: units_to_usd(required_units),
                required_units,
                recipient: self.settings.receiving_address,
            })?;

        // Granted: a racing request may have committed the same hash meanwhile.
        if !self.guard.add(reference) {
            return Err(PaymentError::PaymentAlreadyUsed);
        }

        Ok(PaymentProof {
            tx_hash: reference,
            payer: transfer.from,
            amount_units: transfer.amount,
            required_units,
        })
    }
}
