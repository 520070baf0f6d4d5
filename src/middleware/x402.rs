use crate::error::GatewayError;
use crate::models::{PaymentDetails, PaymentFormat, PaymentInstructions};
use crate::services::pricing::{units_to_usd, TOKEN_DECIMALS};
use crate::services::{Analytics, PaymentProof, PaymentVerifier, Quote};
use axum::http::HeaderMap;
use std::sync::Arc;

/// Header carrying the payment transaction hash.
pub const PAYMENT_HEADER: &str = "X-Payment-Tx";

pub fn payment_reference(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(PAYMENT_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Charges a quoted request against the caller's on-chain payment.
pub struct PaymentGate {
    verifier: Arc<PaymentVerifier>,
    analytics: Arc<Analytics>,
    chain_id: u64,
}

impl PaymentGate {
    pub fn new(verifier: Arc<PaymentVerifier>, analytics: Arc<Analytics>, chain_id: u64) -> Self {
        Self {
            verifier,
            analytics,
            chain_id,
        }
    }

    pub fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    pub fn instructions(&self, quote: &Quote) -> PaymentInstructions {
        let settings = self.verifier.settings();

        PaymentInstructions {
            type_: "x402.payment_required".to_string(),
            payment: PaymentDetails {
                chain_id: self.chain_id,
                asset: "USDC".to_string(),
                contract: format!("{:?}", settings.token_contract),
                recipient: format!("{:?}", settings.receiving_address),
                amount_units: quote.total_units,
                amount_usd: units_to_usd(quote.total_units),
                decimals: TOKEN_DECIMALS,
            },
            instructions: PaymentFormat {
                header: PAYMENT_HEADER.to_string(),
                format: "transaction_hash".to_string(),
            },
        }
    }

    /// Verify the payment named in `headers` covers `quote`.
    pub async fn charge(
        &self,
        headers: &HeaderMap,
        quote: &Quote,
        endpoint: &str,
    ) -> Result<PaymentProof, GatewayError> {
        let Some(tx_ref) = payment_reference(headers) else {
            return Err(GatewayError::PaymentRequired(Box::new(self.instructions(quote))));
        };

        match self.verifier.verify_units(quote.total_units, tx_ref).await {
            Ok(proof) => {
                self.analytics.record_payment(&proof, endpoint);
                Ok(proof)
            }
            Err(e) => {
                self.analytics.record_rejection(&e);
                Err(e.into())
            }
        }
    }
}
