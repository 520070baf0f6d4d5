use crate::contracts::IERC20;
use crate::services::pricing::{units_to_usd, TOKEN_DECIMALS};
use anyhow::{Context, Result};
use ethers::{
    prelude::*,
    providers::{Http, Provider},
    types::{Address, U256, U64},
};
use std::sync::Arc;

/// Units a payer should send for `amount_usd`: rounded up, never zero.
pub fn payment_units(amount_usd: f64) -> u64 {
    // Trim float noise below a thousandth of a unit before rounding up.
    let scaled = (amount_usd * 10f64.powi(TOKEN_DECIMALS as i32) * 1000.0).round() / 1000.0;
    let units = scaled.ceil();
    if units.is_finite() && units >= 1.0 {
        units as u64
    } else {
        1
    }
}

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Pays the gateway in the settlement token from a local key.
pub struct PaymentClient {
    signer: Arc<SignerClient>,
    token: IERC20<SignerClient>,
}

impl PaymentClient {
    /// Connect and check that `token_address` uses the gateway's decimals.
    pub async fn new(
        rpc_url: &str,
        private_key: &str,
        chain_id: u64,
        token_address: Address,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url).context("Invalid CHAIN_RPC_URL")?;
        let wallet = private_key
            .parse::<LocalWallet>()
            .context("Invalid PAYER_PRIVATE_KEY")?
            .with_chain_id(chain_id);

        let signer = Arc::new(SignerMiddleware::new(provider, wallet));
        let token = IERC20::new(token_address, signer.clone());

        let decimals = token.decimals().call().await.context("Failed to read token decimals")?;
        if u32::from(decimals) != TOKEN_DECIMALS {
            anyhow::bail!(
                "Token {:?} has {} decimals, gateway prices in {}",
                token_address,
                decimals,
                TOKEN_DECIMALS
            );
        }

        Ok(Self { signer, token })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub async fn balance_units(&self) -> Result<U256> {
        Ok(self.token.balance_of(self.address()).call().await?)
    }

    pub async fn get_usdc_balance(&self) -> Result<f64> {
        let units = self.balance_units().await?;
        Ok(units_to_usd(units.min(U256::from(u64::MAX)).as_u64()))
    }

    /// Transfer `units` to `recipient` and return the hash once it has one confirmation.
    pub async fn send_usdc_payment(&self, units: u64, recipient: Address) -> Result<H256> {
        let amount = U256::from(units);
        let balance = self.balance_units().await?;
        if balance < amount {
            anyhow::bail!("Insufficient USDC balance: {} < {} units", balance, units);
        }

        tracing::info!(units, recipient = ?recipient, "Sending ${} USDC", units_to_usd(units));

        let call = self.token.transfer(recipient, amount);
        let pending = call.send().await.context("Failed to send USDC transfer")?;
        let tx_hash = *pending;

        tracing::info!(tx_hash = ?tx_hash, "Transfer submitted, waiting for confirmation");

        let receipt = pending
            .confirmations(1)
            .await
            .context("Failed to get transaction receipt")?
            .with_context(|| format!("Transaction {:?} dropped", tx_hash))?;

        if receipt.status != Some(U64::one()) {
            anyhow::bail!("Transaction {:?} reverted", tx_hash);
        }

        Ok(receipt.transaction_hash)
    }
}
