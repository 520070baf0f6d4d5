use crate::services::PriceTable;
use anyhow::{bail, Context, Result};
use ethers::types::Address;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CHAIN_RPC_URL: &str = "https://api.avax-test.network/ext/bc/C/rpc";
pub const DEFAULT_CHAIN_ID: u64 = 43113;
pub const DEFAULT_REPLICATE_API_URL: &str = "https://api.replicate.com/v1";

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Settlement chain
    pub chain_rpc_url: String,
    pub chain_id: u64,
    pub rpc_timeout: Duration,
    pub usdc_address: Address,
    pub receiving_address: Address,

    // Generation provider
    pub replicate_api_url: String,
    pub replicate_api_token: String,
    pub generation_timeout: Duration,

    pub price_table_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate a config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} required", key))
        };

        let config = Self {
            environment: Self::parse_environment(&var("ENVIRONMENT", "development"))?,
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "8000").parse().context("Invalid PORT")?,

            chain_rpc_url: var("CHAIN_RPC_URL", DEFAULT_CHAIN_RPC_URL),
            chain_id: var("CHAIN_ID", &DEFAULT_CHAIN_ID.to_string())
                .parse()
                .context("Invalid CHAIN_ID")?,
            rpc_timeout: Duration::from_secs(
                var("RPC_TIMEOUT_SECS", "10")
                    .parse()
                    .context("Invalid RPC_TIMEOUT_SECS")?,
            ),
            usdc_address: Self::parse_address("USDC_CONTRACT_ADDRESS", &required("USDC_CONTRACT_ADDRESS")?)?,
            receiving_address: Self::parse_address(
                "RECEIVING_WALLET_ADDRESS",
                &required("RECEIVING_WALLET_ADDRESS")?,
            )?,

            replicate_api_url: var("REPLICATE_API_URL", DEFAULT_REPLICATE_API_URL),
            replicate_api_token: required("REPLICATE_API_TOKEN")?,
            generation_timeout: Duration::from_secs(
                var("GENERATION_TIMEOUT_SECS", "300")
                    .parse()
                    .context("Invalid GENERATION_TIMEOUT_SECS")?,
            ),

            price_table_path: lookup("PRICE_TABLE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment(env: &str) -> Result<Environment> {
        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_address(var: &str, value: &str) -> Result<Address> {
        let address = Address::from_str(value.trim())
            .with_context(|| format!("Invalid address for {}", var))?;
        if address.is_zero() {
            bail!("{} must not be the zero address", var);
        }
        Ok(address)
    }

    fn validate(&self) -> Result<()> {
        if !self.chain_rpc_url.starts_with("http") {
            bail!("CHAIN_RPC_URL must be HTTP(S) URL");
        }
        if !self.replicate_api_url.starts_with("http") {
            bail!("REPLICATE_API_URL must be HTTP(S) URL");
        }
        if self.rpc_timeout.is_zero() {
            bail!("RPC_TIMEOUT_SECS must be positive");
        }
        if self.usdc_address == self.receiving_address {
            bail!("RECEIVING_WALLET_ADDRESS must differ from USDC_CONTRACT_ADDRESS");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }

    pub fn load_price_table(&self) -> Result<PriceTable> {
        match &self.price_table_path {
            Some(path) => PriceTable::from_json_file(path),
            None => Ok(PriceTable::default()),
        }
    }
}
