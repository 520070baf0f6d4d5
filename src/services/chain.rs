//! JSON-RPC adapter for the settlement chain.
//!
//! Fetches transaction receipts and decodes ERC-20 `Transfer` logs out of them.

use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, Log, TransactionReceipt, H256, U256},
    utils::keccak256,
};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Canonical event signature of a fungible-token transfer notification.
pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

/// Why a receipt could not be obtained.
///
/// Callers of the verifier only ever see `TransactionNotFound`; the cause is kept
/// for operators reading logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("malformed transaction hash: {0}")]
    MalformedHash(String),

    #[error("transaction is not known to the node")]
    NotIndexed,

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("rpc call timed out after {0:?}")]
    Timeout(Duration),
}

impl ChainError {
    pub fn code(&self) -> &'static str {
        match self {
            ChainError::MalformedHash(_) => "MALFORMED_HASH",
            ChainError::NotIndexed => "NOT_INDEXED",
            ChainError::Rpc(_) => "RPC_ERROR",
            ChainError::Timeout(_) => "RPC_TIMEOUT",
        }
    }
}

/// A transaction hash supplied by a caller as proof of payment.
///
/// Parsing accepts an optional `0x` prefix and any hex casing, so every spelling of
/// the same transaction maps to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentReference(H256);

impl PaymentReference {
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 64 {
            return Err(ChainError::MalformedHash(format!(
                "expected 64 hex digits, got {}",
                digits.len()
            )));
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| ChainError::MalformedHash(e.to_string()))?;

        Ok(Self(H256::from(bytes)))
    }

    pub fn as_h256(&self) -> H256 {
        self.0
    }
}

impl From<H256> for PaymentReference {
    fn from(hash: H256) -> Self {
        Self(hash)
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl Serialize for PaymentReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decoded `Transfer(from, to, value)` log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch the receipt of a mined transaction.
    async fn fetch_receipt(
        &self,
        reference: &PaymentReference,
    ) -> Result<TransactionReceipt, ChainError>;

    /// Latest block number, used as a liveness probe.
    async fn block_number(&self) -> Result<u64, ChainError>;
}

/// [`ChainClient`] backed by an HTTP JSON-RPC endpoint.
pub struct RpcChainClient {
    provider: Arc<Provider<Http>>,
    timeout: Duration,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);

        tracing::info!("Chain RPC client configured for {} (timeout {:?})", rpc_url, timeout);

        Ok(Self { provider, timeout })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn fetch_receipt(
        &self,
        reference: &PaymentReference,
    ) -> Result<TransactionReceipt, ChainError> {
        let call = self.provider.get_transaction_receipt(reference.as_h256());

        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ChainError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(ChainError::Rpc(e.to_string())),
            Ok(Ok(None)) => Err(ChainError::NotIndexed),
            Ok(Ok(Some(receipt))) => Ok(receipt),
        }
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        match tokio::time::timeout(self.timeout, self.provider.get_block_number()).await {
            Err(_) => Err(ChainError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(ChainError::Rpc(e.to_string())),
            Ok(Ok(number)) => Ok(number.as_u64()),
        }
    }
}

pub fn transfer_topic() -> H256 {
    H256::from(keccak256(TRANSFER_EVENT_SIGNATURE.as_bytes()))
}

/// Decode every transfer emitted by `token` in `receipt`, in log order.
///
/// Logs from other contracts, with a different topic0, or whose shape does not match
/// two indexed addresses plus one data word are skipped.
pub fn decode_transfers(receipt: &TransactionReceipt, token: Address) -> Vec<TransferEvent> {
    let topic = transfer_topic();

    receipt
        .logs
        .iter()
        .filter(|log| log.address == token)
        .filter_map(|log| decode_transfer(log, topic))
        .collect()
}

fn decode_transfer(log: &Log, topic: H256) -> Option<TransferEvent> {
    if log.topics.len() != 3 || log.topics[0] != topic || log.data.len() != 32 {
        tracing::debug!(
            "Skipping log from {:?}: topics={}, data_len={}",
            log.address,
            log.topics.len(),
            log.data.len()
        );
        return None;
    }

    Some(TransferEvent {
        from: Address::from(log.topics[1]),
        to: Address::from(log.topics[2]),
        amount: U256::from_big_endian(&log.data),
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use ethers::types::Bytes;
    use serde_json::json;

    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[test]
    fn test_reference_normalises_case_and_prefix() {
        let lower = PaymentReference::parse(HASH).unwrap();
        let upper = PaymentReference::parse(&HASH[2..].to_uppercase()).unwrap();

        assert_eq!(lower, upper);
        assert_eq!(upper.to_string(), HASH);
    }

    #[test]
    fn test_reference_rejects_malformed_input() {
        assert!(matches!(
            PaymentReference::parse("0x1234"),
            Err(ChainError::MalformedHash(_))
        ));
        assert!(matches!(
            PaymentReference::parse(&format!("0x{}", "zz".repeat(32))),
            Err(ChainError::MalformedHash(_))
        ));
        assert!(PaymentReference::parse("").is_err());
    }

    #[test]
    fn test_transfer_topic_matches_erc20() {
        assert_eq!(
            format!("{:?}", transfer_topic()),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_decode_preserves_log_order() {
        let token = address(0xaa);
        let receipt = receipt(
            1,
            vec![
                transfer_log(token, address(1), address(2), 10),
                transfer_log(token, address(3), address(4), 20),
            ],
        );

        let transfers = decode_transfers(&receipt, token);

        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].to, address(2));
        assert_eq!(transfers[1].amount, U256::from(20));
    }

    #[test]
    fn test_decode_skips_foreign_and_malformed_logs() {
        let token = address(0xaa);
        let mut approval = transfer_log(token, address(1), address(2), 5);
        approval.topics[0] = H256::repeat_byte(0x8c);
        let mut short_data = transfer_log(token, address(1), address(2), 5);
        short_data.data = Bytes::from(vec![0u8; 16]);

        let receipt = receipt(
            1,
            vec![
                transfer_log(address(0xbb), address(1), address(2), 99),
                approval,
                short_data,
                transfer_log(token, address(5), address(6), 7),
            ],
        );

        let transfers = decode_transfers(&receipt, token);

        assert_eq!(
            transfers,
            vec![TransferEvent {
                from: address(5),
                to: address(6),
                amount: U256::from(7)
            }]
        );
    }

    fn rpc_result(result: serde_json::Value) -> String {
        json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
    }

    #[tokio::test]
    async fn test_rpc_client_fetches_receipt() {
        let mut server = mockito::Server::new_async().await;
        let token = address(0xaa);
        let expected = receipt(1, vec![transfer_log(token, address(1), address(2), 30_000)]);

        let _mock = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(
                json!({ "method": "eth_getTransactionReceipt" }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_result(serde_json::to_value(&expected).unwrap()))
            .create_async()
            .await;

        let client = RpcChainClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let fetched = client
            .fetch_receipt(&PaymentReference::parse(HASH).unwrap())
            .await
            .unwrap();

        assert_eq!(fetched.status, expected.status);
        assert_eq!(decode_transfers(&fetched, token).len(), 1);
    }

    #[tokio::test]
    async fn test_rpc_client_maps_null_result_to_not_indexed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_result(serde_json::Value::Null))
            .create_async()
            .await;

        let client = RpcChainClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let result = client
            .fetch_receipt(&PaymentReference::parse(HASH).unwrap())
            .await;

        assert_eq!(result.unwrap_err(), ChainError::NotIndexed);
    }

    #[tokio::test]
    async fn test_rpc_client_maps_server_error_to_rpc() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = RpcChainClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let result = client
            .fetch_receipt(&PaymentReference::parse(HASH).unwrap())
            .await;

        assert!(matches!(result, Err(ChainError::Rpc(_))));
    }

    #[tokio::test]
    async fn test_rpc_client_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(100);
        let client = RpcChainClient::new(&format!("http://{}", addr), timeout).unwrap();
        let result = client
            .fetch_receipt(&PaymentReference::parse(HASH).unwrap())
            .await;

        assert_eq!(result.unwrap_err(), ChainError::Timeout(timeout));
    }
}
