pub mod analytics;
pub mod chain;
pub mod pricing;
pub mod replay;
pub mod verifier;

pub use analytics::Analytics;
pub use chain::{ChainClient, ChainError, PaymentReference, RpcChainClient, TransferEvent};
pub use pricing::{Operation, PriceTable, PricingError, Quote};
pub use replay::ReplayGuard;
pub use verifier::{PaymentError, PaymentProof, PaymentVerifier, VerifierSettings};
