use serde::{Deserialize, Serialize};

/// Body attached to a 402 when a paid endpoint is called without a payment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentInstructions {
    #[serde(rename = "type")]
    pub type_: String,
    pub payment: PaymentDetails,
    pub instructions: PaymentFormat,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub chain_id: u64,
    pub asset: String,
    pub contract: String,
    pub recipient: String,
    pub amount_units: u64,
    pub amount_usd: f64,
    pub decimals: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentFormat {
    pub header: String,
    pub format: String,
}
