use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GatewayInfo {
    pub message: String,
    pub payment_info: PaymentInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentInfo {
    pub currency: String,
    pub chain_id: u64,
    pub contract: String,
    pub receiver: String,
    pub decimals: u32,
    pub header: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelListing {
    pub available_models: BTreeMap<String, ModelInfo>,
    pub total_models: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_1000_chars: Option<f64>,
    pub identifier: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub chain_rpc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Stats {
    pub requests_total: u64,
    pub payments_granted: u64,
    pub payments_rejected: u64,
    pub rejections_by_kind: BTreeMap<String, u64>,
    pub revenue_units: u64,
    pub revenue_usd: f64,
    pub consumed_references: usize,
    pub uptime_seconds: u64,
}
