use anyhow::{Context, Result};
use ethers::types::Address;
use paygate::client::{payment_units, PaymentClient};
use paygate::config::{DEFAULT_CHAIN_ID, DEFAULT_CHAIN_RPC_URL};
use paygate::middleware::PAYMENT_HEADER;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let base_url = std::env::var("PAYGATE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let private_key = std::env::var("PAYER_PRIVATE_KEY").context("PAYER_PRIVATE_KEY required")?;
    let rpc_url = std::env::var("CHAIN_RPC_URL").unwrap_or_else(|_| DEFAULT_CHAIN_RPC_URL.to_string());
    let chain_id = std::env::var("CHAIN_ID")
        .map(|v| v.parse::<u64>())
        .unwrap_or(Ok(DEFAULT_CHAIN_ID))
        .context("Invalid CHAIN_ID")?;
    let models: Vec<String> = std::env::var("MODELS")
        .unwrap_or_else(|_| "sdxl".to_string())
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let prompt = std::env::var("PROMPT").unwrap_or_else(|_| "a lighthouse at dusk, oil painting".to_string());

    let http = Client::new();
    let info: Value = http.get(format!("{}/", base_url)).send().await?.json().await?;
    let contract = address_field(&info["payment_info"]["contract"])?;

    let listing: Value = http.get(format!("{}/models", base_url)).send().await?.json().await?;
    let listed_usd = models
        .iter()
        .map(|m| {
            listing["available_models"][m.as_str()]["cost_usd"]
                .as_f64()
                .with_context(|| format!("model {} is not listed", m))
        })
        .sum::<Result<f64>>()?;

    println!("paygate client");
    println!("==============");
    println!("Server: {}", base_url);
    println!("Models: {}", models.join(", "));
    println!("Listed price: ${:.6}", listed_usd);
    println!();

    let payment_client = PaymentClient::new(&rpc_url, &private_key, chain_id, contract).await?;
    println!("Payer: {:?}", payment_client.address());
    println!("USDC balance: {:.6}", payment_client.get_usdc_balance().await?);
    println!();

    let body = json!({ "prompt": prompt, "models": models });
    match generate_with_payment(&http, &base_url, &payment_client, &body, payment_units(listed_usd)).await {
        Ok(data) => {
            println!("[SUCCESS] Generation results:");
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Err(e) => println!("[FAILED] {:#}", e),
    }

    Ok(())
}

fn address_field(value: &Value) -> Result<Address> {
    let raw = value.as_str().context("address field missing")?;
    Address::from_str(raw).with_context(|| format!("invalid address {}", raw))
}

async fn generate_with_payment(
    http: &Client,
    base_url: &str,
    payment_client: &PaymentClient,
    body: &Value,
    max_units: u64,
) -> Result<Value> {
    let url = format!("{}/generate", base_url);

    println!("Step 1: Requesting a quote (expecting 402)...");
    let response = http.post(&url).json(body).send().await?;

    if response.status() != StatusCode::PAYMENT_REQUIRED {
        anyhow::bail!("Expected 402 Payment Required, got {}", response.status());
    }

    let rejection: Value = response.json().await?;
    let payment = &rejection["payment_instructions"]["payment"];
    let units = payment["amount_units"]
        .as_u64()
        .context("402 response carries no amount")?;
    let recipient = address_field(&payment["recipient"])?;
    if units > max_units {
        anyhow::bail!("Quoted {} units exceeds listed price of {} units", units, max_units);
    }
    println!("   [OK] Price: {} units to {:?}", units, recipient);
    println!();

    println!("Step 2: Sending USDC payment...");
    let tx_hash = payment_client.send_usdc_payment(units, recipient).await?;
    println!("   [OK] Payment confirmed: {:?}", tx_hash);
    println!();

    println!("Step 3: Retrying request with payment proof...");
    let response = http
        .post(&url)
        .header(PAYMENT_HEADER, format!("{:?}", tx_hash))
        .json(body)
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Request failed: {}", error_text);
    }

    println!("   [OK] Payment verified!");
    println!();

    Ok(response.json().await?)
}
