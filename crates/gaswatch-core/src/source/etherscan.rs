//! Etherscan gas oracle client

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::{Result, RetrievalError};
use crate::models::{GasQuote, PriceObservation};

use super::PriceSource;

const SOURCE_NAME: &str = "etherscan:gasoracle";

/// Envelope shared by every Etherscan endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// `result` object of `module=gastracker&action=gasoracle`; numbers arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GasOracleResult {
    safe_gas_price: String,
    propose_gas_price: String,
    fast_gas_price: String,
    #[serde(rename = "suggestBaseFee", default)]
    suggest_base_fee: Option<String>,
    #[serde(default)]
    last_block: Option<String>,
}

/// Fetches the proposed gas price from the Etherscan gas oracle
pub struct EtherscanSource {
    client: Client,
    api_url: String,
    chain_id: String,
    api_key: Option<String>,
}

impl EtherscanSource {
    /// Create a new source from configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RetrievalError::from)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            chain_id: config.chain_id.to_string(),
            api_key: config.api_key().map(String::from),
        })
    }
}

#[async_trait::async_trait]
impl PriceSource for EtherscanSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> std::result::Result<PriceObservation, RetrievalError> {
        let mut request = self
            .client
            .get(&self.api_url)
            .query(&[
                ("chainid", self.chain_id.as_str()),
                ("module", "gastracker"),
                ("action", "gasoracle"),
            ]);

        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        // reqwest errors carry the URL, which embeds the API key
        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RetrievalError::Http(e.without_url()))?;
        let quote = parse_gas_oracle(&body)?;

        debug!(
            url = %self.api_url,
            safe = quote.safe,
            propose = quote.propose,
            fast = quote.fast,
            last_block = ?quote.last_block,
            "Gas oracle reading"
        );

        Ok(PriceObservation::new(quote.propose, SOURCE_NAME).with_quote(quote))
    }
}

/// Parse a gas oracle response body
pub fn parse_gas_oracle(body: &[u8]) -> std::result::Result<GasQuote, RetrievalError> {
    let envelope: ApiResponse = serde_json::from_slice(body)
        .map_err(|e| RetrievalError::malformed(format!("invalid JSON: {e}")))?;

    if envelope.status != "1" {
        let detail = match &envelope.result {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        return Err(RetrievalError::Api {
            message: envelope.message,
            detail,
        });
    }

    let result: GasOracleResult = serde_json::from_value(envelope.result)
        .map_err(|e| RetrievalError::malformed(format!("unexpected result shape: {e}")))?;

    Ok(GasQuote {
        safe: parse_price("SafeGasPrice", &result.safe_gas_price)?,
        propose: parse_price("ProposeGasPrice", &result.propose_gas_price)?,
        fast: parse_price("FastGasPrice", &result.fast_gas_price)?,
        suggest_base_fee: result
            .suggest_base_fee
            .as_deref()
            .map(|raw| parse_price("suggestBaseFee", raw))
            .transpose()?,
        last_block: result
            .last_block
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| RetrievalError::malformed(format!("LastBlock is not a block number: {raw:?}")))
            })
            .transpose()?,
    })
}

fn parse_price(field: &str, raw: &str) -> std::result::Result<f64, RetrievalError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| RetrievalError::malformed(format!("{field} is not a price: {raw:?}")))
}
