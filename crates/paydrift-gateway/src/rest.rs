//! REST implementation of [`ExchangeGateway`].
//!
//! Speaks the exchange's capital API: deposit history, deposit address,
//! withdrawal submission, withdrawal history. Every call shares one
//! `reqwest` client with a bounded timeout; responses are read as text
//! first so empty bodies and non-JSON error pages degrade into typed
//! errors instead of panics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paydrift_types::{
    constants, Address, DepositEvent, DepositEventStatus, ExternalTxId, PaydriftError, Result,
    WithdrawalStatusEvent,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::exchange::{ExchangeGateway, WithdrawalReceipt};

/// Connection settings for the REST gateway.
#[derive(Debug, Clone)]
pub struct RestGatewayConfig {
    /// Base URL of the exchange API.
    pub base_url: String,
    /// API key sent on every request.
    pub api_key: String,
    /// Coin symbol used for withdrawal submissions.
    pub coin: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl RestGatewayConfig {
    /// Config with the default coin and timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            coin: constants::DEFAULT_COIN.to_string(),
            timeout_secs: constants::GATEWAY_TIMEOUT_SECS,
        }
    }
}

/// HTTP gateway to the custodial exchange.
pub struct RestGateway {
    http: reqwest::Client,
    config: RestGatewayConfig,
}

impl RestGateway {
    /// Build the gateway, installing the bounded timeout on the client.
    ///
    /// # Errors
    /// Returns [`PaydriftError::Configuration`] if the HTTP client cannot
    /// be constructed.
    pub fn new(config: RestGatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaydriftError::Configuration(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a request and return the response body, mapping transport and
    /// HTTP-level failures to typed gateway errors.
    async fn request_text(&self, req: reqwest::RequestBuilder) -> Result<String> {
        let resp = req
            .header("X-API-KEY", &self.config.api_key)
            .send()
            .await
            .map_err(map_request_err)?;

        let status = resp.status();
        let text = resp.text().await.map_err(map_request_err)?;

        if !status.is_success() {
            return Err(PaydriftError::GatewayRejected {
                reason: rejection_reason(status.as_u16(), &text),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl ExchangeGateway for RestGateway {
    async fn deposit_address(&self, coin: &str, network: &str) -> Result<Address> {
        let req = self.http.get(self.url("/v1/capital/deposit/address")).query(&[
            ("coin", coin),
            ("network", network),
        ]);
        let text = self.request_text(req).await?;
        let row: AddressRow = decode(&text)?;
        Ok(row.address)
    }

    async fn deposit_history(
        &self,
        coin: &str,
        network: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DepositEvent>> {
        let mut query = vec![
            ("coin".to_string(), coin.to_string()),
            ("startTime".to_string(), start.timestamp_millis().to_string()),
        ];
        if let Some(end) = end {
            query.push(("endTime".to_string(), end.timestamp_millis().to_string()));
        }

        let req = self
            .http
            .get(self.url("/v1/capital/deposit/history"))
            .query(&query);
        let text = self.request_text(req).await?;

        // The exchange answers an empty body when there is nothing to report.
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<DepositRow> = decode(&text)?;
        Ok(rows
            .into_iter()
            .filter(|row| row.coin == coin && row.network == network)
            .map(DepositEvent::from)
            .collect())
    }

    async fn create_withdrawal(
        &self,
        address: &str,
        amount: Decimal,
        network: &str,
    ) -> Result<WithdrawalReceipt> {
        let body = json!({
            "coin": self.config.coin,
            "network": network,
            "address": address,
            "amount": amount.to_string(),
        });
        let req = self
            .http
            .post(self.url("/v1/capital/withdraw/apply"))
            .json(&body);
        let text = self.request_text(req).await?;
        let ack: WithdrawAck = decode(&text)?;
        Ok(WithdrawalReceipt {
            external_id: ExternalTxId::new(ack.id),
        })
    }

    async fn withdrawal_history(
        &self,
        coin: &str,
        network: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalStatusEvent>> {
        let req = self
            .http
            .get(self.url("/v1/capital/withdraw/history"))
            .query(&[
                ("coin", coin.to_string()),
                ("startTime", start.timestamp_millis().to_string()),
            ]);
        let text = self.request_text(req).await?;

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<WithdrawRow> = decode(&text)?;
        Ok(rows
            .into_iter()
            .filter(|row| row.coin == coin && row.network == network)
            .map(WithdrawalStatusEvent::from)
            .collect())
    }

    fn gateway_name(&self) -> &'static str {
        "rest"
    }
}

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositRow {
    tx_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
    status: i64,
    coin: String,
    network: String,
    insert_time: i64,
}

impl From<DepositRow> for DepositEvent {
    fn from(row: DepositRow) -> Self {
        Self {
            tx_id: ExternalTxId::new(row.tx_id),
            amount: row.amount,
            status: DepositEventStatus::from_code(row.status),
            coin: row.coin,
            network: row.network,
            observed_at: DateTime::from_timestamp_millis(row.insert_time).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddressRow {
    address: String,
}

#[derive(Debug, Deserialize)]
struct WithdrawAck {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawRow {
    id: String,
    status: String,
    coin: String,
    network: String,
    update_time: i64,
}

impl From<WithdrawRow> for WithdrawalStatusEvent {
    fn from(row: WithdrawRow) -> Self {
        Self {
            external_id: ExternalTxId::new(row.id),
            status: row.status,
            updated_at: DateTime::from_timestamp_millis(row.update_time).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_request_err(err: reqwest::Error) -> PaydriftError {
    if err.is_timeout() {
        PaydriftError::GatewayTimeout
    } else {
        PaydriftError::GatewayRequest {
            reason: err.to_string(),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| PaydriftError::GatewayResponse {
        reason: format!("{e}: {}", truncate(text)),
    })
}

/// Prefer the exchange's structured error message; fall back to raw text.
fn rejection_reason(status: u16, body: &str) -> String {
    let msg = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.message));
    match msg {
        Some(msg) => format!("HTTP {status}: {msg}"),
        None => format!("HTTP {status}: {}", truncate(body)),
    }
}

fn truncate(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(100)
        .map_or(text.len(), |(idx, _)| idx);
    &text[..end]
}
