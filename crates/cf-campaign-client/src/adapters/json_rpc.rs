//! # JSON-RPC Ledger Gateway
//!
//! Ethereum JSON-RPC adapter for the crowdfunding contract. Reads go through
//! `eth_call`; writes through `eth_sendTransaction` from an account the node
//! holds unlocked; settlement polls `eth_getTransactionReceipt`.
//!
//! Error mapping:
//! - transport and decoding failures are `Gateway`
//! - execution errors returned on submission are `Rejected`
//! - a receipt with status `0x0` is `Rejected`

use super::abi::{self, signatures, AbiError, Token};
use crate::config::{ConfigError, JsonRpcConfig};
use crate::domain::{
    ActionKind, Address, Amount, Campaign, CampaignId, LedgerError, PendingWrite, Settlement,
    TokenBalance, TxHash,
};
use crate::ports::{BalanceReader, IdentityProvider, LedgerReader, LedgerWriter};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// JSON-RPC error codes treated as an explicit refusal of a write.
///
/// `3` execution reverted, `-32000` node-side rejection (insufficient funds,
/// nonce, gas), `4001` user rejected.
const REJECTION_CODES: [i64; 3] = [3, -32000, 4001];

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<T> {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: String,
    /// Positional params.
    pub params: T,
    /// Request id.
    pub id: u64,
}

impl<T> JsonRpcRequest<T> {
    /// Build a request.
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    /// Result, absent on error and `null` for pending lookups.
    pub result: Option<T>,
    /// Error object.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Optional payload (revert data).
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC Error {}: {}", self.code, self.message)
    }
}

/// Failure of a single JSON-RPC exchange.
#[derive(Debug, Error)]
pub enum RpcFailure {
    /// Request never produced a response.
    #[error("Transport failure: {0}")]
    Transport(String),
    /// Node answered with an error object.
    #[error("{0}")]
    Rpc(JsonRpcError),
    /// Response could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl From<AbiError> for RpcFailure {
    fn from(e: AbiError) -> Self {
        RpcFailure::Parse(e.to_string())
    }
}

impl RpcFailure {
    /// Mapping for reads: everything is an infrastructure failure.
    pub fn into_read_error(self) -> LedgerError {
        LedgerError::Gateway(self.to_string())
    }

    /// Mapping for write submission.
    pub fn into_write_error(self) -> LedgerError {
        match self {
            RpcFailure::Rpc(error) if REJECTION_CODES.contains(&error.code) => {
                LedgerError::Rejected(error.message)
            }
            other => LedgerError::Gateway(other.to_string()),
        }
    }
}

/// `eth_call` / `eth_sendTransaction` object.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Target contract.
    pub to: String,
    /// Calldata.
    pub data: String,
    /// Attached value (quantity).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Subset of a transaction receipt.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// `0x1` success, `0x0` reverted.
    #[serde(default)]
    pub status: Option<String>,
    /// Inclusion block.
    #[serde(default)]
    pub block_number: Option<String>,
}

impl TransactionReceipt {
    /// Convert into a settlement, or `Rejected` when the write reverted.
    pub fn into_settlement(self, tx_hash: TxHash) -> Result<Settlement, LedgerError> {
        if self.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Rejected(format!(
                "Transaction {:?} reverted",
                tx_hash
            )));
        }
        Ok(Settlement {
            tx_hash,
            block_number: self
                .block_number
                .as_deref()
                .and_then(|n| abi::quantity_to_u64(n).ok()),
        })
    }
}

/// Ledger gateway over Ethereum JSON-RPC.
pub struct JsonRpcLedgerGateway {
    client: Client,
    config: JsonRpcConfig,
    request_id: AtomicU64,
}

impl JsonRpcLedgerGateway {
    /// Create a new gateway. Validates the configuration.
    pub fn new(config: JsonRpcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(1),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &JsonRpcConfig {
        &self.config
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call a JSON-RPC method whose result may be `null`.
    async fn call_nullable<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, RpcFailure> {
        let request = JsonRpcRequest::new(method, params, self.next_id());

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RpcFailure::Transport(format!("Cannot connect to {}", self.config.endpoint))
                } else {
                    RpcFailure::Transport(e.to_string())
                }
            })?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Parse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcFailure::Rpc(error));
        }
        Ok(rpc_response.result)
    }

    /// Call a JSON-RPC method.
    async fn call<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcFailure> {
        self.call_nullable(method, params)
            .await?
            .ok_or_else(|| RpcFailure::Parse("Missing result in response".to_string()))
    }

    /// `eth_call` against `to` at the latest block.
    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcFailure> {
        let request = TransactionRequest {
            from: None,
            to: abi::to_hex(to.as_bytes()),
            data: abi::to_hex(&data),
            value: None,
        };
        let raw: String = self.call("eth_call", (request, "latest")).await?;
        Ok(abi::from_hex(&raw)?)
    }

    async fn contract_call(&self, signature: &str, args: &[Token]) -> Result<Vec<u8>, LedgerError> {
        self.eth_call(self.config.contract_address, abi::encode_call(signature, args))
            .await
            .map_err(RpcFailure::into_read_error)
    }

    async fn sender(&self) -> Result<Address, LedgerError> {
        self.current_identity()
            .await?
            .ok_or_else(|| LedgerError::Gateway("Node exposes no account to send from".into()))
    }

    async fn send(
        &self,
        kind: ActionKind,
        data: Vec<u8>,
        value: Option<Amount>,
    ) -> Result<PendingWrite, LedgerError> {
        let from = self.sender().await?;
        let request = TransactionRequest {
            from: Some(abi::to_hex(from.as_bytes())),
            to: abi::to_hex(self.config.contract_address.as_bytes()),
            data: abi::to_hex(&data),
            value: value.map(abi::u256_to_quantity),
        };

        let raw: String = self
            .call("eth_sendTransaction", [request])
            .await
            .map_err(RpcFailure::into_write_error)?;
        let bytes = abi::from_hex(&raw).map_err(|e| LedgerError::Gateway(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(LedgerError::Gateway(format!("Malformed transaction hash {}", raw)));
        }
        let tx_hash = TxHash::from_slice(&bytes);

        info!(action = %kind, tx = ?tx_hash, "Transaction submitted");
        Ok(PendingWrite { tx_hash, kind })
    }
}

fn parse_address(text: &str) -> Result<Address, LedgerError> {
    let bytes = abi::from_hex(text).map_err(|e| LedgerError::Gateway(e.to_string()))?;
    if bytes.len() != 20 {
        return Err(LedgerError::Gateway(format!("Malformed address {}", text)));
    }
    Ok(Address::from_slice(&bytes))
}

#[async_trait]
impl IdentityProvider for JsonRpcLedgerGateway {
    async fn current_identity(&self) -> Result<Option<Address>, LedgerError> {
        if let Some(from) = self.config.from {
            return Ok(Some(from));
        }
        let accounts: Vec<String> = self
            .call("eth_accounts", [(); 0])
            .await
            .map_err(RpcFailure::into_read_error)?;
        accounts.first().map(|a| parse_address(a)).transpose()
    }

    async fn current_network_id(&self) -> Result<u64, LedgerError> {
        let raw: String = self
            .call("eth_chainId", [(); 0])
            .await
            .map_err(RpcFailure::into_read_error)?;
        abi::quantity_to_u64(&raw).map_err(|e| LedgerError::Gateway(e.to_string()))
    }
}

#[async_trait]
impl LedgerReader for JsonRpcLedgerGateway {
    async fn campaign_count(&self) -> Result<u64, LedgerError> {
        let data = self.contract_call(signatures::GET_CAMPAIGN_COUNT, &[]).await?;
        abi::decode_u64(&data, 0).map_err(|e| LedgerError::Gateway(e.to_string()))
    }

    async fn campaign(&self, id: CampaignId) -> Result<Campaign, LedgerError> {
        debug!(campaign = %id, "Reading campaign");
        let data = self
            .contract_call(signatures::GET_CAMPAIGN, &[Token::Uint(Amount::from(id.index()))])
            .await?;
        abi::decode_campaign(id, &data).map_err(|e| LedgerError::Gateway(e.to_string()))
    }

    async fn contribution_of(
        &self,
        id: CampaignId,
        identity: Address,
    ) -> Result<Amount, LedgerError> {
        let data = self
            .contract_call(
                signatures::CONTRIBUTIONS,
                &[Token::Uint(Amount::from(id.index())), Token::Address(identity)],
            )
            .await?;
        abi::decode_uint(&data, 0).map_err(|e| LedgerError::Gateway(e.to_string()))
    }
}

#[async_trait]
impl LedgerWriter for JsonRpcLedgerGateway {
    async fn submit_contribute(
        &self,
        id: CampaignId,
        amount: Amount,
    ) -> Result<PendingWrite, LedgerError> {
        let data = abi::encode_call(signatures::CONTRIBUTE, &[Token::Uint(Amount::from(id.index()))]);
        self.send(ActionKind::Contribute, data, Some(amount)).await
    }

    async fn submit_finalize(&self, id: CampaignId) -> Result<PendingWrite, LedgerError> {
        let data = abi::encode_call(signatures::FINALIZE, &[Token::Uint(Amount::from(id.index()))]);
        self.send(ActionKind::Finalize, data, None).await
    }

    async fn submit_claim_refund(&self, id: CampaignId) -> Result<PendingWrite, LedgerError> {
        let data =
            abi::encode_call(signatures::CLAIM_REFUND, &[Token::Uint(Amount::from(id.index()))]);
        self.send(ActionKind::ClaimRefund, data, None).await
    }

    async fn submit_create_campaign(
        &self,
        title: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<PendingWrite, LedgerError> {
        let data = abi::encode_call(
            signatures::CREATE_CAMPAIGN,
            &[
                Token::String(title.to_string()),
                Token::Uint(goal),
                Token::Uint(Amount::from(duration_secs)),
            ],
        );
        self.send(ActionKind::CreateCampaign, data, None).await
    }

    async fn await_settlement(&self, write: &PendingWrite) -> Result<Settlement, LedgerError> {
        let hash = abi::to_hex(write.tx_hash.as_bytes());
        let mut failures = 0u32;

        loop {
            match self
                .call_nullable::<_, TransactionReceipt>("eth_getTransactionReceipt", [&hash])
                .await
            {
                Ok(Some(receipt)) => return receipt.into_settlement(write.tx_hash),
                Ok(None) => {
                    failures = 0;
                    debug!(tx = %hash, "Receipt pending");
                }
                Err(e) => {
                    failures += 1;
                    warn!(tx = %hash, failures, "Receipt poll failed: {}", e);
                    if failures > self.config.max_receipt_poll_failures {
                        return Err(e.into_read_error());
                    }
                }
            }
            tokio::time::sleep(self.config.receipt_poll_interval()).await;
        }
    }
}

#[async_trait]
impl BalanceReader for JsonRpcLedgerGateway {
    async fn native_balance(&self, identity: Address) -> Result<Amount, LedgerError> {
        let raw: String = self
            .call("eth_getBalance", (abi::to_hex(identity.as_bytes()), "latest"))
            .await
            .map_err(RpcFailure::into_read_error)?;
        abi::quantity_to_u256(&raw).map_err(|e| LedgerError::Gateway(e.to_string()))
    }

    async fn token_balance(
        &self,
        identity: Address,
    ) -> Result<Option<TokenBalance>, LedgerError> {
        let Some(token) = self.config.token_address else {
            return Ok(None);
        };
        let read = |signature: &'static str, args: Vec<Token>| async move {
            self.eth_call(token, abi::encode_call(signature, &args))
                .await
                .map_err(RpcFailure::into_read_error)
        };
        let decode_err = |e: AbiError| LedgerError::Gateway(e.to_string());

        let symbol = abi::decode_string(&read(signatures::SYMBOL, vec![]).await?, 0)
            .map_err(decode_err)?;
        let decimals =
            abi::decode_u8(&read(signatures::DECIMALS, vec![]).await?, 0).map_err(decode_err)?;
        let amount = abi::decode_uint(
            &read(signatures::BALANCE_OF, vec![Token::Address(identity)]).await?,
            0,
        )
        .map_err(decode_err)?;

        Ok(Some(TokenBalance {
            symbol,
            decimals,
            amount,
        }))
    }
}
