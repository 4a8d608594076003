//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: an Ethereum JSON-RPC gateway for real
//! deployments and an in-memory contract simulation for demos and tests.

pub mod abi;
mod in_memory;
mod json_rpc;

pub use abi::AbiError;
pub use in_memory::InMemoryLedger;
pub use json_rpc::{
    JsonRpcError, JsonRpcLedgerGateway, JsonRpcRequest, JsonRpcResponse, RpcFailure,
    TransactionReceipt, TransactionRequest,
};
