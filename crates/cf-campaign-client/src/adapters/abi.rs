//! # Contract ABI Codec
//!
//! Minimal Solidity ABI encoding for the crowdfunding contract and the ERC-20
//! read methods. Only the types those methods use are supported: `uint256`,
//! `address`, `bool`, `uint8` and `string`.

use crate::domain::{Address, Amount, Campaign, CampaignId};
use primitive_types::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// ABI word size.
pub const WORD: usize = 32;

/// Contract method signatures.
pub mod signatures {
    /// `createCampaign(string title, uint256 goalWei, uint256 durationSeconds)`
    pub const CREATE_CAMPAIGN: &str = "createCampaign(string,uint256,uint256)";
    /// `getCampaignCount() -> uint256`
    pub const GET_CAMPAIGN_COUNT: &str = "getCampaignCount()";
    /// `getCampaign(uint256) -> (address,string,uint256,uint256,uint256,bool,bool)`
    pub const GET_CAMPAIGN: &str = "getCampaign(uint256)";
    /// `contribute(uint256)` payable
    pub const CONTRIBUTE: &str = "contribute(uint256)";
    /// `finalize(uint256)`
    pub const FINALIZE: &str = "finalize(uint256)";
    /// `claimRefund(uint256)`
    pub const CLAIM_REFUND: &str = "claimRefund(uint256)";
    /// `contributions(uint256,address) -> uint256`
    pub const CONTRIBUTIONS: &str = "contributions(uint256,address)";
    /// ERC-20 `balanceOf(address) -> uint256`
    pub const BALANCE_OF: &str = "balanceOf(address)";
    /// ERC-20 `decimals() -> uint8`
    pub const DECIMALS: &str = "decimals()";
    /// ERC-20 `symbol() -> string`
    pub const SYMBOL: &str = "symbol()";
}

/// ABI decoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// Return data shorter than the layout requires.
    #[error("Return data too short: need {needed} bytes, got {got}")]
    TooShort {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        got: usize,
    },

    /// Dynamic offset or length does not fit the data.
    #[error("Dynamic value out of range at offset {0}")]
    BadOffset(usize),

    /// String payload is not UTF-8.
    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    /// Hex payload could not be decoded.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Value does not fit the target type.
    #[error("Value out of range for {0}")]
    Overflow(&'static str),
}

/// ABI argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `uint256`
    Uint(U256),
    /// `address`
    Address(Address),
    /// `string`
    String(String),
}

/// First four bytes of the Keccak-256 of a method signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn address_word(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

/// Encode a call: selector, head words, then dynamic tails.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Address(address) => head.extend_from_slice(&address_word(*address)),
            Token::String(text) => {
                let offset = U256::from(head_len + tail.len());
                head.extend_from_slice(&uint_word(offset));

                let bytes = text.as_bytes();
                tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                tail.resize(tail.len() + padded_len(bytes.len()) - bytes.len(), 0);
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head.len() + tail.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

/// Render bytes as `0x`-prefixed hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse `0x`-prefixed (or bare) hex.
pub fn from_hex(text: &str) -> Result<Vec<u8>, AbiError> {
    let stripped = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(stripped).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

/// Parse a JSON-RPC quantity ("0x1a").
pub fn quantity_to_u256(text: &str) -> Result<U256, AbiError> {
    let stripped = text.strip_prefix("0x").unwrap_or(text);
    if stripped.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(stripped, 16).map_err(|e| AbiError::InvalidHex(format!("{:?}", e)))
}

/// Parse a JSON-RPC quantity that must fit in a `u64`.
pub fn quantity_to_u64(text: &str) -> Result<u64, AbiError> {
    let value = quantity_to_u256(text)?;
    if value > U256::from(u64::MAX) {
        return Err(AbiError::Overflow("u64"));
    }
    Ok(value.as_u64())
}

/// Render a JSON-RPC quantity.
pub fn u256_to_quantity(value: U256) -> String {
    format!("{:#x}", value)
}

fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index * WORD;
    let end = start + WORD;
    data.get(start..end).ok_or(AbiError::TooShort {
        needed: end,
        got: data.len(),
    })
}

/// `uint256` at head word `index`.
pub fn decode_uint(data: &[u8], index: usize) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(word(data, index)?))
}

/// `uint256` at head word `index` that must fit in a `u64`.
pub fn decode_u64(data: &[u8], index: usize) -> Result<u64, AbiError> {
    let value = decode_uint(data, index)?;
    if value > U256::from(u64::MAX) {
        return Err(AbiError::Overflow("u64"));
    }
    Ok(value.as_u64())
}

/// `uint8` at head word `index`.
pub fn decode_u8(data: &[u8], index: usize) -> Result<u8, AbiError> {
    let value = decode_uint(data, index)?;
    if value > U256::from(u8::MAX) {
        return Err(AbiError::Overflow("uint8"));
    }
    Ok(value.low_u32() as u8)
}

/// `address` at head word `index`.
pub fn decode_address(data: &[u8], index: usize) -> Result<Address, AbiError> {
    Ok(Address::from_slice(&word(data, index)?[12..]))
}

/// `bool` at head word `index`.
pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, AbiError> {
    Ok(!decode_uint(data, index)?.is_zero())
}

/// `string` whose offset sits at head word `index`.
pub fn decode_string(data: &[u8], index: usize) -> Result<String, AbiError> {
    let offset = decode_uint(data, index)?;
    if offset > U256::from(data.len()) {
        return Err(AbiError::BadOffset(index * WORD));
    }
    let offset = offset.as_usize();

    let len_word = data
        .get(offset..offset + WORD)
        .ok_or(AbiError::BadOffset(offset))?;
    let len = U256::from_big_endian(len_word);
    if len > U256::from(data.len()) {
        return Err(AbiError::BadOffset(offset));
    }
    let start = offset + WORD;
    let bytes = data
        .get(start..start + len.as_usize())
        .ok_or(AbiError::BadOffset(start))?;

    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

/// Decode the `getCampaign` return tuple
/// `(creator, title, goalWei, deadline, raisedWei, finalized, successful)`.
pub fn decode_campaign(id: CampaignId, data: &[u8]) -> Result<Campaign, AbiError> {
    Ok(Campaign {
        id,
        creator: decode_address(data, 0)?,
        title: decode_string(data, 1)?,
        goal: decode_uint(data, 2)?,
        deadline: decode_u64(data, 3)?,
        raised: decode_uint(data, 4)?,
        finalized: decode_bool(data, 5)?,
        successful: decode_bool(data, 6)?,
    })
}

/// Encode a `getCampaign` return tuple. Used by tests and simulations.
pub fn encode_campaign(campaign: &Campaign) -> Vec<u8> {
    let call = encode_call(
        "",
        &[
            Token::Address(campaign.creator),
            Token::String(campaign.title.clone()),
            Token::Uint(campaign.goal),
            Token::Uint(Amount::from(campaign.deadline)),
            Token::Uint(campaign.raised),
            Token::Uint(Amount::from(u8::from(campaign.finalized))),
            Token::Uint(Amount::from(u8::from(campaign.successful))),
        ],
    );
    call[4..].to_vec()
}
