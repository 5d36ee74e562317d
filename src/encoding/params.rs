//! `AuctionParameters` encoding for the CCA factory
//!
//! The factory decodes `configData` as a single `AuctionParameters` struct,
//! so the fields are encoded as one ABI tuple. Field order and widths must
//! match the contract exactly; a mismatch is not detected on-chain, it just
//! produces a different auction.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use crate::utils::{CcaError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionParameters {
    pub currency: Address,
    pub tokens_recipient: Address,
    pub funds_recipient: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub claim_block: u64,
    pub tick_spacing: U256,
    pub validation_hook: Address,
    /// Q96
    pub floor_price: U256,
    pub required_currency_raised: u128,
    /// Packed release schedule
    pub auction_steps_data: Bytes,
}

impl AuctionParameters {
    /// Solidity field types, in struct order
    pub fn param_types() -> Vec<ParamType> {
        vec![
            ParamType::Address,   // currency
            ParamType::Address,   // tokensRecipient
            ParamType::Address,   // fundsRecipient
            ParamType::Uint(64),  // startBlock
            ParamType::Uint(64),  // endBlock
            ParamType::Uint(64),  // claimBlock
            ParamType::Uint(256), // tickSpacing
            ParamType::Address,   // validationHook
            ParamType::Uint(256), // floorPrice
            ParamType::Uint(128), // requiredCurrencyRaised
            ParamType::Bytes,     // auctionStepsData
        ]
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        vec![
            Token::Address(self.currency),
            Token::Address(self.tokens_recipient),
            Token::Address(self.funds_recipient),
            Token::Uint(self.start_block.into()),
            Token::Uint(self.end_block.into()),
            Token::Uint(self.claim_block.into()),
            Token::Uint(self.tick_spacing),
            Token::Address(self.validation_hook),
            Token::Uint(self.floor_price),
            Token::Uint(self.required_currency_raised.into()),
            Token::Bytes(self.auction_steps_data.to_vec()),
        ]
    }

    /// `abi.encode(AuctionParameters)`
    pub fn encode(&self) -> Bytes {
        abi::encode(&[Token::Tuple(self.to_tokens())]).into()
    }

    /// Inverse of [`encode`](Self::encode), e.g. for `AuctionCreated.configData`
    pub fn decode(data: &[u8]) -> Result<Self> {
        let decoded = abi::decode(&[ParamType::Tuple(Self::param_types())], data)
            .map_err(|e| CcaError::invalid("configData", e.to_string()))?;

        let fields = match decoded.into_iter().next() {
            Some(Token::Tuple(fields)) if fields.len() == 11 => fields,
            _ => return Err(CcaError::invalid("configData", "not an AuctionParameters tuple")),
        };
        let mut fields = fields.into_iter();

        Ok(Self {
            currency: next_address(&mut fields, "currency")?,
            tokens_recipient: next_address(&mut fields, "tokensRecipient")?,
            funds_recipient: next_address(&mut fields, "fundsRecipient")?,
            start_block: next_u64(&mut fields, "startBlock")?,
            end_block: next_u64(&mut fields, "endBlock")?,
            claim_block: next_u64(&mut fields, "claimBlock")?,
            tick_spacing: next_uint(&mut fields, "tickSpacing")?,
            validation_hook: next_address(&mut fields, "validationHook")?,
            floor_price: next_uint(&mut fields, "floorPrice")?,
            required_currency_raised: next_u128(&mut fields, "requiredCurrencyRaised")?,
            auction_steps_data: match fields.next() {
                Some(Token::Bytes(b)) => b.into(),
                _ => return Err(CcaError::invalid("auctionStepsData", "expected bytes")),
            },
        })
    }

    pub fn duration(&self) -> u64 {
        self.end_block.saturating_sub(self.start_block)
    }
}

fn next_address(fields: &mut impl Iterator<Item = Token>, name: &str) -> Result<Address> {
    match fields.next() {
        Some(Token::Address(a)) => Ok(a),
        _ => Err(CcaError::invalid(name, "expected address")),
    }
}

fn next_uint(fields: &mut impl Iterator<Item = Token>, name: &str) -> Result<U256> {
    match fields.next() {
        Some(Token::Uint(v)) => Ok(v),
        _ => Err(CcaError::invalid(name, "expected uint")),
    }
}

fn next_u64(fields: &mut impl Iterator<Item = Token>, name: &str) -> Result<u64> {
    let value = next_uint(fields, name)?;
    if value > U256::from(u64::MAX) {
        return Err(CcaError::invalid(name, "does not fit in uint64"));
    }
    Ok(value.as_u64())
}

fn next_u128(fields: &mut impl Iterator<Item = Token>, name: &str) -> Result<u128> {
    let value = next_uint(fields, name)?;
    if value > U256::from(u128::MAX) {
        return Err(CcaError::invalid(name, "does not fit in uint128"));
    }
    Ok(value.as_u128())
}

/// `keccak256(abi.encode(sender, nonce))`, unique per sender and nonce
pub fn deployment_salt(sender: Address, nonce: U256) -> [u8; 32] {
    let encoded = abi::encode(&[Token::Address(sender), Token::Uint(nonce)]);
    Keccak256::digest(&encoded).into()
}
