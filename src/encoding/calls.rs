//! Call data for auction and launcher transactions

use ethers::abi::AbiEncode;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use serde::Serialize;
use crate::contracts::addresses;
use crate::contracts::cca::{ClaimTokensBatchCall, ClaimTokensCall, ExitBidCall, SubmitBidCall};
use crate::contracts::liquidity_launcher::{
    encode_create_token, encode_distribute_token, CreateTokenArgs, DistributeTokenArgs,
};
use crate::utils::{CcaError, Result};
use super::params::{deployment_salt, AuctionParameters};

/// A contract call ready to be signed and sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedCall {
    pub to: Address,
    pub data: Bytes,
    /// Native currency attached to the call
    pub value: U256,
}

impl PreparedCall {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self { to, data: data.into(), value: U256::zero() }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn to_request(&self) -> TransactionRequest {
        TransactionRequest::new()
            .to(self.to)
            .data(self.data.clone())
            .value(self.value)
    }
}

/// `submitBid(maxPrice, amount, owner, hookData)`
///
/// An ETH-denominated auction takes the bid amount as `msg.value`.
pub fn submit_bid(
    auction: Address,
    max_price: U256,
    amount: U256,
    owner: Address,
    native_currency: bool,
) -> Result<PreparedCall> {
    if max_price.is_zero() {
        return Err(CcaError::invalid("max price", "must be > 0"));
    }
    if amount.is_zero() {
        return Err(CcaError::invalid("amount", "must be > 0"));
    }
    if amount > U256::from(u128::MAX) {
        return Err(CcaError::invalid("amount", "exceeds uint128"));
    }

    let call = SubmitBidCall {
        max_price,
        amount: amount.as_u128(),
        owner,
        hook_data: Bytes::default(),
    };
    let prepared = PreparedCall::new(auction, call.encode());
    Ok(if native_currency { prepared.with_value(amount) } else { prepared })
}

pub fn exit_bid(auction: Address, bid_id: U256) -> PreparedCall {
    PreparedCall::new(auction, ExitBidCall { bid_id }.encode())
}

pub fn claim_tokens(auction: Address, bid_id: U256) -> PreparedCall {
    PreparedCall::new(auction, ClaimTokensCall { bid_id }.encode())
}

pub fn claim_tokens_batch(auction: Address, owner: Address, bid_ids: Vec<U256>) -> PreparedCall {
    PreparedCall::new(auction, ClaimTokensBatchCall { owner, bid_ids }.encode())
}

/// `createToken` through the launcher, minting the supply to the launcher itself
/// so `distributeToken` can move it without an approval
pub fn create_token(name: &str, symbol: &str, decimals: u8, initial_supply: u128) -> PreparedCall {
    let launcher = addresses::liquidity_launcher();
    let args = CreateTokenArgs {
        factory: addresses::uerc20_factory(),
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals,
        initial_supply,
        recipient: launcher,
        token_data: Bytes::default(),
    };
    PreparedCall::new(launcher, encode_create_token(&args))
}

/// `distributeToken` into the CCA factory, which deploys the auction
pub fn distribute_to_auction(
    token: Address,
    amount: u128,
    params: &AuctionParameters,
    sender: Address,
    nonce: U256,
) -> PreparedCall {
    let args = DistributeTokenArgs {
        token,
        strategy: addresses::cca_factory(),
        amount,
        config_data: params.encode(),
        payer_is_user: false,
        salt: deployment_salt(sender, nonce),
    };
    PreparedCall::new(addresses::liquidity_launcher(), encode_distribute_token(&args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::AbiDecode;

    fn auction() -> Address {
        Address::from_low_u64_be(0xac)
    }

    #[test]
    fn test_native_bid_carries_value() {
        let amount = U256::exp10(18);
        let call = submit_bid(auction(), U256::from(1u64) << 90, amount, Address::zero(), true).unwrap();
        assert_eq!(call.to, auction());
        assert_eq!(call.value, amount);

        let decoded = SubmitBidCall::decode(&call.data).unwrap();
        assert_eq!(decoded.amount, 10u128.pow(18));
        assert_eq!(decoded.max_price, U256::from(1u64) << 90);
    }

    #[test]
    fn test_erc20_bid_has_no_value() {
        let call = submit_bid(auction(), U256::one(), U256::one(), Address::zero(), false).unwrap();
        assert!(call.value.is_zero());
    }

    #[test]
    fn test_bid_rejects_bad_amounts() {
        assert!(submit_bid(auction(), U256::zero(), U256::one(), Address::zero(), true).is_err());
        assert!(submit_bid(auction(), U256::one(), U256::zero(), Address::zero(), true).is_err());
        assert!(submit_bid(auction(), U256::one(), U256::MAX, Address::zero(), true).is_err());
    }

    #[test]
    fn test_exit_and_claim_calls() {
        let exit = exit_bid(auction(), 7.into());
        assert_eq!(ExitBidCall::decode(&exit.data).unwrap().bid_id, 7.into());

        let batch = claim_tokens_batch(auction(), Address::from_low_u64_be(1), vec![1.into(), 2.into()]);
        let decoded = ClaimTokensBatchCall::decode(&batch.data).unwrap();
        assert_eq!(decoded.bid_ids, vec![U256::from(1u64), U256::from(2u64)]);

        let claim = claim_tokens(auction(), 3.into());
        assert_eq!(&claim.data[..4], &ethers::utils::id("claimTokens(uint256)")[..]);
    }

    #[test]
    fn test_launcher_calls_target_launcher() {
        let create = create_token("Test", "TST", 18, 10u128.pow(24));
        assert_eq!(create.to, addresses::liquidity_launcher());
        assert!(create.value.is_zero());
    }
}
