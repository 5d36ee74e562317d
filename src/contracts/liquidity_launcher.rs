//! Liquidity launcher: token creation and distribution into a CCA factory
//!
//! Call data is ABI-encoded by hand because `distributeToken` takes an inline
//! tuple. Receipts are parsed by topic, the same way wallets surface them.

use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, Log, H256, U256};
use ethers::utils::{id, keccak256};
use once_cell::sync::Lazy;

pub const CREATE_TOKEN_SIGNATURE: &str =
    "createToken(address,string,string,uint8,uint128,address,bytes)";
pub const DISTRIBUTE_TOKEN_SIGNATURE: &str =
    "distributeToken(address,(address,uint128,bytes),bool,bytes32)";

/// `TokenCreated(address indexed token)`
pub static TOKEN_CREATED_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from(keccak256("TokenCreated(address)")));

/// `TokenDistributed(address indexed token, address indexed distributionContract, uint256 amount)`
pub static TOKEN_DISTRIBUTED_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from(keccak256("TokenDistributed(address,address,uint256)")));

/// Arguments for `createToken`
#[derive(Debug, Clone)]
pub struct CreateTokenArgs {
    pub factory: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_supply: u128,
    pub recipient: Address,
    pub token_data: Bytes,
}

/// Arguments for `distributeToken`
#[derive(Debug, Clone)]
pub struct DistributeTokenArgs {
    pub token: Address,
    /// The CCA factory
    pub strategy: Address,
    pub amount: u128,
    /// Encoded `AuctionParameters`
    pub config_data: Bytes,
    pub payer_is_user: bool,
    pub salt: [u8; 32],
}

pub fn encode_create_token(args: &CreateTokenArgs) -> Bytes {
    let tokens = [
        Token::Address(args.factory),
        Token::String(args.name.clone()),
        Token::String(args.symbol.clone()),
        Token::Uint(U256::from(args.decimals)),
        Token::Uint(U256::from(args.initial_supply)),
        Token::Address(args.recipient),
        Token::Bytes(args.token_data.to_vec()),
    ];
    with_selector(CREATE_TOKEN_SIGNATURE, &tokens)
}

pub fn encode_distribute_token(args: &DistributeTokenArgs) -> Bytes {
    let tokens = [
        Token::Address(args.token),
        Token::Tuple(vec![
            Token::Address(args.strategy),
            Token::Uint(U256::from(args.amount)),
            Token::Bytes(args.config_data.to_vec()),
        ]),
        Token::Bool(args.payer_is_user),
        Token::FixedBytes(args.salt.to_vec()),
    ];
    with_selector(DISTRIBUTE_TOKEN_SIGNATURE, &tokens)
}

fn with_selector(signature: &str, tokens: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(tokens));
    data.into()
}

/// Token address from the first `TokenCreated` log (topic 1)
pub fn created_token(logs: &[Log]) -> Option<Address> {
    find_indexed_address(logs, *TOKEN_CREATED_TOPIC, 1)
}

/// Auction address from the first `TokenDistributed` log (topic 2)
pub fn distributed_auction(logs: &[Log]) -> Option<Address> {
    find_indexed_address(logs, *TOKEN_DISTRIBUTED_TOPIC, 2)
}

fn find_indexed_address(logs: &[Log], signature: H256, index: usize) -> Option<Address> {
    logs.iter()
        .find(|log| log.topics.first() == Some(&signature))
        .and_then(|log| log.topics.get(index))
        .map(|topic| Address::from(*topic))
}
