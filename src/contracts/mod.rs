//! Contract interfaces for the Uniswap liquidity launchpad
//!
//! - The auction itself, for scalar reads, bid calls and event decoding
//! - The CCA factory, to discover auctions
//! - The liquidity launcher, to create a token and hand it to the factory
pub mod cca;
pub mod cca_factory;
pub mod erc20;
pub mod liquidity_launcher;
pub use cca::{
    BidExitedFilter, BidSubmittedFilter, CheckpointUpdatedFilter, IContinuousClearingAuction,
};
pub use cca_factory::{AuctionCreatedFilter, ICCAFactory};
pub use erc20::IERC20;
use ethers::types::Address;
/// Launchpad deployments (same address on every supported chain)
pub mod addresses {
    use super::Address;
    use once_cell::sync::Lazy;
    use std::collections::HashSet;
    use std::str::FromStr;

    /// CCA factory
    pub const CCA_FACTORY: &str = "0xCCccCcCAE7503Cac057829BF2811De42E16e0bD5";

    /// Liquidity launcher
    pub const LIQUIDITY_LAUNCHER: &str = "0x00000008412db3394C91A5CbD01635c6d140637C";

    /// UERC20 token factory used by `createToken`
    pub const UERC20_FACTORY: &str = "0x0cde87c11b959e5eb0924c1abf5250ee3f9bd1b5";

    /// Chains with a CCA factory: Mainnet, Sepolia, Base, Arbitrum, Unichain
    pub const CCA_CHAIN_IDS: &[u64] = &[1, 11155111, 8453, 42161, 130];

    /// Chains with the UERC20 factory: Mainnet, Sepolia
    pub const UERC20_CHAIN_IDS: &[u64] = &[1, 11155111];

    static CCA_CHAINS: Lazy<HashSet<u64>> = Lazy::new(|| CCA_CHAIN_IDS.iter().copied().collect());

    static UERC20_CHAINS: Lazy<HashSet<u64>> =
        Lazy::new(|| UERC20_CHAIN_IDS.iter().copied().collect());

    static PARSED: Lazy<[Address; 3]> = Lazy::new(|| {
        [CCA_FACTORY, LIQUIDITY_LAUNCHER, UERC20_FACTORY]
            .map(|addr| Address::from_str(addr).unwrap_or_default())
    });

    pub fn cca_factory() -> Address {
        PARSED[0]
    }

    pub fn liquidity_launcher() -> Address {
        PARSED[1]
    }

    pub fn uerc20_factory() -> Address {
        PARSED[2]
    }

    /// Whether auctions can be discovered and created on this chain
    pub fn supports_cca(chain_id: u64) -> bool {
        CCA_CHAINS.contains(&chain_id)
    }

    /// Whether `createToken` works on this chain
    pub fn supports_token_creation(chain_id: u64) -> bool {
        UERC20_CHAINS.contains(&chain_id)
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launchpad_addresses() {
        assert_eq!(
            format!("{:?}", addresses::cca_factory()),
            "0xcccccccae7503cac057829bf2811de42e16e0bd5"
        );
        assert_eq!(
            format!("{:?}", addresses::liquidity_launcher()),
            "0x00000008412db3394c91a5cbd01635c6d140637c"
        );
        assert_eq!(
            format!("{:?}", addresses::uerc20_factory()),
            "0x0cde87c11b959e5eb0924c1abf5250ee3f9bd1b5"
        );
    }

    #[test]
    fn test_supported_chains() {
        assert!(addresses::supports_cca(8453));
        assert!(!addresses::supports_cca(369));
        assert!(addresses::supports_token_creation(11155111));
        assert!(!addresses::supports_token_creation(8453));
    }
}
