//! CCA factory interface
//! Deploys auctions from `AuctionParameters` and announces them with `AuctionCreated`
use ethers::prelude::*;

abigen!(
    ICCAFactory,
    r#"[
        function getAuctionAddress(address token, uint256 amount, bytes configData, bytes32 salt, address sender) external view returns (address)
        event AuctionCreated(address indexed auction, address indexed token, uint256 amount, bytes configData)
    ]"#,
);
