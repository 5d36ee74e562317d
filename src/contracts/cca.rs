//! Continuous Clearing Auction interface
//! Scalar reads, bid entrypoints and the three events the client reconstructs from
use ethers::prelude::*;

abigen!(
    IContinuousClearingAuction,
    r#"[
        function clearingPrice() external view returns (uint256)
        function currency() external view returns (address)
        function token() external view returns (address)
        function startBlock() external view returns (uint64)
        function endBlock() external view returns (uint64)
        function claimBlock() external view returns (uint64)
        function floorPrice() external view returns (uint256)
        function tickSpacing() external view returns (uint256)
        function currencyRaised() external view returns (uint256)
        function totalCleared() external view returns (uint256)
        function totalSupply() external view returns (uint128)
        function isGraduated() external view returns (bool)
        function tokensRecipient() external view returns (address)
        function fundsRecipient() external view returns (address)
        function validationHook() external view returns (address)
        function submitBid(uint256 maxPrice, uint128 amount, address owner, bytes hookData) external payable returns (uint256)
        function exitBid(uint256 bidId) external
        function claimTokens(uint256 bidId) external
        function claimTokensBatch(address owner, uint256[] bidIds) external
        event BidSubmitted(uint256 indexed id, address indexed owner, uint256 price, uint128 amount)
        event BidExited(uint256 indexed bidId, address indexed owner, uint256 tokensFilled, uint256 currencyRefunded)
        event CheckpointUpdated(uint256 blockNumber, uint256 clearingPrice, uint24 cumulativeMps)
    ]"#,
);

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::keccak256;

    #[test]
    fn test_event_signatures_match_contract() {
        assert_eq!(
            BidSubmittedFilter::signature(),
            H256::from(keccak256("BidSubmitted(uint256,address,uint256,uint128)"))
        );
        assert_eq!(
            BidExitedFilter::signature(),
            H256::from(keccak256("BidExited(uint256,address,uint256,uint256)"))
        );
        assert_eq!(
            CheckpointUpdatedFilter::signature(),
            H256::from(keccak256("CheckpointUpdated(uint256,uint256,uint24)"))
        );
    }

    #[test]
    fn test_submit_bid_selector() {
        assert_eq!(
            SubmitBidCall::selector(),
            ethers::utils::id("submitBid(uint256,uint128,address,bytes)")
        );
    }
}
