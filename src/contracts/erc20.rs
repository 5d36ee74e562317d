//! ERC20 token interface
//! Only the metadata and balance reads the auction views need
use ethers::prelude::*;

abigen!(
    IERC20,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function decimals() external view returns (uint8)
        function name() external view returns (string)
        function symbol() external view returns (string)
    ]"#,
);
