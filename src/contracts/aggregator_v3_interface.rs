use ethers::prelude::abigen;

// Chainlink price feed; only the legacy `latestAnswer()` read is needed
abigen!(
    AggregatorV3Interface,
    r#"[
        function latestAnswer() external view returns (int256)
        function decimals() external view returns (uint8)
    ]"#
);
