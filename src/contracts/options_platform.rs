use ethers::prelude::abigen;

// Options platform registry; `supportedAssets(token)` is the collateral allow-list
abigen!(
    OptionsPlatform,
    r#"[
        function supportedAssets(address token) external view returns (bool)
    ]"#
);
