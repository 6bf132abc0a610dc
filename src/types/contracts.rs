use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }

    /// Source-chain bridge entry accepting a destination chain name and token symbol.
    #[derive(Debug)]
    interface IBridgeSender {
        function send(string destinationChain, string tokenSymbol, uint256 amount) external payable;
    }

    /// Smart account single call execution.
    #[derive(Debug)]
    interface ISmartAccount {
        function execute(address dest, uint256 value, bytes func) external;
    }

    /// Signature payload expected by the multichain validation module.
    #[derive(Debug, PartialEq, Eq)]
    struct MultichainSignature {
        uint48 validUntil;
        uint48 validAfter;
        bytes32 merkleRoot;
        bytes32[] merkleProof;
        bytes signature;
    }
}
