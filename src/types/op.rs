use alloy::{
    primitives::{Address, B256, Bytes, ChainId, U256, keccak256},
    sol,
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

sol! {
    /// An ERC-4337 user operation, as understood by the v0.6 entrypoint.
    #[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct UserOperation {
        /// The smart account executing the operation.
        address sender;
        /// Anti-replay nonce.
        ///
        /// # Memory layout
        ///
        /// ```text
        ///      ,----------------------------------------------------.
        /// bits | 0-191 (192 bits)                | 192-255 (64 bits)|
        ///      |---------------------------------|------------------|
        /// desc | sequence key                    | sequential nonce |
        ///      `----------------------------------------------------'
        /// ```
        ///
        /// Ordering is only enforced within a sequence key. Operations built with a random key
        /// can be included in any order, which is why the sequencer orders them instead.
        uint256 nonce;
        /// Factory and calldata for counterfactual deployment. Empty for deployed accounts.
        bytes initCode;
        /// Calldata executed by the smart account.
        bytes callData;
        /// Gas for the inner call.
        uint256 callGasLimit;
        /// Gas for account and paymaster validation.
        uint256 verificationGasLimit;
        /// Gas paid to the bundler for overhead not tracked on-chain.
        uint256 preVerificationGas;
        /// EIP-1559 max fee per gas.
        uint256 maxFeePerGas;
        /// EIP-1559 max priority fee per gas.
        uint256 maxPriorityFeePerGas;
        /// Paymaster address followed by paymaster specific data. Empty when unsponsored.
        bytes paymasterAndData;
        /// Signature checked by the account's validation module.
        bytes signature;
    }
}

impl UserOperation {
    /// Computes the user operation hash for the given entrypoint and chain.
    ///
    /// The signature is not part of the hash.
    pub fn hash(&self, entrypoint: Address, chain_id: ChainId) -> B256 {
        let packed = (
            self.sender,
            self.nonce,
            keccak256(&self.initCode),
            keccak256(&self.callData),
            self.callGasLimit,
            self.verificationGasLimit,
            self.preVerificationGas,
            self.maxFeePerGas,
            self.maxPriorityFeePerGas,
            keccak256(&self.paymasterAndData),
        )
            .abi_encode();

        keccak256((keccak256(packed), entrypoint, U256::from(chain_id)).abi_encode())
    }
}

/// Fee sponsorship returned by a paymaster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipData {
    /// Value for [`UserOperation::paymasterAndData`].
    pub paymaster_and_data: Bytes,
    /// Gas limit override for the inner call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    /// Gas limit override for validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    /// Pre-verification gas override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
}

/// A user operation that has been built but not signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedOperation {
    /// Chain the operation executes on.
    pub chain_id: ChainId,
    /// Entrypoint the operation is submitted to.
    pub entrypoint: Address,
    /// Contract called by the smart account.
    pub target: Address,
    /// Calldata for `target`.
    pub calldata: Bytes,
    /// The wrapped user operation.
    pub op: UserOperation,
    sponsorship: Option<Bytes>,
}

impl UnsignedOperation {
    /// Creates a new unsponsored operation.
    pub fn new(
        chain_id: ChainId,
        entrypoint: Address,
        target: Address,
        calldata: Bytes,
        op: UserOperation,
    ) -> Self {
        Self { chain_id, entrypoint, target, calldata, op, sponsorship: None }
    }

    /// The smart account executing the operation.
    pub fn sender(&self) -> Address {
        self.op.sender
    }

    /// Sponsorship attached to the operation, if any.
    pub fn sponsorship(&self) -> Option<&Bytes> {
        self.sponsorship.as_ref()
    }

    /// Whether a sponsor has agreed to pay for the operation.
    pub fn is_sponsored(&self) -> bool {
        self.sponsorship.as_ref().is_some_and(|data| !data.is_empty())
    }

    /// Attaches sponsorship, applying any gas limits the sponsor computed.
    pub fn with_sponsorship(mut self, data: SponsorshipData) -> Self {
        if let Some(limit) = data.call_gas_limit {
            self.op.callGasLimit = limit;
        }
        if let Some(limit) = data.verification_gas_limit {
            self.op.verificationGasLimit = limit;
        }
        if let Some(gas) = data.pre_verification_gas {
            self.op.preVerificationGas = gas;
        }
        self.op.paymasterAndData = data.paymaster_and_data.clone();
        self.sponsorship = Some(data.paymaster_and_data);
        self
    }

    /// The user operation hash.
    pub fn hash(&self) -> B256 {
        self.op.hash(self.entrypoint, self.chain_id)
    }
}

/// A sponsored user operation carrying its batch signature.
///
/// Only the [`MultiChainSigner`](crate::signers::MultiChainSigner) creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOperation {
    chain_id: ChainId,
    entrypoint: Address,
    op: UserOperation,
    hash: B256,
}

impl SignedOperation {
    pub(crate) fn new(unsigned: UnsignedOperation, signature: Bytes) -> Self {
        let hash = unsigned.hash();
        let UnsignedOperation { chain_id, entrypoint, mut op, .. } = unsigned;
        op.signature = signature;
        Self { chain_id, entrypoint, op, hash }
    }

    /// Chain the operation executes on.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Entrypoint the operation is submitted to.
    pub fn entrypoint(&self) -> Address {
        self.entrypoint
    }

    /// The signed user operation.
    pub fn op(&self) -> &UserOperation {
        &self.op
    }

    /// The smart account executing the operation.
    pub fn sender(&self) -> Address {
        self.op.sender
    }

    /// The user operation hash.
    pub fn hash(&self) -> B256 {
        self.hash
    }
}
