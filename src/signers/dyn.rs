//! Owner signer abstraction.
//!
//! Wraps any alloy signer holding the smart account owner key.
use super::PayloadSigner;
use alloy::{
    primitives::{Address, B256, Bytes, Signature},
    signers::{
        Signer,
        k256::ecdsa::SigningKey,
        local::{
            PrivateKeySigner,
            coins_bip39::{English, Mnemonic},
        },
    },
};
use std::{fmt, ops::Deref, str::FromStr, sync::Arc};

/// Abstraction over local owner signers.
#[derive(Clone)]
pub struct DynSigner(pub Arc<dyn Signer<Signature> + Send + Sync>);

impl fmt::Debug for DynSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnerSigner").field(&PayloadSigner::address(self)).finish()
    }
}

impl DynSigner {
    /// Derives the owner key at `m/44'/60'/0'/0/{index}` from a mnemonic phrase.
    pub fn from_mnemonic(phrase: &str, index: u32) -> eyre::Result<Self> {
        let mnemonic = Mnemonic::<English>::new_from_phrase(phrase)?;
        let key = mnemonic.derive_key(format!("m/44'/60'/0'/0/{index}").as_str(), None)?;
        let key: &SigningKey = key.as_ref();
        Ok(Self(Arc::new(PrivateKeySigner::from_signing_key(key.clone()))))
    }

    /// Load a hex encoded private key.
    pub fn from_signing_key(key: &str) -> eyre::Result<Self> {
        Ok(Self(Arc::new(PrivateKeySigner::from_str(key)?)))
    }

    /// A signer over a random key. Used for testing.
    pub fn random() -> Self {
        Self(Arc::new(PrivateKeySigner::random()))
    }
}

impl Deref for DynSigner {
    type Target = dyn Signer<Signature> + Send + Sync;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[async_trait::async_trait]
impl PayloadSigner for DynSigner {
    fn address(&self) -> Address {
        Signer::address(self.0.as_ref())
    }

    async fn sign_payload_hash(&self, payload_hash: B256) -> eyre::Result<Bytes> {
        Ok(self.sign_message(payload_hash.as_slice()).await?.as_bytes().into())
    }
}
