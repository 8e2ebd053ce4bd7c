use crate::did::KeyUri;
use async_trait::async_trait;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use signature::{Signer as _, Verifier};
use std::time::Duration;

/// A capability that signs payloads with a key identified by a key URI.
///
/// Signers may be remote (a wallet, an HSM), so signing is asynchronous and fallible.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The URI of the key this signer signs with.
    fn key_uri(&self) -> &KeyUri;

    /// Sign a payload.
    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SigningError>;
}

/// An error that can occur when signing.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing unavailable: {0}")]
    SigningUnavailable(String),

    #[error("signing timed out after {0:?}")]
    Timeout(Duration),
}

/// Run a signer bounded by a timeout.
pub(crate) async fn sign_with_timeout(
    signer: &dyn Signer,
    payload: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, SigningError> {
    match tokio::time::timeout(timeout, signer.sign(payload)).await {
        Ok(result) => result,
        Err(_) => Err(SigningError::Timeout(timeout)),
    }
}

/// A signer that uses a local `secp256k1` key.
pub struct Secp256k1Signer {
    key: SigningKey,
    key_uri: KeyUri,
}

impl Secp256k1Signer {
    /// Create a new `Secp256k1Signer`.
    pub(crate) fn new(key: SigningKey, key_uri: KeyUri) -> Self {
        Self { key, key_uri }
    }
}

#[async_trait]
impl Signer for Secp256k1Signer {
    fn key_uri(&self) -> &KeyUri {
        &self.key_uri
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SigningError> {
        let signature: Signature =
            self.key.try_sign(payload).map_err(|e| SigningError::SigningUnavailable(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// A signature made with a Did key, along with the URI of the key that made it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidSignature {
    /// The key that made this signature.
    pub key_uri: KeyUri,

    /// The signature bytes.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

impl DidSignature {
    /// Verify this signature over a payload using the given public key.
    pub fn verify(&self, payload: &[u8], public_key: &[u8; 33]) -> Result<(), InvalidSignature> {
        let verifying_key = VerifyingKey::from_sec1_bytes(public_key).map_err(|_| InvalidSignature::PublicKey)?;
        let signature = Signature::try_from(self.signature.as_slice()).map_err(|_| InvalidSignature::Signature)?;
        verifying_key.verify(payload, &signature).map_err(|_| InvalidSignature::Signature)
    }
}

/// An error during the verification of a signature.
#[derive(Debug, thiserror::Error)]
pub enum InvalidSignature {
    #[error("invalid public key")]
    PublicKey,

    #[error("invalid signature")]
    Signature,
}
