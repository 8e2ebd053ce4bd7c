use crate::{did::Did, signer::Secp256k1Signer};
use k256::{ecdsa::SigningKey, elliptic_curve, SecretKey};

/// An abstraction over a secp256k1 key pair.
///
/// This provides a unified API for managing keys, creating Dids, and generating signers.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a new, random `Keypair`.
    pub fn generate() -> Self {
        let secret_key = SecretKey::random(&mut rand::thread_rng());
        Self { signing_key: secret_key.into() }
    }

    /// Creates a `Keypair` from a 32-byte secret key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, elliptic_curve::Error> {
        let secret_key = SecretKey::from_slice(bytes)?;
        Ok(Self { signing_key: secret_key.into() })
    }

    /// Returns the raw 33-byte compressed public key.
    pub fn public_key(&self) -> [u8; 33] {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut public_key = [0; 33];
        public_key.copy_from_slice(point.as_bytes());
        public_key
    }

    /// Creates a `Did` from this keypair's public key.
    pub fn to_did(&self) -> Did {
        Did::key(self.public_key())
    }

    /// Creates a signer for this keypair's own Did, using the given key fragment.
    pub fn signer(&self, fragment: &str) -> Secp256k1Signer {
        self.signer_for(self.to_did(), fragment)
    }

    /// Creates a signer for a key that this keypair backs under another Did.
    ///
    /// This is how a Did that lists extra keys in its document (e.g. an assertion key) signs with
    /// them.
    pub fn signer_for(&self, did: Did, fragment: &str) -> Secp256k1Signer {
        Secp256k1Signer::new(self.signing_key.clone(), did.key_uri(fragment))
    }
}
