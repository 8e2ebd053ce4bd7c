use super::{document::DidDocument, Did, KeyUri, VerificationRelationship};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::RwLock,
    time::Duration,
};
use tracing::debug;

/// A key resolved from a key URI.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedKey {
    /// The URI the key was resolved from.
    pub key_uri: KeyUri,

    /// The Did that controls the key.
    pub controller: Did,

    /// The compressed secp256k1 public key.
    pub public_key: [u8; 33],

    /// The relationships this key is listed under.
    pub purposes: Vec<VerificationRelationship>,
}

impl ResolvedKey {
    /// Check whether this key can be used for the given purpose.
    pub fn allows(&self, purpose: VerificationRelationship) -> bool {
        self.purposes.contains(&purpose)
    }
}

/// A capability that maps key URIs to public keys.
///
/// Implementations typically sit in front of a ledger or some other Did store and may block on
/// network round trips.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Resolve a key URI.
    async fn resolve(&self, key_uri: &KeyUri) -> Result<ResolvedKey, ResolveKeyError>;
}

/// An error when resolving a key.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ResolveKeyError {
    #[error("key not found: {0}")]
    KeyNotFound(KeyUri),

    #[error("did is revoked or deactivated: {0}")]
    KeyRevokedOrDeactivated(Did),

    #[error("resolver unavailable: {0}")]
    Unavailable(String),

    #[error("key resolution timed out after {0:?}")]
    Timeout(Duration),
}

/// An in-memory Did registry.
///
/// Dids that were never registered resolve to their minimal document, since a `did:key` is
/// self-describing. Deactivated Dids never resolve again.
#[derive(Debug, Default)]
pub struct DidRegistry {
    documents: RwLock<HashMap<Did, DidDocument>>,
    deactivated: RwLock<HashSet<Did>>,
}

impl DidRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a Did document, replacing any previous one for the same Did.
    pub fn register(&self, document: DidDocument) -> Result<(), ResolveKeyError> {
        if self.is_deactivated(&document.id) {
            return Err(ResolveKeyError::KeyRevokedOrDeactivated(document.id));
        }
        debug!(did = %document.id, "registering did document");
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.insert(document.id, document);
        Ok(())
    }

    /// Deactivate a Did.
    pub fn deactivate(&self, did: &Did) {
        debug!(%did, "deactivating did");
        self.documents.write().unwrap_or_else(|e| e.into_inner()).remove(did);
        self.deactivated.write().unwrap_or_else(|e| e.into_inner()).insert(*did);
    }

    /// Check whether a Did was deactivated.
    pub fn is_deactivated(&self, did: &Did) -> bool {
        self.deactivated.read().unwrap_or_else(|e| e.into_inner()).contains(did)
    }

    /// Get the document for a Did.
    pub fn document(&self, did: &Did) -> Result<DidDocument, ResolveKeyError> {
        if self.is_deactivated(did) {
            return Err(ResolveKeyError::KeyRevokedOrDeactivated(*did));
        }
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        Ok(documents.get(did).cloned().unwrap_or_else(|| DidDocument::new(*did)))
    }
}

#[async_trait]
impl KeyResolver for DidRegistry {
    async fn resolve(&self, key_uri: &KeyUri) -> Result<ResolvedKey, ResolveKeyError> {
        let document = self.document(key_uri.did())?;
        let (key, purposes) =
            document.find_key(key_uri.fragment()).ok_or_else(|| ResolveKeyError::KeyNotFound(key_uri.clone()))?;
        Ok(ResolvedKey { key_uri: key_uri.clone(), controller: document.id, public_key: key.public_key, purposes })
    }
}
