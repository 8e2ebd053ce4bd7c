use hex::FromHexError;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha2::{Digest, Sha256};
use std::{collections::BTreeMap, fmt, str::FromStr};
use tracing::debug;

/// A 256 bit hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Get the raw bytes in this hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = hex::encode(self.0);
        write!(f, "{hash}")
    }
}

impl FromStr for Hash {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut data = [0; 32];
        hex::decode_to_slice(s, &mut data)?;
        Ok(Self(data))
    }
}

/// A function that hashes a string, optionally prefixed by a nonce.
///
/// Implementations must be deterministic: the same value and nonce always produce the same hash.
pub trait Hasher: Send + Sync {
    /// Hash `nonce || value`.
    fn hash(&self, value: &str, nonce: Option<&str>) -> Hash;
}

/// The supported hash algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,

    /// BLAKE3 with a 256 bit output.
    Blake3,
}

impl Hasher for HashAlgorithm {
    fn hash(&self, value: &str, nonce: Option<&str>) -> Hash {
        let nonce = nonce.unwrap_or_default();
        match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(nonce.as_bytes());
                hasher.update(value.as_bytes());
                Hash(hasher.finalize().into())
            }
            Self::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(nonce.as_bytes());
                hasher.update(value.as_bytes());
                Hash(hasher.finalize().into())
            }
        }
    }
}

impl<F> Hasher for F
where
    F: Fn(&str, Option<&str>) -> Hash + Send + Sync,
{
    fn hash(&self, value: &str, nonce: Option<&str>) -> Hash {
        self(value, nonce)
    }
}

/// A mapping from statement digest to the nonce used to salt it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NonceMap(BTreeMap<Hash, String>);

impl NonceMap {
    /// Get the nonce for a digest.
    pub fn get(&self, digest: &Hash) -> Option<&str> {
        self.0.get(digest).map(String::as_str)
    }

    /// Insert the nonce for a digest.
    pub fn insert(&mut self, digest: Hash, nonce: String) {
        self.0.insert(digest, nonce);
    }

    /// Check whether there's a nonce for a digest.
    pub fn contains(&self, digest: &Hash) -> bool {
        self.0.contains_key(digest)
    }

    /// Keep only the entries whose digest is in `digests`.
    pub fn restricted_to<'a, I>(&self, digests: I) -> Self
    where
        I: IntoIterator<Item = &'a Hash>,
    {
        let entries =
            digests.into_iter().filter_map(|digest| self.0.get(digest).map(|nonce| (*digest, nonce.clone()))).collect();
        Self(entries)
    }

    /// The number of entries in this map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the digests in this map.
    pub fn digests(&self) -> impl Iterator<Item = &Hash> {
        self.0.keys()
    }
}

impl FromIterator<(Hash, String)> for NonceMap {
    fn from_iter<T: IntoIterator<Item = (Hash, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A statement along with its digest, nonce, and salted hash.
#[derive(Clone, Debug, PartialEq)]
pub struct HashedStatement {
    /// The canonical statement.
    pub statement: String,

    /// The unsalted hash of the statement.
    pub digest: Hash,

    /// The nonce used to salt the digest.
    pub nonce: String,

    /// The hash of `nonce || hex(digest)`.
    pub salted_hash: Hash,
}

/// Options used when hashing statements.
pub struct HashingOptions<'a> {
    hasher: &'a dyn Hasher,
    nonces: Option<&'a NonceMap>,
    nonce_generator: Box<dyn Fn(&Hash) -> String + 'a>,
}

impl<'a> HashingOptions<'a> {
    /// Construct options that use the given hasher and generate fresh nonces.
    pub fn new(hasher: &'a dyn Hasher) -> Self {
        Self { hasher, nonces: None, nonce_generator: Box::new(|_: &Hash| generate_nonce()) }
    }

    /// Reuse the nonces in this map for any digest it contains.
    pub fn nonces(mut self, nonces: &'a NonceMap) -> Self {
        self.nonces = Some(nonces);
        self
    }

    /// Use a custom generator for nonces that aren't in the nonce map.
    pub fn nonce_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&Hash) -> String + 'a,
    {
        self.nonce_generator = Box::new(generator);
        self
    }

    fn nonce_for(&self, digest: &Hash) -> String {
        match self.nonces.and_then(|nonces| nonces.get(digest)) {
            Some(nonce) => nonce.to_string(),
            None => (self.nonce_generator)(digest),
        }
    }
}

impl Default for HashingOptions<'static> {
    fn default() -> Self {
        Self::new(&HashAlgorithm::Sha256)
    }
}

/// Hash a sequence of canonical statements.
///
/// Every statement is hashed on its own into a digest, and the digest is then salted with a nonce.
/// Nonces are taken from the options' nonce map when present, which is how salted hashes are
/// reproduced; otherwise a fresh one is generated.
pub fn hash_statements<S>(statements: &[S], options: &HashingOptions) -> Vec<HashedStatement>
where
    S: AsRef<str>,
{
    let output: Vec<_> = statements
        .iter()
        .map(|statement| {
            let statement = statement.as_ref();
            let digest = options.hasher.hash(statement, None);
            let nonce = options.nonce_for(&digest);
            let salted_hash = salted_hash(options.hasher, &digest, &nonce);
            HashedStatement { statement: statement.to_string(), digest, nonce, salted_hash }
        })
        .collect();
    debug!(statements = output.len(), "hashed statements");
    output
}

/// Compute the salted hash for a digest.
pub fn salted_hash(hasher: &dyn Hasher, digest: &Hash, nonce: &str) -> Hash {
    hasher.hash(&digest.to_string(), Some(nonce))
}

/// Generate a fresh random nonce.
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().to_string()
}
