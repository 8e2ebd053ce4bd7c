use crate::{hashing::HashAlgorithm, statement::Decomposition};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// The protocol parameters shared by issuers, holders, and verifiers.
///
/// Every party in an interaction must use the same hash algorithm and decomposition, otherwise
/// hashes won't match.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ProtocolConfig {
    /// The hash algorithm used for digests, salted hashes, and document hashes.
    pub hash_algorithm: HashAlgorithm,

    /// How content is split into statements.
    pub decomposition: Decomposition,

    /// The maximum time to wait for a signer.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub signing_timeout: Duration,

    /// The maximum time to wait for a key to be resolved.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub resolve_timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            decomposition: Decomposition::default(),
            signing_timeout: DEFAULT_SIGNING_TIMEOUT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl ProtocolConfig {
    /// Load a configuration from JSON, using defaults for any missing field.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
