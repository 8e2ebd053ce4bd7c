mod document;
mod error;
mod key;
mod resolver;
mod uri;

pub use document::{DidDocument, VerificationKey, VerificationRelationship, AUTHENTICATION_KEY_ID};
pub use error::{ParseDidError, ParseKeyUriError};
pub use resolver::{DidRegistry, KeyResolver, ResolveKeyError, ResolvedKey};
pub use uri::KeyUri;

use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// A Decentralised Identifier (Did) using the `key` method over a secp256k1 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Did {
    public_key: [u8; 33],
}

impl Did {
    /// Constructs a Did for the `key` method.
    pub fn key(public_key: [u8; 33]) -> Self {
        Self { public_key }
    }

    /// The compressed public key this Did is derived from.
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// Constructs the URI for one of the keys under this Did.
    pub fn key_uri(&self, fragment: impl Into<String>) -> KeyUri {
        KeyUri::new(*self, fragment)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", key::format(&self.public_key))
    }
}

impl FromStr for Did {
    type Err = ParseDidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("did:key:").ok_or(ParseDidError::NoDid)?;
        let public_key = key::parse(s)?;
        Ok(Self { public_key })
    }
}

impl Serialize for Did {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Did>().map_err(D::Error::custom)
    }
}
