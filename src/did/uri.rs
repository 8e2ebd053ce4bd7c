use super::{error::ParseKeyUriError, Did};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt, str::FromStr};

/// A reference to one key under a Did, in the form `<did>#<fragment>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct KeyUri {
    did: Did,
    fragment: String,
}

impl KeyUri {
    /// Construct a key URI.
    pub fn new(did: Did, fragment: impl Into<String>) -> Self {
        Self { did, fragment: fragment.into() }
    }

    /// The Did that controls this key.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The fragment that identifies the key within its Did.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl fmt::Display for KeyUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.did, self.fragment)
    }
}

impl FromStr for KeyUri {
    type Err = ParseKeyUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (did, fragment) = s.split_once('#').ok_or(ParseKeyUriError::NoFragment)?;
        if fragment.is_empty() {
            return Err(ParseKeyUriError::EmptyFragment);
        }
        let did = did.parse()?;
        Ok(Self { did, fragment: fragment.to_string() })
    }
}
