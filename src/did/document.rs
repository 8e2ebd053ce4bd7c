use super::Did;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use std::fmt;

/// The fragment of the key every Did document authenticates with.
pub const AUTHENTICATION_KEY_ID: &str = "authentication";

/// The purpose a key is allowed to be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationRelationship {
    /// Proving control of the Did, e.g. when presenting a document.
    Authentication,

    /// Making assertions, e.g. issuing documents.
    AssertionMethod,

    /// Delegating capabilities to other parties.
    CapabilityDelegation,
}

impl fmt::Display for VerificationRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Authentication => "authentication",
            Self::AssertionMethod => "assertionMethod",
            Self::CapabilityDelegation => "capabilityDelegation",
        };
        write!(f, "{text}")
    }
}

/// A key listed in a Did document.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKey {
    /// The key's fragment within the Did.
    pub id: String,

    /// The compressed secp256k1 public key.
    #[serde_as(as = "Hex")]
    pub public_key: [u8; 33],
}

/// A Did document: the keys a Did controls, grouped by what they can be used for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The Did this document describes.
    pub id: Did,

    /// Keys used to authenticate as this Did.
    pub authentication: Vec<VerificationKey>,

    /// Keys used to make assertions on behalf of this Did.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<VerificationKey>,

    /// Keys used to delegate capabilities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<VerificationKey>,
}

impl DidDocument {
    /// Construct the minimal document for a Did, whose only key is the Did's own key used for
    /// authentication.
    pub fn new(did: Did) -> Self {
        let key = VerificationKey { id: AUTHENTICATION_KEY_ID.into(), public_key: *did.public_key() };
        Self { id: did, authentication: vec![key], assertion_method: Vec::new(), capability_delegation: Vec::new() }
    }

    /// Add a key for the given relationship.
    pub fn with_key(mut self, relationship: VerificationRelationship, id: impl Into<String>, public_key: [u8; 33]) -> Self {
        let key = VerificationKey { id: id.into(), public_key };
        match relationship {
            VerificationRelationship::Authentication => self.authentication.push(key),
            VerificationRelationship::AssertionMethod => self.assertion_method.push(key),
            VerificationRelationship::CapabilityDelegation => self.capability_delegation.push(key),
        };
        self
    }

    /// Get the keys for a relationship.
    pub fn keys(&self, relationship: VerificationRelationship) -> &[VerificationKey] {
        match relationship {
            VerificationRelationship::Authentication => &self.authentication,
            VerificationRelationship::AssertionMethod => &self.assertion_method,
            VerificationRelationship::CapabilityDelegation => &self.capability_delegation,
        }
    }

    /// Find a key by its fragment, along with every relationship it's listed under.
    pub fn find_key(&self, fragment: &str) -> Option<(&VerificationKey, Vec<VerificationRelationship>)> {
        use VerificationRelationship::*;
        let mut found = None;
        let mut relationships = Vec::new();
        for relationship in [Authentication, AssertionMethod, CapabilityDelegation] {
            if let Some(key) = self.keys(relationship).iter().find(|key| key.id == fragment) {
                found.get_or_insert(key);
                relationships.push(relationship);
            }
        }
        found.map(|key| (key, relationships))
    }
}
