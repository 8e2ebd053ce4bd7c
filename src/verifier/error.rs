use crate::{
    did::{Did, KeyUri, ResolveKeyError, VerificationRelationship},
    hashing::Hash,
};
use std::fmt;

/// One of the checks run against a presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProofKind {
    /// Disclosed statements reproduce their salted hashes.
    Statement,

    /// Disclosed salted hashes are committed to by the document hash.
    Digest,

    /// The issuer signed the document hash.
    Signature,

    /// The holder signed the verifier's challenge.
    SelfSignature,

    /// The document is within its validity window.
    Validity,
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Statement => "statement proof",
            Self::Digest => "digest proof",
            Self::Signature => "signature proof",
            Self::SelfSignature => "self-signature proof",
            Self::Validity => "validity check",
        };
        write!(f, "{text}")
    }
}

/// The way a disclosed statement was found to be tampered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TamperKind {
    DigestMismatch,
    DuplicateAttribute,
    Encoding,
    MissingNonce,
    SaltedHashMismatch,
}

impl fmt::Display for TamperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TamperKind::*;
        let text = match self {
            DigestMismatch => "value doesn't match digest",
            DuplicateAttribute => "attribute disclosed more than once",
            Encoding => "value can't be encoded",
            MissingNonce => "no nonce for digest",
            SaltedHashMismatch => "salted hash doesn't match digest and nonce",
        };
        write!(f, "{text}")
    }
}

/// The reason a key can't be used for a proof.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthorizationFailure {
    /// The key isn't listed under the relationship the proof requires.
    MissingRelationship(VerificationRelationship),

    /// The key is controlled by someone other than the party the proof is about.
    WrongController { expected: Did, actual: Did },
}

impl fmt::Display for AuthorizationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRelationship(relationship) => write!(f, "not an {relationship} key"),
            Self::WrongController { expected, actual } => write!(f, "controlled by {actual}, expected {expected}"),
        }
    }
}

/// An error produced by a single proof.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ProofError {
    #[error("statement '{attribute}' was tampered with: {reason}")]
    StatementTampered { attribute: String, reason: TamperKind },

    #[error("no statements disclosed")]
    NothingDisclosed,

    #[error("salted hash {0} is not committed to by the document")]
    DigestNotCommitted(Hash),

    #[error("content hashes contain duplicates")]
    DuplicateContentHashes,

    #[error("document hash doesn't match its contents")]
    DocumentHashMismatch,

    #[error("identifier doesn't match document hash")]
    IdentifierMismatch,

    #[error("invalid issuer signature")]
    IssuerSignatureInvalid,

    #[error("invalid holder signature")]
    HolderSignatureInvalid,

    #[error("presentation is bound to a different challenge")]
    ChallengeMismatch,

    #[error("key {key_uri} not authorized: {reason}")]
    KeyNotAuthorized { key_uri: KeyUri, reason: AuthorizationFailure },

    #[error("key resolution: {0}")]
    KeyResolution(#[from] ResolveKeyError),

    #[error("document is expired")]
    DocumentExpired,

    #[error("document is not valid yet")]
    DocumentNotYetValid,
}

/// The failures of a presentation that didn't verify.
#[derive(Debug)]
pub struct VerificationError {
    /// Every proof that failed, in the order they ran.
    pub failures: Vec<(ProofKind, ProofError)>,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "verification failed")?;
        for (index, (kind, error)) in self.failures.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{kind}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VerificationError {}
