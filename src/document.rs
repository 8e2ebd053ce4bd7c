use crate::{
    canonical::{encode, Content, EncodingError},
    config::ProtocolConfig,
    did::Did,
    hashing::{hash_statements, Hash, HashedStatement, Hasher, HashingOptions, NonceMap},
    signer::{sign_with_timeout, DidSignature, Signer, SigningError},
    statement::{decompose, DecompositionError, Statement},
};
use chrono::{DateTime, SubsecRound, Utc};
use itertools::Itertools;
use multibase::Base;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt, str::FromStr};
use tracing::{debug, info};

const DOCUMENT_ID_PREFIX: &str = "doc:";

// Helper to simplify unwrapping options in the builder
macro_rules! try_get {
    ($option:ident) => {
        $option.ok_or(CommitmentError::MissingField(stringify!($option)))
    };
}

/// A document identifier, derived from the document hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct DocumentId(String);

impl DocumentId {
    /// Derive the identifier for a document hash.
    pub fn from_hash(hash: &Hash) -> Self {
        let encoded = multibase::encode(Base::Base58Btc, hash.as_bytes());
        Self(format!("{DOCUMENT_ID_PREFIX}{encoded}"))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ParseDocumentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s.strip_prefix(DOCUMENT_ID_PREFIX).ok_or(ParseDocumentIdError::Prefix)?;
        let (base, bytes) = multibase::decode(encoded).map_err(|_| ParseDocumentIdError::Multibase)?;
        if base != Base::Base58Btc || bytes.len() != 32 {
            return Err(ParseDocumentIdError::Multibase);
        }
        Ok(Self(s.to_string()))
    }
}

/// An error when parsing a document identifier.
#[derive(Debug, thiserror::Error)]
pub enum ParseDocumentIdError {
    #[error("no 'doc:' prefix")]
    Prefix,

    #[error("invalid multibase hash")]
    Multibase,
}

/// Unhashed, informational metadata attached to a document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Templates a document can be rendered with.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<String>,

    /// Free form labels.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl DocumentMetadata {
    fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.labels.is_empty()
    }
}

/// An issued document.
///
/// This commits to every statement in its content through the content hashes, and to those and
/// its metadata through the document hash, which is signed by the issuer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Document {
    /// The document identifier.
    pub identifier: DocumentId,

    /// The Did of the issuer.
    pub issuer: Did,

    /// The Did of the holder, the only party that can present this document.
    pub holder: Did,

    /// The document content.
    pub content: Content,

    /// The salted hashes of every statement in the content, sorted.
    pub content_hashes: Vec<Hash>,

    /// The nonce for every statement digest.
    pub content_nonce_map: NonceMap,

    /// The identifiers of documents this one builds upon.
    #[serde(default)]
    pub evidence_ids: Vec<DocumentId>,

    /// The authorization the issuer used to issue this document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// The registry this document belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// The time at which this document was created.
    pub created_at: DateTime<Utc>,

    /// The time until which this document is valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,

    /// The hash over the content hashes and this document's metadata.
    pub document_hash: Hash,

    /// The issuer's signature over the document hash.
    pub issuer_signature: DidSignature,

    /// Informational metadata.
    #[serde(default, skip_serializing_if = "DocumentMetadata::is_empty")]
    pub metadata: DocumentMetadata,
}

impl Document {
    /// The inputs to this document's hash.
    pub fn hash_input(&self) -> DocumentHashInput<'_> {
        DocumentHashInput {
            content_hashes: &self.content_hashes,
            issuer: &self.issuer,
            holder: &self.holder,
            evidence_ids: &self.evidence_ids,
            authorization: self.authorization.as_deref(),
            registry: self.registry.as_deref(),
            created_at: &self.created_at,
            valid_until: self.valid_until.as_ref(),
        }
    }

    /// Reproduce every statement in this document along with its committed hashes.
    ///
    /// The statements are sorted by attribute name.
    pub fn committed_statements(
        &self,
        config: &ProtocolConfig,
    ) -> Result<Vec<(Statement, HashedStatement)>, IntegrityError> {
        let statements = decompose(&self.content, config.decomposition)?;
        let encoded: Vec<_> = statements.iter().map(|s| s.encoded.as_str()).collect();
        let options = HashingOptions::new(&config.hash_algorithm).nonces(&self.content_nonce_map);
        let hashed = hash_statements(encoded.as_slice(), &options);
        if let Some(missing) = hashed.iter().find(|h| !self.content_nonce_map.contains(&h.digest)) {
            return Err(IntegrityError::MissingNonce(missing.digest));
        }
        Ok(statements.into_iter().zip(hashed).collect())
    }

    /// Check that this document's content, hashes and identifier are consistent with each other.
    ///
    /// This does not check the issuer signature.
    pub fn check_integrity(&self, config: &ProtocolConfig) -> Result<(), IntegrityError> {
        let statements = self.committed_statements(config)?;
        let salted_hashes: Vec<_> = statements.iter().map(|(_, hashed)| hashed.salted_hash).sorted().collect();
        if salted_hashes != self.content_hashes {
            return Err(IntegrityError::ContentHashesMismatch);
        }
        let document_hash = document_hash(&config.hash_algorithm, &self.hash_input())?;
        if document_hash != self.document_hash {
            return Err(IntegrityError::DocumentHashMismatch);
        }
        if DocumentId::from_hash(&document_hash) != self.identifier {
            return Err(IntegrityError::IdentifierMismatch);
        }
        Ok(())
    }
}

/// The inputs to a document hash.
#[derive(Clone, Debug)]
pub struct DocumentHashInput<'a> {
    pub content_hashes: &'a [Hash],
    pub issuer: &'a Did,
    pub holder: &'a Did,
    pub evidence_ids: &'a [DocumentId],
    pub authorization: Option<&'a str>,
    pub registry: Option<&'a str>,
    pub created_at: &'a DateTime<Utc>,
    pub valid_until: Option<&'a DateTime<Utc>>,
}

/// Compute a document hash.
///
/// The content hashes are sorted before hashing so the result doesn't depend on the order
/// statements were hashed in.
pub fn document_hash(hasher: &dyn Hasher, input: &DocumentHashInput) -> Result<Hash, EncodingError> {
    let content_hashes: Vec<_> = input.content_hashes.iter().sorted().map(|hash| Content::from(hash.to_string())).collect();
    let evidence_ids: Vec<_> = input.evidence_ids.iter().map(|id| Content::from(id.to_string())).collect();
    let timestamp = |time: &DateTime<Utc>| time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let payload = Content::object([
        ("authorization", Content::from(input.authorization.unwrap_or_default())),
        ("contentHashes", Content::Array(content_hashes)),
        ("createdAt", Content::from(timestamp(input.created_at))),
        ("evidenceIds", Content::Array(evidence_ids)),
        ("holder", Content::from(input.holder.to_string())),
        ("issuer", Content::from(input.issuer.to_string())),
        ("registry", Content::from(input.registry.unwrap_or_default())),
        ("validUntil", Content::from(input.valid_until.map(timestamp).unwrap_or_default())),
    ]);
    let encoded = encode(&payload)?;
    Ok(hasher.hash(&encoded, None))
}

/// A document builder.
#[derive(Clone, Debug)]
pub struct DocumentBuilder {
    content: Content,
    holder: Option<Did>,
    evidence_ids: Vec<DocumentId>,
    authorization: Option<String>,
    registry: Option<String>,
    created_at: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    metadata: DocumentMetadata,
}

impl DocumentBuilder {
    /// Construct a new builder for the given content.
    pub fn new(content: Content) -> Self {
        Self {
            content,
            holder: Default::default(),
            evidence_ids: Default::default(),
            authorization: Default::default(),
            registry: Default::default(),
            created_at: Default::default(),
            valid_until: Default::default(),
            metadata: Default::default(),
        }
    }

    /// Set the holder of this document.
    pub fn holder(mut self, did: Did) -> Self {
        self.holder = Some(did);
        self
    }

    /// Add a document this one builds upon.
    pub fn evidence(mut self, id: DocumentId) -> Self {
        self.evidence_ids.push(id);
        self
    }

    /// Set the authorization used to issue this document.
    pub fn authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    /// Set the registry this document belongs to.
    pub fn registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Set the creation timestamp. Defaults to the current time.
    pub fn created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_at = Some(timestamp);
        self
    }

    /// Set the time until which the document is valid.
    pub fn valid_until(mut self, timestamp: DateTime<Utc>) -> Self {
        self.valid_until = Some(timestamp);
        self
    }

    /// Set the informational metadata.
    pub fn metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build and sign a document.
    ///
    /// The signer's key must be one the issuer uses to make assertions, otherwise verifiers will
    /// reject the document. Must be called from within a Tokio runtime since signing is bounded by
    /// [`ProtocolConfig::signing_timeout`].
    pub async fn build(self, signer: &dyn Signer, config: &ProtocolConfig) -> Result<Document, CommitmentError> {
        let Self { content, holder, evidence_ids, authorization, registry, created_at, valid_until, metadata } = self;

        let holder = try_get!(holder)?;
        let issuer = *signer.key_uri().did();
        // Timestamps are committed to with second precision.
        let created_at = created_at.unwrap_or_else(Utc::now).trunc_subsecs(0);
        let valid_until = valid_until.map(|t| t.trunc_subsecs(0));
        if valid_until.is_some_and(|valid_until| valid_until <= created_at) {
            return Err(CommitmentError::InvalidValidityWindow);
        }
        // Absent fields are committed to as empty strings so an empty value would be ambiguous.
        let optional_fields = [("authorization", &authorization), ("registry", &registry)];
        if let Some((field, _)) = optional_fields.into_iter().find(|(_, value)| value.as_deref() == Some("")) {
            return Err(CommitmentError::EmptyField(field));
        }

        let statements = decompose(&content, config.decomposition)?;
        let encoded: Vec<_> = statements.iter().map(|s| s.encoded.as_str()).collect();
        let hashed = hash_statements(encoded.as_slice(), &HashingOptions::new(&config.hash_algorithm));
        if let Some((statement, _)) = statements.iter().zip(&hashed).duplicates_by(|(_, hashed)| hashed.digest).next() {
            return Err(DecompositionError::DuplicateStatement(statement.attribute.clone()).into());
        }
        let content_hashes: Vec<_> = hashed.iter().map(|h| h.salted_hash).sorted().collect();
        let content_nonce_map: NonceMap = hashed.into_iter().map(|h| (h.digest, h.nonce)).collect();

        let input = DocumentHashInput {
            content_hashes: &content_hashes,
            issuer: &issuer,
            holder: &holder,
            evidence_ids: &evidence_ids,
            authorization: authorization.as_deref(),
            registry: registry.as_deref(),
            created_at: &created_at,
            valid_until: valid_until.as_ref(),
        };
        let document_hash = document_hash(&config.hash_algorithm, &input)?;
        debug!(%document_hash, "computed document hash");

        let signature = sign_with_timeout(signer, document_hash.as_bytes(), config.signing_timeout).await?;
        let issuer_signature = DidSignature { key_uri: signer.key_uri().clone(), signature };

        let document = Document {
            identifier: DocumentId::from_hash(&document_hash),
            issuer,
            holder,
            content,
            content_hashes,
            content_nonce_map,
            evidence_ids,
            authorization,
            registry,
            created_at,
            valid_until,
            document_hash,
            issuer_signature,
            metadata,
        };
        info!(
            identifier = %document.identifier,
            issuer = %document.issuer,
            statements = document.content_hashes.len(),
            "document issued"
        );
        Ok(document)
    }
}

/// An error when building a document.
#[derive(Debug, thiserror::Error)]
pub enum CommitmentError {
    #[error("required field missing: {0}")]
    MissingField(&'static str),

    #[error("invalid content: {0}")]
    InvalidContent(#[from] DecompositionError),

    #[error("document must be valid until a time after its creation")]
    InvalidValidityWindow,

    #[error("field must not be empty: {0}")]
    EmptyField(&'static str),

    #[error("encoding document hash: {0}")]
    Encoding(#[from] EncodingError),

    #[error("signing failed: {0}")]
    SigningFailed(#[from] SigningError),
}

/// An inconsistency within a document.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("invalid content: {0}")]
    InvalidContent(#[from] DecompositionError),

    #[error("no nonce for statement digest {0}")]
    MissingNonce(Hash),

    #[error("content hashes don't match content")]
    ContentHashesMismatch,

    #[error("document hash doesn't match")]
    DocumentHashMismatch,

    #[error("identifier doesn't match document hash")]
    IdentifierMismatch,

    #[error("encoding document hash: {0}")]
    Encoding(#[from] EncodingError),
}
