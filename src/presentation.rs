use crate::{
    canonical::{encode, Content, EncodingError},
    config::ProtocolConfig,
    did::Did,
    document::{Document, DocumentHashInput, DocumentId, DocumentMetadata, IntegrityError},
    hashing::{Hash, NonceMap},
    signer::{sign_with_timeout, DidSignature, Signer, SigningError},
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

/// A statement revealed in a presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisclosedStatement {
    /// The attribute this statement is about.
    pub attribute: String,

    /// The attribute's value.
    pub value: Content,

    /// The statement digest.
    pub digest: Hash,

    /// The salted hash committed to in the document.
    pub salted_hash: Hash,
}

/// A partial view of a document, bound to a verifier's challenge.
///
/// This carries the document's full set of content hashes and its signed metadata, but only the
/// statements and nonces the holder chose to reveal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Presentation {
    /// The identifier of the presented document.
    pub identifier: DocumentId,

    /// The Did of the document's issuer.
    pub issuer: Did,

    /// The Did of the document's holder.
    pub holder: Did,

    /// The salted hashes of every statement in the document.
    pub content_hashes: Vec<Hash>,

    /// The identifiers of the documents the presented one builds upon.
    #[serde(default)]
    pub evidence_ids: Vec<DocumentId>,

    /// The document's authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// The document's registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// The time at which the document was created.
    pub created_at: DateTime<Utc>,

    /// The time until which the document is valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,

    /// The document hash.
    pub document_hash: Hash,

    /// The issuer's signature over the document hash.
    pub issuer_signature: DidSignature,

    /// The document's informational metadata.
    #[serde(default)]
    pub metadata: DocumentMetadata,

    /// The revealed statements, sorted by attribute.
    pub disclosed: Vec<DisclosedStatement>,

    /// The nonces for the revealed statements only.
    pub nonce_map: NonceMap,

    /// The challenge this presentation is bound to.
    pub challenge: String,

    /// The holder's signature over the challenge and the disclosed digests.
    pub holder_signature: DidSignature,
}

impl Presentation {
    /// The inputs to the presented document's hash.
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
}

/// Encode the payload a holder signs when presenting a document.
///
/// Digests are sorted so the payload doesn't depend on disclosure order.
pub fn holder_signature_payload<'a, I>(challenge: &str, digests: I, document_hash: &Hash) -> Result<String, EncodingError>
where
    I: IntoIterator<Item = &'a Hash>,
{
    let digests = digests.into_iter().sorted().map(|digest| Content::from(digest.to_string())).collect();
    let payload = Content::object([
        ("challenge", Content::from(challenge)),
        ("digests", Content::Array(digests)),
        ("documentHash", Content::from(document_hash.to_string())),
    ]);
    encode(&payload)
}

/// Create a presentation of a document that reveals only the given attributes.
///
/// The signer must use a key controlled by the document's holder. Must be called from within a
/// Tokio runtime since signing is bounded by [`ProtocolConfig::signing_timeout`].
pub async fn present<I, S>(
    document: &Document,
    attributes: I,
    signer: &dyn Signer,
    challenge: &str,
    config: &ProtocolConfig,
) -> Result<Presentation, DisclosureError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let signer_did = signer.key_uri().did();
    if signer_did != &document.holder {
        return Err(DisclosureError::HolderMismatch(*signer_did));
    }

    let requested: BTreeSet<String> = attributes.into_iter().map(|a| a.as_ref().nfc().collect()).collect();
    if requested.is_empty() {
        return Err(DisclosureError::EmptyDisclosure);
    }
    let mut statements = document.committed_statements(config)?;
    if let Some(unknown) = requested.iter().find(|a| !statements.iter().any(|(s, _)| &s.attribute == *a)) {
        return Err(DisclosureError::UnknownAttribute(unknown.clone()));
    }
    statements.retain(|(statement, _)| requested.contains(&statement.attribute));

    let disclosed: Vec<_> = statements
        .into_iter()
        .map(|(statement, hashed)| DisclosedStatement {
            attribute: statement.attribute,
            value: statement.value,
            digest: hashed.digest,
            salted_hash: hashed.salted_hash,
        })
        .collect();
    let nonce_map = document.content_nonce_map.restricted_to(disclosed.iter().map(|s| &s.digest));

    let payload = holder_signature_payload(challenge, disclosed.iter().map(|s| &s.digest), &document.document_hash)?;
    let signature = sign_with_timeout(signer, payload.as_bytes(), config.signing_timeout).await?;
    let holder_signature = DidSignature { key_uri: signer.key_uri().clone(), signature };

    info!(identifier = %document.identifier, disclosed = disclosed.len(), "presentation created");
    Ok(Presentation {
        identifier: document.identifier.clone(),
        issuer: document.issuer,
        holder: document.holder,
        content_hashes: document.content_hashes.clone(),
        evidence_ids: document.evidence_ids.clone(),
        authorization: document.authorization.clone(),
        registry: document.registry.clone(),
        created_at: document.created_at,
        valid_until: document.valid_until,
        document_hash: document.document_hash,
        issuer_signature: document.issuer_signature.clone(),
        metadata: document.metadata.clone(),
        disclosed,
        nonce_map,
        challenge: challenge.to_string(),
        holder_signature,
    })
}

/// An error when creating a presentation.
#[derive(Debug, thiserror::Error)]
pub enum DisclosureError {
    #[error("no statement for attribute '{0}'")]
    UnknownAttribute(String),

    #[error("at least one attribute must be disclosed")]
    EmptyDisclosure,

    #[error("{0} is not the document's holder")]
    HolderMismatch(Did),

    #[error("invalid document: {0}")]
    InvalidDocument(#[from] IntegrityError),

    #[error("encoding holder signature payload: {0}")]
    Encoding(#[from] EncodingError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::DocumentBuilder, keypair::Keypair, statement::Decomposition};
    use serde_json::json;

    struct Parties {
        issuer: Keypair,
        holder: Keypair,
    }

    impl Parties {
        fn new() -> Self {
            Self { issuer: Keypair::generate(), holder: Keypair::generate() }
        }

        async fn issue(&self, content: serde_json::Value, config: &ProtocolConfig) -> Document {
            DocumentBuilder::new(Content::try_from(content).expect("invalid content"))
                .holder(self.holder.to_did())
                .build(&self.issuer.signer("assertion"), config)
                .await
                .expect("build failed")
        }
    }

    fn alice() -> serde_json::Value {
        json!({"name": "Alice", "country": "PK", "age": 30})
    }

    #[tokio::test]
    async fn selective_disclosure() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(alice(), &config).await;
        let signer = parties.holder.signer("authentication");
        let presentation =
            present(&document, ["name", "country"], &signer, "c-123", &config).await.expect("present failed");

        let attributes: Vec<_> = presentation.disclosed.iter().map(|s| s.attribute.as_str()).collect();
        assert_eq!(attributes, ["country", "name"]);
        assert_eq!(presentation.disclosed[0].value, Content::from("PK"));
        assert_eq!(presentation.nonce_map.len(), 2);
        assert_eq!(presentation.content_hashes, document.content_hashes);
        assert_eq!(presentation.document_hash, document.document_hash);
        for statement in &presentation.disclosed {
            assert_eq!(presentation.nonce_map.get(&statement.digest), document.content_nonce_map.get(&statement.digest));
            assert!(document.content_hashes.contains(&statement.salted_hash));
        }

        let payload = holder_signature_payload(
            "c-123",
            presentation.disclosed.iter().map(|s| &s.digest),
            &presentation.document_hash,
        )
        .unwrap();
        presentation
            .holder_signature
            .verify(payload.as_bytes(), &parties.holder.public_key())
            .expect("invalid holder signature");
    }

    #[tokio::test]
    async fn undisclosed_statements_dont_leak() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(alice(), &config).await;
        let presentation = present(&document, ["name"], &parties.holder.signer("authentication"), "c-1", &config)
            .await
            .expect("present failed");

        let (age_statement, age_hashes) = document
            .committed_statements(&config)
            .unwrap()
            .into_iter()
            .find(|(s, _)| s.attribute == "age")
            .unwrap();
        let serialized = serde_json::to_string(&presentation).unwrap();
        assert!(!serialized.contains(&age_hashes.nonce));
        assert!(!serialized.contains(&age_hashes.digest.to_string()));
        assert!(!serialized.contains(&age_statement.encoded));
        assert!(!presentation.nonce_map.contains(&age_hashes.digest));
    }

    #[tokio::test]
    async fn leaf_disclosure() {
        let parties = Parties::new();
        let config = ProtocolConfig { decomposition: Decomposition::Leaf, ..Default::default() };
        let document = parties.issue(json!({"address": {"city": "Lahore", "zip": "54000"}}), &config).await;
        let presentation =
            present(&document, ["address.city"], &parties.holder.signer("authentication"), "c-1", &config)
                .await
                .expect("present failed");
        assert_eq!(presentation.disclosed.len(), 1);
        assert_eq!(presentation.disclosed[0].value, Content::from("Lahore"));
    }

    #[tokio::test]
    async fn repeated_attributes() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(alice(), &config).await;
        let presentation = present(&document, ["age", "age"], &parties.holder.signer("authentication"), "c", &config)
            .await
            .expect("present failed");
        assert_eq!(presentation.disclosed.len(), 1);
    }

    #[tokio::test]
    async fn attribute_names_are_normalized() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(json!({"Cafe\u{301}": "open"}), &config).await;
        let presentation = present(&document, ["Caf\u{e9}"], &parties.holder.signer("authentication"), "c", &config)
            .await
            .expect("present failed");
        assert_eq!(presentation.disclosed[0].attribute, "Caf\u{e9}");
    }

    #[tokio::test]
    async fn unknown_attribute() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(alice(), &config).await;
        let err = present(&document, ["name", "email"], &parties.holder.signer("authentication"), "c", &config)
            .await
            .expect_err("present succeeded");
        assert!(matches!(err, DisclosureError::UnknownAttribute(name) if name == "email"));
    }

    #[tokio::test]
    async fn empty_disclosure() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(alice(), &config).await;
        let err = present(&document, Vec::<String>::new(), &parties.holder.signer("authentication"), "c", &config)
            .await
            .expect_err("present succeeded");
        assert!(matches!(err, DisclosureError::EmptyDisclosure));
    }

    #[tokio::test]
    async fn not_the_holder() {
        let parties = Parties::new();
        let config = ProtocolConfig::default();
        let document = parties.issue(alice(), &config).await;
        let other = Keypair::generate();
        let err = present(&document, ["name"], &other.signer("authentication"), "c", &config)
            .await
            .expect_err("present succeeded");
        assert!(matches!(err, DisclosureError::HolderMismatch(did) if did == other.to_did()));
    }

    #[test]
    fn payload_ignores_digest_order() {
        let a = Hash([1; 32]);
        let b = Hash([2; 32]);
        let document_hash = Hash([3; 32]);
        assert_eq!(
            holder_signature_payload("c", [&a, &b], &document_hash).unwrap(),
            holder_signature_payload("c", [&b, &a], &document_hash).unwrap()
        );
        assert_ne!(
            holder_signature_payload("c", [&a], &document_hash).unwrap(),
            holder_signature_payload("d", [&a], &document_hash).unwrap()
        );
    }
}
