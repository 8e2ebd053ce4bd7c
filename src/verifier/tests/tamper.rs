use super::{
    fixtures::{alice, failures, Parties, ASSERTION_KEY_ID},
    *,
};
use crate::{
    did::{DidDocument, VerificationRelationship},
    hashing::{salted_hash, Hash, Hasher},
    keypair::Keypair,
    signer::Signer,
    statement::encode_statement,
};

#[tokio::test]
async fn changed_value() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name", "country"]).await;
    presentation.disclosed[0].value = Content::from("IN");

    let report = parties.verify(&presentation).await;
    let expected = ProofError::StatementTampered { attribute: "country".into(), reason: TamperKind::DigestMismatch };
    assert_eq!(failures(&report), [(ProofKind::Statement, expected)]);
}

#[tokio::test]
async fn changed_value_and_digest() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["country"]).await;
    let statement = encode_statement("country", &Content::from("IN")).unwrap();
    presentation.disclosed[0].value = Content::from("IN");
    presentation.disclosed[0].digest = HashAlgorithm::Sha256.hash(&statement, None);

    let report = parties.verify(&presentation).await;
    let expected = ProofError::StatementTampered { attribute: "country".into(), reason: TamperKind::MissingNonce };
    assert_eq!(
        failures(&report),
        [(ProofKind::Statement, expected), (ProofKind::SelfSignature, ProofError::HolderSignatureInvalid)]
    );
}

#[tokio::test]
async fn forged_statement() {
    // The holder makes up a statement that's internally consistent and signs it themselves.
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["country"]).await;
    let hasher = HashAlgorithm::Sha256;
    let digest = hasher.hash(&encode_statement("country", &Content::from("IN")).unwrap(), None);
    let forged = salted_hash(&hasher, &digest, "forged-nonce");
    presentation.nonce_map.insert(digest, "forged-nonce".into());
    presentation.disclosed[0].value = Content::from("IN");
    presentation.disclosed[0].digest = digest;
    presentation.disclosed[0].salted_hash = forged;
    parties.resign(&mut presentation).await;

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Digest, ProofError::DigestNotCommitted(forged))]);
}

#[tokio::test]
async fn forged_statement_added_to_content_hashes() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["country"]).await;
    let hasher = HashAlgorithm::Sha256;
    let digest = hasher.hash(&encode_statement("country", &Content::from("IN")).unwrap(), None);
    let forged = salted_hash(&hasher, &digest, "forged-nonce");
    presentation.nonce_map.insert(digest, "forged-nonce".into());
    presentation.disclosed[0] = crate::presentation::DisclosedStatement {
        attribute: "country".into(),
        value: Content::from("IN"),
        digest,
        salted_hash: forged,
    };
    presentation.content_hashes.push(forged);
    presentation.content_hashes.sort();
    parties.resign(&mut presentation).await;

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Digest, ProofError::DocumentHashMismatch)]);
}

#[tokio::test]
async fn substituted_salted_hash() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    let substituted = Hash([9; 32]);
    presentation.disclosed[0].salted_hash = substituted;

    let report = parties.verify(&presentation).await;
    let tampered = ProofError::StatementTampered { attribute: "name".into(), reason: TamperKind::SaltedHashMismatch };
    assert_eq!(
        failures(&report),
        [(ProofKind::Statement, tampered), (ProofKind::Digest, ProofError::DigestNotCommitted(substituted))]
    );
}

#[tokio::test]
async fn duplicate_content_hash() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    let first = presentation.content_hashes[0];
    presentation.content_hashes.push(first);

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Digest, ProofError::DuplicateContentHashes)]);
}

#[tokio::test]
async fn changed_metadata() {
    let parties = Parties::new();
    let document = parties
        .builder(alice())
        .registry("registry:1")
        .build(&parties.issuer.signer(ASSERTION_KEY_ID), &parties.config)
        .await
        .expect("build failed");
    let mut presentation = parties.present(&document, &["name"]).await;
    presentation.registry = Some("registry:2".into());

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Digest, ProofError::DocumentHashMismatch)]);
}

#[tokio::test]
async fn changed_identifier() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    presentation.identifier = crate::document::DocumentId::from_hash(&Hash([1; 32]));

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Digest, ProofError::IdentifierMismatch)]);
}

#[tokio::test]
async fn changed_document_hash() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    presentation.document_hash = Hash([1; 32]);
    parties.resign(&mut presentation).await;

    let report = parties.verify(&presentation).await;
    assert_eq!(
        failures(&report),
        [(ProofKind::Digest, ProofError::DocumentHashMismatch), (ProofKind::Signature, ProofError::IssuerSignatureInvalid)]
    );
}

#[tokio::test]
async fn resigned_with_other_key() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    let attacker = Keypair::generate();
    let signature = attacker.signer(ASSERTION_KEY_ID).sign(presentation.document_hash.as_bytes()).await.unwrap();
    presentation.issuer_signature.signature = signature;

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Signature, ProofError::IssuerSignatureInvalid)]);
}

#[tokio::test]
async fn resigned_by_other_issuer() {
    // An attacker with a valid assertion key of their own signs someone else's document.
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    let attacker = Keypair::generate();
    let attacker_document = DidDocument::new(attacker.to_did()).with_key(
        VerificationRelationship::AssertionMethod,
        ASSERTION_KEY_ID,
        attacker.public_key(),
    );
    parties.registry.register(attacker_document).unwrap();
    let signer = attacker.signer(ASSERTION_KEY_ID);
    presentation.issuer_signature.signature = signer.sign(presentation.document_hash.as_bytes()).await.unwrap();
    presentation.issuer_signature.key_uri = signer.key_uri().clone();

    let report = parties.verify(&presentation).await;
    let expected = ProofError::KeyNotAuthorized {
        key_uri: signer.key_uri().clone(),
        reason: AuthorizationFailure::WrongController { expected: parties.issuer_did(), actual: attacker.to_did() },
    };
    assert_eq!(failures(&report), [(ProofKind::Signature, expected)]);
}

#[tokio::test]
async fn duplicate_disclosure() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    let duplicate = presentation.disclosed[0].clone();
    presentation.disclosed.push(duplicate);
    parties.resign(&mut presentation).await;

    let report = parties.verify(&presentation).await;
    let expected = ProofError::StatementTampered { attribute: "name".into(), reason: TamperKind::DuplicateAttribute };
    assert_eq!(failures(&report), [(ProofKind::Statement, expected)]);
}

#[tokio::test]
async fn nothing_disclosed() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let mut presentation = parties.present(&document, &["name"]).await;
    presentation.disclosed.clear();
    presentation.nonce_map = Default::default();
    parties.resign(&mut presentation).await;

    let report = parties.verify(&presentation).await;
    assert_eq!(failures(&report), [(ProofKind::Statement, ProofError::NothingDisclosed)]);
}

#[tokio::test]
async fn undisclosed_values_are_not_reported() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let presentation = parties.present(&document, &["name"]).await;
    let verified = parties.verify(&presentation).await.into_result().expect("verification failed");
    assert!(!verified.values.contains_key("age"));
    assert!(!verified.values.contains_key("country"));
}
