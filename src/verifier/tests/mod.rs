mod tamper;

use super::*;
use crate::{hashing::HashAlgorithm, statement::Decomposition};
use fixtures::{alice, Parties, CHALLENGE};
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn selective_disclosure_verifies() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let presentation = parties.present(&document, &["name", "country"]).await;

    let report = parties.verify(&presentation).await;
    let kinds: Vec<_> = report.outcomes.iter().map(|outcome| outcome.kind).collect();
    assert_eq!(
        kinds,
        [ProofKind::Statement, ProofKind::Digest, ProofKind::Signature, ProofKind::SelfSignature, ProofKind::Validity]
    );
    assert!(report.is_verified(), "verification failed: {:?}", report.outcomes);

    let verified = report.into_result().expect("verification failed");
    assert_eq!(verified.identifier, document.identifier);
    assert_eq!(verified.issuer, parties.issuer_did());
    assert_eq!(verified.holder, parties.holder.to_did());
    let expected = BTreeMap::from([("country".to_string(), Content::from("PK")), ("name".to_string(), Content::from("Alice"))]);
    assert_eq!(verified.values, expected);
}

#[rstest]
#[case::sha256_top_level(HashAlgorithm::Sha256, Decomposition::TopLevel, &["age"])]
#[case::blake3_top_level(HashAlgorithm::Blake3, Decomposition::TopLevel, &["address", "name"])]
#[case::sha256_leaf(HashAlgorithm::Sha256, Decomposition::Leaf, &["address.city", "tags.1"])]
#[case::blake3_leaf(HashAlgorithm::Blake3, Decomposition::Leaf, &["age"])]
#[tokio::test]
async fn honest_presentations_verify(
    #[case] hash_algorithm: HashAlgorithm,
    #[case] decomposition: Decomposition,
    #[case] attributes: &[&str],
) {
    let config = ProtocolConfig { hash_algorithm, decomposition, ..Default::default() };
    let parties = Parties::with_config(config);
    let content = json!({
        "name": "Alice",
        "age": 30,
        "address": {"city": "Lahore", "zip": "54000"},
        "tags": ["kyc", "verified"],
    });
    let document = parties
        .builder(content)
        .registry("registry:kyc")
        .authorization("authorization:1")
        .build(&parties.issuer.signer(fixtures::ASSERTION_KEY_ID), &parties.config)
        .await
        .expect("build failed");
    let presentation = parties.present(&document, attributes).await;

    let verified = parties.verify(&presentation).await.into_result().expect("verification failed");
    assert_eq!(verified.values.len(), attributes.len());
}

#[tokio::test]
async fn full_disclosure() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let presentation = parties.present(&document, &["name", "country", "age"]).await;
    assert_eq!(presentation.nonce_map, document.content_nonce_map);

    let verified = parties.verify(&presentation).await.into_result().expect("verification failed");
    assert_eq!(verified.values.get("age"), Some(&Content::from(30)));
}

#[tokio::test]
async fn verifier_config_must_match() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let presentation = parties.present(&document, &["name"]).await;

    let config = ProtocolConfig { hash_algorithm: HashAlgorithm::Blake3, ..Default::default() };
    let verifier = PresentationVerifier::new(parties.registry.clone(), config);
    let report = verifier.verify(&presentation, &VerificationParameters::new(CHALLENGE)).await;
    assert!(!report.is_verified());
    assert!(!report.outcome(ProofKind::Statement).expect("no statement proof").passed());
    assert!(!report.outcome(ProofKind::Digest).expect("no digest proof").passed());
}

#[tokio::test]
async fn presentation_serde() {
    let parties = Parties::new();
    let document = parties.issue(alice()).await;
    let presentation = parties.present(&document, &["name"]).await;

    let serialized = serde_json::to_string(&presentation).expect("serialization failed");
    let deserialized: Presentation = serde_json::from_str(&serialized).expect("deserialization failed");
    assert_eq!(deserialized, presentation);
    parties.verify(&deserialized).await.into_result().expect("verification failed");
}
