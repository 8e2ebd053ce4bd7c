use super::{
    error::{AuthorizationFailure, ProofError},
    validate_condition, ProofResult, VerificationParameters,
};
use crate::{
    did::{Did, KeyResolver, KeyUri, ResolveKeyError, ResolvedKey, VerificationRelationship},
    presentation::{holder_signature_payload, Presentation},
};
use std::time::Duration;
use tracing::warn;

pub(super) async fn prove_issuer_signature(
    presentation: &Presentation,
    resolver: &dyn KeyResolver,
    parameters: &VerificationParameters,
    timeout: Duration,
) -> ProofResult {
    let signature = &presentation.issuer_signature;
    let key = resolve_with_timeout(resolver, &signature.key_uri, timeout).await?;
    authorize(&key, VerificationRelationship::AssertionMethod, &presentation.issuer)?;
    if let Some(expected_issuer) = &parameters.expected_issuer {
        authorize(&key, VerificationRelationship::AssertionMethod, expected_issuer)?;
    }
    signature.verify(presentation.document_hash.as_bytes(), &key.public_key).map_err(|_| ProofError::IssuerSignatureInvalid)
}

pub(super) async fn prove_holder_signature(
    presentation: &Presentation,
    resolver: &dyn KeyResolver,
    parameters: &VerificationParameters,
    timeout: Duration,
) -> ProofResult {
    validate_condition(presentation.challenge == parameters.challenge, ProofError::ChallengeMismatch)?;

    let signature = &presentation.holder_signature;
    let key = resolve_with_timeout(resolver, &signature.key_uri, timeout).await?;
    authorize(&key, VerificationRelationship::Authentication, &presentation.holder)?;

    // Always rebuild the payload from the challenge we issued rather than the presented one.
    let payload = holder_signature_payload(
        &parameters.challenge,
        presentation.disclosed.iter().map(|s| &s.digest),
        &presentation.document_hash,
    )
    .map_err(|_| ProofError::HolderSignatureInvalid)?;
    signature.verify(payload.as_bytes(), &key.public_key).map_err(|_| ProofError::HolderSignatureInvalid)
}

fn authorize(key: &ResolvedKey, relationship: VerificationRelationship, controller: &Did) -> ProofResult {
    let unauthorized = |reason| ProofError::KeyNotAuthorized { key_uri: key.key_uri.clone(), reason };
    validate_condition(key.allows(relationship), unauthorized(AuthorizationFailure::MissingRelationship(relationship)))?;
    validate_condition(
        &key.controller == controller,
        unauthorized(AuthorizationFailure::WrongController { expected: *controller, actual: key.controller }),
    )
}

async fn resolve_with_timeout(
    resolver: &dyn KeyResolver,
    key_uri: &KeyUri,
    timeout: Duration,
) -> Result<ResolvedKey, ResolveKeyError> {
    match tokio::time::timeout(timeout, resolver.resolve(key_uri)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%key_uri, ?timeout, "key resolution timed out");
            Err(ResolveKeyError::Timeout(timeout))
        }
    }
}
