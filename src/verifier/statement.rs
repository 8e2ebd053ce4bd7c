use super::{
    error::{ProofError, TamperKind},
    validate_condition, ProofResult,
};
use crate::{
    hashing::{salted_hash, Hasher},
    presentation::Presentation,
    statement::encode_statement,
};
use std::collections::HashSet;

// Every disclosed statement must reproduce its digest from its value, and its salted hash from the
// digest and the disclosed nonce.
pub(super) fn prove_statements(presentation: &Presentation, hasher: &dyn Hasher) -> ProofResult {
    validate_condition(!presentation.disclosed.is_empty(), ProofError::NothingDisclosed)?;
    let mut attributes = HashSet::new();
    for disclosed in &presentation.disclosed {
        let tampered = |reason| ProofError::StatementTampered { attribute: disclosed.attribute.clone(), reason };
        validate_condition(attributes.insert(disclosed.attribute.as_str()), tampered(TamperKind::DuplicateAttribute))?;

        let statement =
            encode_statement(&disclosed.attribute, &disclosed.value).map_err(|_| tampered(TamperKind::Encoding))?;
        validate_condition(hasher.hash(&statement, None) == disclosed.digest, tampered(TamperKind::DigestMismatch))?;

        let nonce = presentation.nonce_map.get(&disclosed.digest).ok_or_else(|| tampered(TamperKind::MissingNonce))?;
        let reproduced = salted_hash(hasher, &disclosed.digest, nonce);
        validate_condition(reproduced == disclosed.salted_hash, tampered(TamperKind::SaltedHashMismatch))?;
    }
    Ok(())
}
