use super::{error::ProofError, validate_condition, ProofResult};
use crate::{
    document::{document_hash, DocumentId},
    hashing::Hasher,
    presentation::Presentation,
};
use std::collections::HashSet;

// Disclosed salted hashes must be part of the committed set, and that set along with the
// document's metadata must reproduce the signed document hash.
pub(super) fn prove_digests(presentation: &Presentation, hasher: &dyn Hasher) -> ProofResult {
    let committed: HashSet<_> = presentation.content_hashes.iter().collect();
    validate_condition(committed.len() == presentation.content_hashes.len(), ProofError::DuplicateContentHashes)?;
    for disclosed in &presentation.disclosed {
        validate_condition(
            committed.contains(&disclosed.salted_hash),
            ProofError::DigestNotCommitted(disclosed.salted_hash),
        )?;
    }

    let document_hash =
        document_hash(hasher, &presentation.hash_input()).map_err(|_| ProofError::DocumentHashMismatch)?;
    validate_condition(document_hash == presentation.document_hash, ProofError::DocumentHashMismatch)?;
    validate_condition(DocumentId::from_hash(&document_hash) == presentation.identifier, ProofError::IdentifierMismatch)
}
