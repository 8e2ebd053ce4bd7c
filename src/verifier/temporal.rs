use super::{error::ProofError, validate_condition, ProofResult};
use crate::presentation::Presentation;
use chrono::{DateTime, SubsecRound, Utc};

// Timestamps are committed to with second precision so the window is checked at that precision.
pub(super) fn prove_validity(presentation: &Presentation, now: &DateTime<Utc>) -> ProofResult {
    let now = now.trunc_subsecs(0);
    let created_at = presentation.created_at.trunc_subsecs(0);
    let valid_until = presentation.valid_until.map(|t| t.trunc_subsecs(0));
    validate_condition(created_at <= now, ProofError::DocumentNotYetValid)?;
    validate_condition(valid_until.map(|t| now < t).unwrap_or(true), ProofError::DocumentExpired)?;
    Ok(())
}
