mod digest;
pub mod error;
mod signature;
mod statement;
mod temporal;

#[cfg(test)]
mod tests;

use crate::{
    canonical::Content,
    config::ProtocolConfig,
    did::{Did, KeyResolver},
    document::DocumentId,
    presentation::Presentation,
};
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, warn};

pub use error::{AuthorizationFailure, ProofError, ProofKind, TamperKind, VerificationError};

/// The result of running a single proof.
pub type ProofResult = Result<(), ProofError>;

/// Parameters to be used when verifying a presentation.
#[derive(Clone, Debug)]
pub struct VerificationParameters {
    /// The challenge the verifier issued for this interaction.
    pub challenge: String,

    /// The Did the document must have been issued by, if any.
    pub expected_issuer: Option<Did>,

    /// Whether to check the document's validity window.
    pub check_validity_window: bool,
}

impl VerificationParameters {
    /// Construct parameters for a challenge, with no issuer constraint.
    pub fn new(challenge: impl Into<String>) -> Self {
        Self { challenge: challenge.into(), expected_issuer: None, check_validity_window: true }
    }

    /// Require the document to have been issued by the given Did.
    pub fn expected_issuer(mut self, did: Did) -> Self {
        self.expected_issuer = Some(did);
        self
    }
}

/// The outcome of one proof.
#[derive(Clone, Debug, PartialEq)]
pub struct ProofOutcome {
    /// The proof that ran.
    pub kind: ProofKind,

    /// Whether it passed, and why not if it didn't.
    pub result: ProofResult,
}

impl ProofOutcome {
    /// Whether this proof passed.
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// A structured report of every proof run against a presentation.
#[derive(Clone, Debug)]
pub struct VerificationReport {
    /// The identifier of the presented document.
    pub identifier: DocumentId,

    /// The outcome of every proof, in the order they ran.
    pub outcomes: Vec<ProofOutcome>,

    issuer: Did,
    holder: Did,
    values: BTreeMap<String, Content>,
}

impl VerificationReport {
    fn new(presentation: &Presentation) -> Self {
        let values = presentation.disclosed.iter().map(|s| (s.attribute.clone(), s.value.clone())).collect();
        Self {
            identifier: presentation.identifier.clone(),
            outcomes: Vec::new(),
            issuer: presentation.issuer,
            holder: presentation.holder,
            values,
        }
    }

    fn record(&mut self, kind: ProofKind, result: ProofResult) {
        match &result {
            Ok(()) => debug!(identifier = %self.identifier, %kind, "proof passed"),
            Err(e) => warn!(identifier = %self.identifier, %kind, error = %e, "proof failed"),
        };
        self.outcomes.push(ProofOutcome { kind, result });
    }

    /// Whether every proof passed.
    pub fn is_verified(&self) -> bool {
        self.outcomes.iter().all(ProofOutcome::passed)
    }

    /// Get the outcome of a proof, if it ran.
    pub fn outcome(&self, kind: ProofKind) -> Option<&ProofOutcome> {
        self.outcomes.iter().find(|outcome| outcome.kind == kind)
    }

    /// Iterate over the proofs that failed.
    pub fn failures(&self) -> impl Iterator<Item = (ProofKind, &ProofError)> {
        self.outcomes.iter().filter_map(|outcome| outcome.result.as_ref().err().map(|e| (outcome.kind, e)))
    }

    /// Turn this report into the verified presentation, or every failure if any proof failed.
    pub fn into_result(self) -> Result<VerifiedPresentation, VerificationError> {
        let failures: Vec<_> =
            self.outcomes.into_iter().filter_map(|outcome| outcome.result.err().map(|e| (outcome.kind, e))).collect();
        if !failures.is_empty() {
            return Err(VerificationError { failures });
        }
        Ok(VerifiedPresentation {
            identifier: self.identifier,
            issuer: self.issuer,
            holder: self.holder,
            values: self.values,
        })
    }
}

/// A presentation that passed every proof.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedPresentation {
    /// The identifier of the presented document.
    pub identifier: DocumentId,

    /// The Did of the document's issuer.
    pub issuer: Did,

    /// The Did of the document's holder.
    pub holder: Did,

    /// The disclosed attributes and their values.
    pub values: BTreeMap<String, Content>,
}

/// A presentation verifier.
pub struct PresentationVerifier {
    resolver: Arc<dyn KeyResolver>,
    config: ProtocolConfig,
    time_provider: Box<dyn TimeProvider>,
}

impl PresentationVerifier {
    /// Construct a new verifier that resolves keys through the given resolver.
    pub fn new(resolver: Arc<dyn KeyResolver>, config: ProtocolConfig) -> Self {
        Self { resolver, config, time_provider: Box::new(SystemClockTimeProvider) }
    }

    /// Verify a presentation.
    ///
    /// Every proof runs even if an earlier one failed, so the report lists every failure. Must be
    /// called from within a Tokio runtime since key resolution is bounded by
    /// [`ProtocolConfig::resolve_timeout`].
    pub async fn verify(&self, presentation: &Presentation, parameters: &VerificationParameters) -> VerificationReport {
        let hasher = &self.config.hash_algorithm;
        let resolver = self.resolver.as_ref();
        let timeout = self.config.resolve_timeout;
        let mut report = VerificationReport::new(presentation);

        report.record(ProofKind::Statement, statement::prove_statements(presentation, hasher));
        report.record(ProofKind::Digest, digest::prove_digests(presentation, hasher));
        let result = signature::prove_issuer_signature(presentation, resolver, parameters, timeout).await;
        report.record(ProofKind::Signature, result);
        let result = signature::prove_holder_signature(presentation, resolver, parameters, timeout).await;
        report.record(ProofKind::SelfSignature, result);
        if parameters.check_validity_window {
            let now = self.time_provider.current_time();
            report.record(ProofKind::Validity, temporal::prove_validity(presentation, &now));
        }

        info!(identifier = %presentation.identifier, verified = report.is_verified(), "verification finished");
        report
    }
}

fn validate_condition(condition: bool, error: ProofError) -> ProofResult {
    if condition { Ok(()) } else { Err(error) }
}

trait TimeProvider: Send + Sync + 'static {
    fn current_time(&self) -> DateTime<Utc>;
}

struct SystemClockTimeProvider;

impl TimeProvider for SystemClockTimeProvider {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
