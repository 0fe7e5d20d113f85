use protocol::{Hash32, Nipst};
use thiserror::Error;

/// The proof failed verification against its challenge hash.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidProof(pub String);

/// External seam to the NIPST verification machinery. The core only asks one
/// question: does this proof bind to this challenge hash.
pub trait NipstValidator: Send + Sync {
    fn validate(&self, nipst: &Nipst, challenge_hash: &Hash32) -> Result<(), InvalidProof>;
}

/// Accepts any proof whose embedded challenge matches the expected hash.
/// Stands in for the full prover stack, which is out of scope here.
pub struct ChallengeBoundValidator;

impl NipstValidator for ChallengeBoundValidator {
    fn validate(&self, nipst: &Nipst, challenge_hash: &Hash32) -> Result<(), InvalidProof> {
        if nipst.challenge != *challenge_hash {
            return Err(InvalidProof(
                "proof was generated for a different challenge".into(),
            ));
        }
        if nipst.proof.is_empty() {
            return Err(InvalidProof("empty proof".into()));
        }
        Ok(())
    }
}
