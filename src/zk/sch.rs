//! Schnorr proof of knowledge ($\Pi^{sch}$, Section C.1, Fig. 22).
//!
//! Publish $X$ and prove that we know a secret $x$ such that $g^x = X$,
//! where $g$ is a EC generator.

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    curve::{Point, Scalar},
    params::SchemeParams,
    tools::{
        hashing::{Chain, Hashable, Hasher},
        Secret,
    },
};

const HASH_TAG: &[u8] = b"P_sch";

/// Secret data the proof is based on (~ signing key)
#[derive(Debug, Clone)]
pub(crate) struct SchSecret(
    /// `\alpha`
    Secret<Scalar>,
);

impl SchSecret {
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self(Secret::init_with(|| Scalar::random_nonzero(rng)))
    }
}

/// Public data for the proof (~ verifying key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchCommitment(Point);

impl SchCommitment {
    pub(crate) fn new(secret: &SchSecret) -> Self {
        Self(secret.0.mul_by_generator())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SchChallenge(Scalar);

impl SchChallenge {
    fn new<P: SchemeParams>(public: &Point, commitment: &SchCommitment, aux: &impl Hashable) -> Self {
        Self(
            Hasher::<P>::new_with_dst(HASH_TAG)
                .chain(aux)
                .chain(public)
                .chain(commitment)
                .finalize_to_scalar(),
        )
    }
}

/// Schnorr PoK of a secret scalar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchProof {
    challenge: SchChallenge,
    proof: Scalar,
}

impl SchProof {
    /// Create a proof that we know the `secret`.
    pub(crate) fn new<P: SchemeParams>(
        proof_secret: &SchSecret,
        secret: &Secret<Scalar>,
        commitment: &SchCommitment,
        public: &Point,
        aux: &impl Hashable,
    ) -> Self {
        let challenge = SchChallenge::new::<P>(public, commitment, aux);
        let proof = *(proof_secret.0.clone() + &(secret * &challenge.0)).expose_secret();
        Self { challenge, proof }
    }

    /// Verify that the proof is correct for a secret corresponding to the given `public`.
    pub(crate) fn verify<P: SchemeParams>(&self, commitment: &SchCommitment, public: &Point, aux: &impl Hashable) -> bool {
        let challenge = SchChallenge::new::<P>(public, commitment, aux);
        challenge == self.challenge && self.proof.mul_by_generator() == commitment.0 + *public * challenge.0
    }
}
