//! Pedersen Parameters ZK ($\Pi^{prm}$, Section 5.3, Fig. 13).
//!
//! Publish $(N, s, t)$ and prove that we know a secret $\lambda$ such that
//! $s = t^\lambda \mod N$.

use alloc::{vec, vec::Vec};

use crypto_bigint::{modular::MontyForm, RandomMod};
use digest::XofReader;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    paillier::{PaillierUint, PedersenParams, PedersenSecret},
    params::SchemeParams,
    protocols::LocalError,
    tools::{
        hashing::{Chain, Hashable, Hasher},
        Secret,
    },
};

const HASH_TAG: &[u8] = b"P_prm";

/// Secret data the proof is based on ($a_i$).
struct PrmSecret(Vec<Secret<PaillierUint>>);

impl PrmSecret {
    fn random<P: SchemeParams>(rng: &mut impl CryptoRngCore, secret: &PedersenSecret) -> Self {
        let totient = secret.totient().expose_secret();
        Self(
            (0..P::SECURITY_BITS)
                .map(|_| Secret::init_with(|| PaillierUint::random_mod(rng, totient)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PrmCommitment(Vec<PaillierUint>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PrmChallenge(Vec<bool>);

impl PrmChallenge {
    fn new<P: SchemeParams>(commitment: &PrmCommitment, setup: &PedersenParams, aux: &impl Hashable) -> Self {
        let mut reader = Hasher::<P>::new_with_dst(HASH_TAG)
            .chain(commitment)
            .chain(setup)
            .chain(aux)
            .finalize_to_reader();
        let mut bytes = vec![0u8; P::SECURITY_BITS.div_ceil(8)];
        reader.read(&mut bytes);
        let bits = bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |i| byte & (1 << i) != 0))
            .take(P::SECURITY_BITS)
            .collect();
        Self(bits)
    }
}

/// Pedersen Parameters ZK proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrmProof {
    commitment: PrmCommitment,
    challenge: PrmChallenge,
    proof: Vec<PaillierUint>,
}

impl PrmProof {
    /// Create a proof that we know the `secret`
    /// (i.e. lambda, the power that was used to create the Pedersen parameters).
    pub(crate) fn new<P: SchemeParams>(
        rng: &mut impl CryptoRngCore,
        secret: &PedersenSecret,
        setup: &PedersenParams,
        aux: &impl Hashable,
    ) -> Result<Self, LocalError> {
        let monty_params = setup
            .monty_params()
            .ok_or_else(|| LocalError::new("Invalid own Pedersen parameters"))?;
        let base = MontyForm::new(setup.t(), monty_params);

        let proof_secret = PrmSecret::random::<P>(rng, secret);
        let commitment = PrmCommitment(
            proof_secret
                .0
                .iter()
                .map(|a| base.pow_bounded_exp(a.expose_secret(), P::PAILLIER_MODULUS_BITS).retrieve())
                .collect(),
        );

        let totient = secret.totient().expose_secret();
        let challenge = PrmChallenge::new::<P>(&commitment, setup, aux);
        let proof = proof_secret
            .0
            .iter()
            .zip(challenge.0.iter())
            .map(|(a, e)| {
                // `a` and `lambda` are smaller than the totient by construction
                if *e {
                    a.expose_secret()
                        .add_mod(secret.lambda().expose_secret(), totient.as_ref())
                } else {
                    *a.expose_secret()
                }
            })
            .collect();

        Ok(Self {
            commitment,
            challenge,
            proof,
        })
    }

    /// Verify that the proof is correct for a secret corresponding to the given Pedersen parameters.
    pub(crate) fn verify<P: SchemeParams>(&self, setup: &PedersenParams, aux: &impl Hashable) -> bool {
        let Some(monty_params) = setup.monty_params() else {
            return false;
        };

        let challenge = PrmChallenge::new::<P>(&self.commitment, setup, aux);
        if challenge != self.challenge
            || self.proof.len() != P::SECURITY_BITS
            || self.commitment.0.len() != P::SECURITY_BITS
        {
            return false;
        }

        let base = MontyForm::new(setup.t(), monty_params);
        let value = MontyForm::new(setup.s(), monty_params);

        for ((e, z), a) in challenge.0.iter().zip(self.proof.iter()).zip(self.commitment.0.iter()) {
            let a = MontyForm::new(a, monty_params);
            let pwr = base.pow_bounded_exp(z, P::PAILLIER_MODULUS_BITS);
            let expected = if *e { a * value } else { a };
            let test = pwr.retrieve() == expected.retrieve();
            if !test {
                return false;
            }
        }
        true
    }
}
