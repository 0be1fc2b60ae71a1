use alloc::collections::BTreeMap;

use rand_core::CryptoRngCore;

use super::{child_rng, Context, PublicReveal, Round2, Round2Message};
use crate::{
    curve::Scalar,
    entities::PreviousConfig,
    paillier::SecretKeyPaillier,
    params::SchemeParams,
    protocols::errors::{KeygenError, SamplingTarget},
    session::PartyId,
    tools::{
        executor::{Executor, Sequential},
        hashing::CommitmentError,
        sss::Polynomial,
        Rid, Secret,
    },
    zk::{SchCommitment, SchSecret},
};

/// The local state before any sampling: the session, the local polynomial,
/// and (in refresh mode) the previous key material.
#[derive(Debug)]
pub struct Round1<P: SchemeParams, Id: PartyId> {
    pub(crate) context: Context<P, Id>,
    pub(crate) vss_secret: Polynomial,
    pub(crate) previous: Option<PreviousConfig<Id>>,
}

/// [`Round1`] together with the locally held Paillier secret key.
#[derive(Debug)]
pub struct Round1Prime<P: SchemeParams, Id: PartyId> {
    pub(crate) round1: Round1<P, Id>,
    pub(crate) paillier_secret: SecretKeyPaillier<P>,
}

fn commitment_error<Id>(error: CommitmentError) -> KeygenError<Id> {
    match error {
        CommitmentError::Sampling => KeygenError::Sampling(SamplingTarget::Decommitment),
        CommitmentError::Serialization => KeygenError::Commitment,
    }
}

impl<P: SchemeParams, Id: PartyId> Round1Prime<P, Id> {
    /// Samples all the local values, commits to them, and returns the commitment to be broadcast.
    pub fn finalize(self, rng: &mut impl CryptoRngCore) -> Result<(Round2<P, Id>, Round2Message), KeygenError<Id>> {
        self.finalize_with(rng, &Sequential)
    }

    /// Same as [`Round1Prime::finalize`], with the independent computations scheduled by `executor`.
    ///
    /// The result is the same for any executor given the same `rng` state.
    pub fn finalize_with<E: Executor>(
        self,
        rng: &mut impl CryptoRngCore,
        executor: &E,
    ) -> Result<(Round2<P, Id>, Round2Message), KeygenError<Id>> {
        let Self {
            round1: Round1 {
                context,
                vss_secret,
                previous,
            },
            paillier_secret,
        } = self;

        let own_id = context.own_id().clone();
        let own_share_id = *context.own_share_id()?;

        // Seeded before any work is scheduled, so the execution order does not matter.
        let mut pedersen_rng = child_rng(rng, SamplingTarget::RngSeed)?;
        let mut elgamal_rng = child_rng(rng, SamplingTarget::RngSeed)?;
        let mut schnorr_rng = child_rng(rng, SamplingTarget::RngSeed)?;

        let (pedersen, (elgamal_secret, (self_share, polynomial, schnorr_secret))) = executor.join(
            || paillier_secret.generate_pedersen(&mut pedersen_rng),
            || {
                executor.join(
                    || Secret::init_with(|| Scalar::random_nonzero(&mut elgamal_rng)),
                    || {
                        (
                            vss_secret.evaluate(&own_share_id),
                            vss_secret.public(),
                            SchSecret::random(&mut schnorr_rng),
                        )
                    },
                )
            },
        );
        let (pedersen_params, pedersen_secret) = pedersen?;
        let elgamal_public = elgamal_secret.mul_by_generator();
        let schnorr_commitment = SchCommitment::new(&schnorr_secret);

        let rid = Rid::try_random(rng).map_err(|_| KeygenError::Sampling(SamplingTarget::Rid))?;
        let chain_key = match &previous {
            Some(previous) => previous.chain_key,
            None => Rid::try_random(rng).map_err(|_| KeygenError::Sampling(SamplingTarget::ChainKey))?,
        };

        let reveal = PublicReveal {
            rid,
            chain_key,
            polynomial,
            schnorr_commitment,
            elgamal: elgamal_public,
            pedersen: pedersen_params,
        };
        let (commitment, decommitment) = context
            .sid
            .hash_for_id::<P, Id>(&own_id)
            .commit(rng, &reveal)
            .map_err(commitment_error)?;

        tracing::debug!(own_id = ?own_id, "Round 1: broadcasting the commitment");

        let round2 = Round2 {
            vss_polynomials: BTreeMap::from([(own_id.clone(), reveal.polynomial)]),
            commitments: BTreeMap::from([(own_id.clone(), commitment.clone())]),
            rids: BTreeMap::from([(own_id.clone(), reveal.rid)]),
            chain_keys: BTreeMap::from([(own_id.clone(), reveal.chain_key)]),
            shares_received: BTreeMap::from([(own_id.clone(), self_share)]),
            elgamal_publics: BTreeMap::from([(own_id.clone(), reveal.elgamal)]),
            paillier_publics: BTreeMap::from([(own_id.clone(), paillier_secret.public_key())]),
            pedersen_publics: BTreeMap::from([(own_id.clone(), reveal.pedersen)]),
            schnorr_commitments: BTreeMap::from([(own_id, reveal.schnorr_commitment)]),
            context,
            vss_secret,
            previous,
            elgamal_secret,
            paillier_secret,
            pedersen_secret,
            schnorr_secret,
            decommitment,
        };

        Ok((round2, Round2Message { commitment }))
    }
}
