use alloc::collections::BTreeMap;

use rand_core::CryptoRngCore;

use super::{child_rng, Context, Round3Message, Round4, Round4Message};
use crate::{
    curve::{Point, Scalar},
    entities::PreviousConfig,
    paillier::{PedersenParams, PedersenSecret, PublicKeyPaillier, SecretKeyPaillier},
    params::SchemeParams,
    protocols::errors::{KeygenError, LocalError, ReceiveError, RemoteError, SamplingTarget},
    session::PartyId,
    tools::{
        hashing::Commitment,
        protocol_shortcuts::SafeGet,
        sss::{Polynomial, PublicPolynomial},
        Rid, Secret,
    },
    zk::{PrmProof, SchCommitment, SchSecret},
};

/// Verifies the openings of the commitments received in [`Round2`](`super::Round2`).
#[derive(Debug)]
pub struct Round3<P: SchemeParams, Id: PartyId> {
    pub(crate) context: Context<P, Id>,
    pub(crate) vss_secret: Polynomial,
    pub(crate) previous: Option<PreviousConfig<Id>>,

    pub(crate) vss_polynomials: BTreeMap<Id, PublicPolynomial>,
    pub(crate) commitments: BTreeMap<Id, Commitment>,
    pub(crate) rids: BTreeMap<Id, Rid>,
    pub(crate) chain_keys: BTreeMap<Id, Rid>,
    pub(crate) shares_received: BTreeMap<Id, Secret<Scalar>>,
    pub(crate) elgamal_publics: BTreeMap<Id, Point>,
    pub(crate) paillier_publics: BTreeMap<Id, PublicKeyPaillier>,
    pub(crate) pedersen_publics: BTreeMap<Id, PedersenParams>,
    pub(crate) schnorr_commitments: BTreeMap<Id, SchCommitment>,

    pub(crate) elgamal_secret: Secret<Scalar>,
    pub(crate) paillier_secret: SecretKeyPaillier<P>,
    pub(crate) pedersen_secret: PedersenSecret,
    pub(crate) schnorr_secret: SchSecret,
}

impl<P: SchemeParams, Id: PartyId> Round3<P, Id> {
    fn verify_message(&self, from: &Id, message: &Round3Message) -> Result<(), RemoteError> {
        let reveal = &message.reveal;

        let commitment = self.commitments.get(from).ok_or(RemoteError::CommitmentMismatch)?;
        if !self
            .context
            .sid
            .hash_for_id::<P, Id>(from)
            .verify_commitment(commitment, &message.decommitment, reveal)
        {
            return Err(RemoteError::CommitmentMismatch);
        }

        let threshold = self.context.info.threshold();
        if reveal.polynomial.degree() != Some(threshold) {
            return Err(RemoteError::InvalidPolynomialDegree {
                expected: threshold,
                actual: reveal.polynomial.degree(),
            });
        }

        // A refresh polynomial shares zero; a fresh one must contribute to the key.
        let coeff0_is_identity = reveal.polynomial.coeff0().is_identity();
        if coeff0_is_identity != self.context.refresh {
            return Err(RemoteError::InvalidConstantTerm);
        }

        if let Some(previous) = &self.previous {
            if reveal.chain_key != previous.chain_key {
                return Err(RemoteError::ChainKeyMismatch);
            }
        }

        reveal
            .pedersen
            .validate::<P>()
            .map_err(RemoteError::InvalidPedersenParams)?;

        Ok(())
    }

    /// Checks the opening of another party's commitment and records the revealed values.
    pub fn receive_message(&mut self, from: &Id, message: Round3Message) -> Result<(), ReceiveError<Id>> {
        self.context.check_sender(from, &self.rids)?;
        if let Err(error) = self.verify_message(from, &message) {
            tracing::warn!(own_id = ?self.context.own_id(), from = ?from, %error, "Round 3: invalid decommitment");
            return Err(ReceiveError::Remote {
                party: from.clone(),
                error,
            });
        }
        tracing::trace!(own_id = ?self.context.own_id(), from = ?from, "Round 3: received a decommitment");

        let reveal = message.reveal;
        let paillier_public = PublicKeyPaillier::from_pedersen(&reveal.pedersen);
        let from = from.clone();
        self.vss_polynomials.insert(from.clone(), reveal.polynomial);
        self.rids.insert(from.clone(), reveal.rid);
        self.chain_keys.insert(from.clone(), reveal.chain_key);
        self.elgamal_publics.insert(from.clone(), reveal.elgamal);
        self.paillier_publics.insert(from.clone(), paillier_public);
        self.pedersen_publics.insert(from.clone(), reveal.pedersen);
        self.schnorr_commitments.insert(from, reveal.schnorr_commitment);
        Ok(())
    }

    /// `true` if the commitments of all the parties have been opened.
    pub fn can_finalize(&self) -> bool {
        self.context.is_complete(&self.rids)
    }

    /// Combines the RIDs and the chain keys, proves the validity of the own Pedersen parameters,
    /// and evaluates the local polynomial for every other party.
    ///
    /// The returned messages must be sent over a confidential channel.
    pub fn finalize(
        self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Round4<P, Id>, BTreeMap<Id, Round4Message>), KeygenError<Id>> {
        if !self.can_finalize() {
            return Err(LocalError::new("Round 3: not all decommitments have been received").into());
        }
        let own_id = self.context.own_id().clone();

        let rid = self.rids.values().sum::<Rid>();
        let chain_key = match &self.previous {
            Some(previous) => previous.chain_key,
            None => self.chain_keys.values().sum::<Rid>(),
        };

        let own_pedersen = self.pedersen_publics.safe_get("Pedersen parameters", &own_id)?;
        let aux = (&self.context.sid, &own_id, &rid);
        let mut prm_rng = child_rng(rng, SamplingTarget::PrmProof)?;
        let prm_proof = PrmProof::new::<P>(&mut prm_rng, &self.pedersen_secret, own_pedersen, &aux)?;

        let messages = self
            .context
            .info
            .other_ids()
            .map(|id| {
                let share_id = self.context.share_ids.safe_get("share IDs", id)?;
                let message = Round4Message {
                    share: self.vss_secret.evaluate(share_id),
                    prm_proof: prm_proof.clone(),
                };
                Ok((id.clone(), message))
            })
            .collect::<Result<BTreeMap<_, _>, LocalError>>()?;

        tracing::debug!(own_id = ?own_id, "Round 3: sending the shares");

        // The polynomial and the Pedersen witness are dropped here.
        let round4 = Round4 {
            context: self.context,
            previous: self.previous,
            rid,
            chain_key,
            vss_polynomials: self.vss_polynomials,
            shares_received: self.shares_received,
            elgamal_publics: self.elgamal_publics,
            paillier_publics: self.paillier_publics,
            pedersen_publics: self.pedersen_publics,
            schnorr_commitments: self.schnorr_commitments,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            schnorr_secret: self.schnorr_secret,
        };

        Ok((round4, messages))
    }
}
