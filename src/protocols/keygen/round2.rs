use alloc::collections::BTreeMap;

use super::{Context, PublicReveal, Round2Message, Round3, Round3Message};
use crate::{
    curve::{Point, Scalar},
    entities::PreviousConfig,
    paillier::{PedersenParams, PedersenSecret, PublicKeyPaillier, SecretKeyPaillier},
    params::SchemeParams,
    protocols::errors::{KeygenError, LocalError, ReceiveError},
    session::PartyId,
    tools::{
        hashing::{Commitment, Decommitment},
        protocol_shortcuts::SafeGet,
        sss::{Polynomial, PublicPolynomial},
        Rid, Secret,
    },
    zk::{SchCommitment, SchSecret},
};

/// Collects the commitments of all the parties.
///
/// Every per-party map starts out with this node's own entry only;
/// the rest of [`Round2::commitments`] is filled by [`Round2::receive_message`],
/// and the other maps are filled in [`Round3`] when the commitments are opened.
#[derive(Debug)]
pub struct Round2<P: SchemeParams, Id: PartyId> {
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
    pub(crate) decommitment: Decommitment,
}

impl<P: SchemeParams, Id: PartyId> Round2<P, Id> {
    /// Records the commitment of another party.
    pub fn receive_message(&mut self, from: &Id, message: Round2Message) -> Result<(), ReceiveError<Id>> {
        self.context.check_sender(from, &self.commitments)?;
        tracing::trace!(own_id = ?self.context.own_id(), from = ?from, "Round 2: received a commitment");
        self.commitments.insert(from.clone(), message.commitment);
        Ok(())
    }

    /// `true` if the commitments of all the parties have been received.
    pub fn can_finalize(&self) -> bool {
        self.context.is_complete(&self.commitments)
    }

    /// Opens this node's commitment to everyone.
    pub fn finalize(self) -> Result<(Round3<P, Id>, Round3Message), KeygenError<Id>> {
        if !self.can_finalize() {
            return Err(LocalError::new("Round 2: not all commitments have been received").into());
        }
        let own_id = self.context.own_id().clone();

        let reveal = PublicReveal {
            rid: *self.rids.safe_get("RIDs", &own_id)?,
            chain_key: *self.chain_keys.safe_get("chain keys", &own_id)?,
            polynomial: self.vss_polynomials.safe_get("polynomials", &own_id)?.clone(),
            schnorr_commitment: *self.schnorr_commitments.safe_get("Schnorr commitments", &own_id)?,
            elgamal: *self.elgamal_publics.safe_get("ElGamal keys", &own_id)?,
            pedersen: self.pedersen_publics.safe_get("Pedersen parameters", &own_id)?.clone(),
        };

        tracing::debug!(own_id = ?own_id, "Round 2: broadcasting the decommitment");

        // The decommitment leaves the local state here.
        let message = Round3Message {
            reveal,
            decommitment: self.decommitment,
        };

        let round3 = Round3 {
            context: self.context,
            vss_secret: self.vss_secret,
            previous: self.previous,
            vss_polynomials: self.vss_polynomials,
            commitments: self.commitments,
            rids: self.rids,
            chain_keys: self.chain_keys,
            shares_received: self.shares_received,
            elgamal_publics: self.elgamal_publics,
            paillier_publics: self.paillier_publics,
            pedersen_publics: self.pedersen_publics,
            schnorr_commitments: self.schnorr_commitments,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            pedersen_secret: self.pedersen_secret,
            schnorr_secret: self.schnorr_secret,
        };

        Ok((round3, message))
    }
}
