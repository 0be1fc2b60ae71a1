use alloc::collections::BTreeMap;

use super::{Context, Round4Message, Round5, Round5Message};
use crate::{
    curve::{Point, Scalar},
    entities::PreviousConfig,
    paillier::{PedersenParams, PublicKeyPaillier, SecretKeyPaillier},
    params::SchemeParams,
    protocols::errors::{KeygenError, LocalError, ReceiveError, RemoteError},
    session::PartyId,
    tools::{protocol_shortcuts::SafeGet, sss::PublicPolynomial, Rid, Secret},
    zk::{SchCommitment, SchProof, SchSecret},
};

/// Verifies the shares received from the other parties.
#[derive(Debug)]
pub struct Round4<P: SchemeParams, Id: PartyId> {
    pub(crate) context: Context<P, Id>,
    pub(crate) previous: Option<PreviousConfig<Id>>,
    pub(crate) rid: Rid,
    pub(crate) chain_key: Rid,

    pub(crate) vss_polynomials: BTreeMap<Id, PublicPolynomial>,
    pub(crate) shares_received: BTreeMap<Id, Secret<Scalar>>,
    pub(crate) elgamal_publics: BTreeMap<Id, Point>,
    pub(crate) paillier_publics: BTreeMap<Id, PublicKeyPaillier>,
    pub(crate) pedersen_publics: BTreeMap<Id, PedersenParams>,
    pub(crate) schnorr_commitments: BTreeMap<Id, SchCommitment>,

    pub(crate) elgamal_secret: Secret<Scalar>,
    pub(crate) paillier_secret: SecretKeyPaillier<P>,
    pub(crate) schnorr_secret: SchSecret,
}

impl<P: SchemeParams, Id: PartyId> Round4<P, Id> {
    fn verify_message(&self, from: &Id, message: &Round4Message) -> Result<(), RemoteError> {
        let pedersen = self
            .pedersen_publics
            .get(from)
            .ok_or(RemoteError::InvalidPrmProof)?;
        let aux = (&self.context.sid, from, &self.rid);
        if !message.prm_proof.verify::<P>(pedersen, &aux) {
            return Err(RemoteError::InvalidPrmProof);
        }

        let polynomial = self.vss_polynomials.get(from).ok_or(RemoteError::InvalidShare)?;
        let own_share_id = self
            .context
            .share_ids
            .get(self.context.own_id())
            .ok_or(RemoteError::InvalidShare)?;
        if message.share.mul_by_generator() != polynomial.evaluate(own_share_id) {
            return Err(RemoteError::InvalidShare);
        }

        Ok(())
    }

    /// Checks a share against the sender's public polynomial and records it.
    pub fn receive_message(&mut self, from: &Id, message: Round4Message) -> Result<(), ReceiveError<Id>> {
        self.context.check_sender(from, &self.shares_received)?;
        if let Err(error) = self.verify_message(from, &message) {
            tracing::warn!(own_id = ?self.context.own_id(), from = ?from, %error, "Round 4: invalid share");
            return Err(ReceiveError::Remote {
                party: from.clone(),
                error,
            });
        }
        tracing::trace!(own_id = ?self.context.own_id(), from = ?from, "Round 4: received a share");
        self.shares_received.insert(from.clone(), message.share);
        Ok(())
    }

    /// `true` if the shares from all the parties have been received.
    pub fn can_finalize(&self) -> bool {
        self.context.is_complete(&self.shares_received)
    }

    /// Computes the new key share and all the public shares,
    /// and proves the knowledge of the new key share.
    pub fn finalize(self) -> Result<(Round5<P, Id>, Round5Message), KeygenError<Id>> {
        if !self.can_finalize() {
            return Err(LocalError::new("Round 4: not all shares have been received").into());
        }
        let own_id = self.context.own_id().clone();

        let mut secret: Secret<Scalar> = self.shares_received.values().sum();
        if let Some(previous) = &self.previous {
            secret = secret + &previous.secret;
        }

        let public_shares = self
            .context
            .share_ids
            .iter()
            .map(|(id, share_id)| {
                let mut public_share = self
                    .vss_polynomials
                    .values()
                    .map(|polynomial| polynomial.evaluate(share_id))
                    .sum::<Point>();
                if let Some(previous) = &self.previous {
                    public_share = public_share + *previous.public_shares.safe_get("previous public shares", id)?;
                }
                Ok((id.clone(), public_share))
            })
            .collect::<Result<BTreeMap<_, _>, LocalError>>()?;

        if self.previous.is_none() {
            let public_key = self
                .vss_polynomials
                .values()
                .map(|polynomial| polynomial.coeff0())
                .sum::<Point>();
            if public_key.is_identity() {
                return Err(LocalError::new("Round 4: the combined public key is the point at infinity").into());
            }
        }

        let own_public_share = public_shares.safe_get("public shares", &own_id)?;
        if &secret.mul_by_generator() != own_public_share {
            return Err(LocalError::new("Round 4: the new key share does not match the public share").into());
        }

        let own_schnorr_commitment = self.schnorr_commitments.safe_get("Schnorr commitments", &own_id)?;
        let aux = (&self.context.sid, &own_id, &self.rid);
        let proof = SchProof::new::<P>(
            &self.schnorr_secret,
            &secret,
            own_schnorr_commitment,
            own_public_share,
            &aux,
        );

        tracing::debug!(own_id = ?own_id, "Round 4: broadcasting the proof of the key share");

        // The previous key share and the Schnorr randomness are dropped here.
        let round5 = Round5 {
            context: self.context,
            rid: self.rid,
            chain_key: self.chain_key,
            secret,
            public_shares,
            elgamal_publics: self.elgamal_publics,
            paillier_publics: self.paillier_publics,
            pedersen_publics: self.pedersen_publics,
            schnorr_commitments: self.schnorr_commitments,
            proofs_received: BTreeMap::from([(own_id, proof)]),
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
        };

        Ok((round5, Round5Message { proof }))
    }
}
