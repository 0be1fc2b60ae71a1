use alloc::collections::BTreeMap;

use super::{Context, Round5Message};
use crate::{
    curve::{Point, Scalar},
    entities::{KeyConfig, PublicAuxInfo},
    paillier::{PedersenParams, PublicKeyPaillier, SecretKeyPaillier},
    params::SchemeParams,
    protocols::errors::{KeygenError, LocalError, ReceiveError, RemoteError},
    session::PartyId,
    tools::{protocol_shortcuts::SafeGet, Rid, Secret},
    zk::{SchCommitment, SchProof},
};

/// Verifies the proofs of knowledge of the new key shares and assembles the result.
#[derive(Debug)]
pub struct Round5<P: SchemeParams, Id: PartyId> {
    pub(crate) context: Context<P, Id>,
    pub(crate) rid: Rid,
    pub(crate) chain_key: Rid,
    pub(crate) secret: Secret<Scalar>,

    pub(crate) public_shares: BTreeMap<Id, Point>,
    pub(crate) elgamal_publics: BTreeMap<Id, Point>,
    pub(crate) paillier_publics: BTreeMap<Id, PublicKeyPaillier>,
    pub(crate) pedersen_publics: BTreeMap<Id, PedersenParams>,
    pub(crate) schnorr_commitments: BTreeMap<Id, SchCommitment>,
    pub(crate) proofs_received: BTreeMap<Id, SchProof>,

    pub(crate) elgamal_secret: Secret<Scalar>,
    pub(crate) paillier_secret: SecretKeyPaillier<P>,
}

impl<P: SchemeParams, Id: PartyId> Round5<P, Id> {
    fn verify_message(&self, from: &Id, message: &Round5Message) -> Result<(), RemoteError> {
        let commitment = self
            .schnorr_commitments
            .get(from)
            .ok_or(RemoteError::InvalidSchnorrProof)?;
        let public_share = self.public_shares.get(from).ok_or(RemoteError::InvalidSchnorrProof)?;
        let aux = (&self.context.sid, from, &self.rid);
        if !message.proof.verify::<P>(commitment, public_share, &aux) {
            return Err(RemoteError::InvalidSchnorrProof);
        }
        Ok(())
    }

    /// Checks another party's proof of knowledge of its new key share.
    pub fn receive_message(&mut self, from: &Id, message: Round5Message) -> Result<(), ReceiveError<Id>> {
        self.context.check_sender(from, &self.proofs_received)?;
        if let Err(error) = self.verify_message(from, &message) {
            tracing::warn!(own_id = ?self.context.own_id(), from = ?from, %error, "Round 5: invalid proof");
            return Err(ReceiveError::Remote {
                party: from.clone(),
                error,
            });
        }
        tracing::trace!(own_id = ?self.context.own_id(), from = ?from, "Round 5: received a proof");
        self.proofs_received.insert(from.clone(), message.proof);
        Ok(())
    }

    /// `true` if the proofs from all the parties have been received.
    pub fn can_finalize(&self) -> bool {
        self.context.is_complete(&self.proofs_received)
    }

    /// Produces the key configuration of this node.
    pub fn finalize(self) -> Result<KeyConfig<P, Id>, KeygenError<Id>> {
        if !self.can_finalize() {
            return Err(LocalError::new("Round 5: not all proofs have been received").into());
        }

        let public = self
            .context
            .info
            .ids()
            .iter()
            .map(|id| {
                let info = PublicAuxInfo {
                    ecdsa: *self.public_shares.safe_get("public shares", id)?,
                    elgamal: *self.elgamal_publics.safe_get("ElGamal keys", id)?,
                    paillier: *self.paillier_publics.safe_get("Paillier keys", id)?,
                    pedersen: self.pedersen_publics.safe_get("Pedersen parameters", id)?.clone(),
                };
                Ok((id.clone(), info))
            })
            .collect::<Result<BTreeMap<_, _>, LocalError>>()?;

        tracing::debug!(own_id = ?self.context.own_id(), "Round 5: key generation finished");

        Ok(KeyConfig {
            owner: self.context.own_id().clone(),
            threshold: self.context.info.threshold(),
            secret: self.secret,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            rid: self.rid,
            chain_key: self.chain_key,
            public,
        })
    }
}
