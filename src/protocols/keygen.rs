//! Key generation and key refresh, in the paper ECDSA Key-Generation (Fig. 6)
//! merged with the auxiliary info generation (Fig. 7).
//!
//! Messages are named after the round that receives them:
//! `Round1Prime` broadcasts a [`Round2Message`], and so on.

mod round1;
mod round2;
mod round3;
mod round4;
mod round5;

use alloc::collections::{BTreeMap, BTreeSet};
use core::marker::PhantomData;

use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRngCore, SeedableRng};
use serde::{Deserialize, Serialize};

pub use round1::{Round1, Round1Prime};
pub use round2::Round2;
pub use round3::Round3;
pub use round4::Round4;
pub use round5::Round5;

use super::errors::{KeygenError, ReceiveError, SamplingTarget, SessionError};
use crate::{
    curve::{Point, Scalar},
    entities::PreviousConfig,
    paillier::{PedersenParams, SecretKeyPaillier},
    params::SchemeParams,
    session::{PartyId, SessionInfo, Sid},
    tools::{
        hashing::{Commitment, Decommitment},
        protocol_shortcuts::SafeGet,
        sss::{Polynomial, PublicPolynomial, ShareId},
        Rid, Secret,
    },
    zk::{PrmProof, SchCommitment, SchProof},
};

/// The entry point of key generation (fresh mode) or key refresh (refresh mode).
#[derive(Debug)]
pub struct KeyGen<P: SchemeParams, Id: PartyId> {
    info: SessionInfo<Id>,
    previous: Option<PreviousConfig<Id>>,
    paillier_secret: SecretKeyPaillier<P>,
}

impl<P: SchemeParams, Id: PartyId> KeyGen<P, Id> {
    /// Prepares a run.
    ///
    /// With `previous == None` a new key is generated;
    /// otherwise the shares of the previous key are re-randomized, keeping the public key
    /// and the chain key.
    ///
    /// The Paillier key is always supplied by the caller since generating it is slow.
    pub fn new(
        info: SessionInfo<Id>,
        previous: Option<PreviousConfig<Id>>,
        paillier_secret: SecretKeyPaillier<P>,
    ) -> Result<Self, KeygenError<Id>> {
        if let Some(previous) = &previous {
            let previous_ids = previous.public_shares.keys().cloned().collect::<BTreeSet<_>>();
            if &previous_ids != info.ids() {
                return Err(SessionError::PreviousSharesMismatch.into());
            }
            if previous.public_shares.get(info.own_id()) != Some(&previous.secret.mul_by_generator()) {
                return Err(SessionError::PreviousSecretMismatch.into());
            }
        }

        Ok(Self {
            info,
            previous,
            paillier_secret,
        })
    }

    /// Samples the local polynomial and creates the first round.
    pub fn make_round(self, rng: &mut impl CryptoRngCore) -> Result<Round1Prime<P, Id>, KeygenError<Id>> {
        let share_ids = self.info.share_ids::<P>()?;
        let sid = Sid::new::<P, Id>(&self.info, self.previous.as_ref().map(|prev| &prev.public_shares));

        let mut rng = child_rng(rng, SamplingTarget::Polynomial)?;
        let constant = match &self.previous {
            // Refresh must not change the shared secret.
            Some(_) => Secret::init_with(|| Scalar::ZERO),
            None => Secret::init_with(|| Scalar::random_nonzero(&mut rng)),
        };
        let vss_secret = Polynomial::random(&mut rng, constant, self.info.threshold());

        tracing::debug!(
            own_id = ?self.info.own_id(),
            refresh = self.previous.is_some(),
            "Starting key generation"
        );

        let context = Context {
            info: self.info,
            sid,
            share_ids,
            refresh: self.previous.is_some(),
            phantom: PhantomData,
        };

        Ok(Round1Prime {
            round1: Round1 {
                context,
                vss_secret,
                previous: self.previous,
            },
            paillier_secret: self.paillier_secret,
        })
    }
}

/// Seeds a local RNG from `rng`; an entropy failure is reported as `KeygenError::Sampling(target)`.
pub(crate) fn child_rng<Id>(
    rng: &mut impl CryptoRngCore,
    target: SamplingTarget,
) -> Result<ChaCha20Rng, KeygenError<Id>> {
    let mut seed = <ChaCha20Rng as SeedableRng>::Seed::default();
    rng.try_fill_bytes(&mut seed)
        .map_err(|_| KeygenError::Sampling(target))?;
    Ok(ChaCha20Rng::from_seed(seed))
}

/// State shared by all the rounds of a run.
#[derive(Debug)]
pub(crate) struct Context<P: SchemeParams, Id: PartyId> {
    pub(crate) info: SessionInfo<Id>,
    pub(crate) sid: Sid,
    pub(crate) share_ids: BTreeMap<Id, ShareId>,
    pub(crate) refresh: bool,
    phantom: PhantomData<P>,
}

impl<P: SchemeParams, Id: PartyId> Context<P, Id> {
    pub fn own_id(&self) -> &Id {
        self.info.own_id()
    }

    pub fn own_share_id(&self) -> Result<&ShareId, KeygenError<Id>> {
        Ok(self.share_ids.safe_get("share IDs", self.own_id())?)
    }

    /// Rejects messages from unknown parties (or from self) and repeated messages.
    pub fn check_sender<V>(&self, from: &Id, received: &BTreeMap<Id, V>) -> Result<(), ReceiveError<Id>> {
        if from == self.own_id() || !self.info.ids().contains(from) {
            return Err(ReceiveError::UnknownSender(from.clone()));
        }
        if received.contains_key(from) {
            return Err(ReceiveError::Duplicate(from.clone()));
        }
        Ok(())
    }

    /// `true` if `received` has an entry for every party.
    pub fn is_complete<V>(&self, received: &BTreeMap<Id, V>) -> bool {
        received.len() == self.info.ids().len() && self.info.ids().iter().all(|id| received.contains_key(id))
    }
}

/// The values a party commits to in the first round and reveals in the second one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicReveal {
    pub(crate) rid: Rid,
    pub(crate) chain_key: Rid,
    pub(crate) polynomial: PublicPolynomial,
    pub(crate) schnorr_commitment: SchCommitment,
    pub(crate) elgamal: Point,
    pub(crate) pedersen: PedersenParams,
}

/// The commitment broadcast by [`Round1Prime`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round2Message {
    pub(crate) commitment: Commitment,
}

/// The opening of the commitment, broadcast by [`Round2`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round3Message {
    pub(crate) reveal: PublicReveal,
    pub(crate) decommitment: Decommitment,
}

/// The share of the sender's polynomial for the receiver, sent directly by [`Round3`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round4Message {
    pub(crate) share: Secret<Scalar>,
    pub(crate) prm_proof: PrmProof,
}

/// The proof of knowledge of the new key share, broadcast by [`Round4`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round5Message {
    pub(crate) proof: SchProof,
}

/// Any message of the protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyGenMessage {
    /// See [`Round2Message`].
    Round2(Round2Message),
    /// See [`Round3Message`].
    Round3(Round3Message),
    /// See [`Round4Message`].
    Round4(Round4Message),
    /// See [`Round5Message`].
    Round5(Round5Message),
}

impl KeyGenMessage {
    /// The number of the round this message is addressed to.
    pub fn round(&self) -> u8 {
        match self {
            Self::Round2(_) => 2,
            Self::Round3(_) => 3,
            Self::Round4(_) => 4,
            Self::Round5(_) => 5,
        }
    }
}
