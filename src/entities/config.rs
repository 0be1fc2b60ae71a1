use alloc::collections::BTreeMap;

use derive_where::derive_where;
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::{
    curve::{Point, Scalar},
    paillier::{PedersenParams, PublicKeyPaillier, SecretKeyPaillier},
    params::SchemeParams,
    protocols::LocalError,
    session::PartyId,
    tools::{
        protocol_shortcuts::MapValues,
        sss::{shamir_join_points, ShareId},
        Rid, Secret,
    },
};

/// The public material of one party produced by a key generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAuxInfo {
    pub(crate) ecdsa: Point,
    pub(crate) elgamal: Point,
    pub(crate) paillier: PublicKeyPaillier,
    pub(crate) pedersen: PedersenParams,
}

impl PublicAuxInfo {
    /// The public key share.
    pub fn ecdsa(&self) -> &Point {
        &self.ecdsa
    }

    /// The ElGamal public key.
    pub fn elgamal(&self) -> &Point {
        &self.elgamal
    }

    /// The Paillier public key.
    pub fn paillier(&self) -> &PublicKeyPaillier {
        &self.paillier
    }

    /// The Pedersen commitment parameters.
    pub fn pedersen(&self) -> &PedersenParams {
        &self.pedersen
    }
}

/// The key material of a single party after a successful key generation or refresh.
#[derive(Serialize, Deserialize)]
#[derive_where(Clone, Debug)]
#[serde(bound = "")]
pub struct KeyConfig<P: SchemeParams, Id: PartyId> {
    pub(crate) owner: Id,
    pub(crate) threshold: usize,
    pub(crate) secret: Secret<Scalar>,
    pub(crate) elgamal_secret: Secret<Scalar>,
    pub(crate) paillier_secret: SecretKeyPaillier<P>,
    pub(crate) rid: Rid,
    pub(crate) chain_key: Rid,
    pub(crate) public: BTreeMap<Id, PublicAuxInfo>,
}

impl<P: SchemeParams, Id: PartyId> KeyConfig<P, Id> {
    /// The party this configuration belongs to.
    pub fn owner(&self) -> &Id {
        &self.owner
    }

    /// The degree of the sharing polynomial; `threshold + 1` parties can use the key.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The combined session RID.
    pub fn rid(&self) -> &Rid {
        &self.rid
    }

    /// The chain key (stable across refreshes).
    pub fn chain_key(&self) -> &Rid {
        &self.chain_key
    }

    /// The public material of all parties.
    pub fn public(&self) -> &BTreeMap<Id, PublicAuxInfo> {
        &self.public
    }

    /// The public key shares of all parties.
    pub fn public_shares(&self) -> BTreeMap<Id, Point> {
        self.public.map_values_ref(|info| info.ecdsa)
    }

    /// The evaluation point of the given party.
    pub fn share_id(&self, id: &Id) -> ShareId {
        ShareId::from_party_id::<P>(id)
    }

    /// The group public key, interpolated from any `threshold + 1` public shares.
    pub fn public_key(&self) -> Result<Point, LocalError> {
        let shares = self
            .public
            .iter()
            .take(self.threshold + 1)
            .map(|(id, info)| (self.share_id(id), info.ecdsa))
            .collect::<BTreeMap<_, _>>();
        if shares.len() != self.threshold + 1 {
            return Err(LocalError::new("Not enough public shares to interpolate the key"));
        }
        shamir_join_points(&shares)
    }

    /// The group public key as an ECDSA verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, LocalError> {
        self.public_key()?
            .to_verifying_key()
            .ok_or_else(|| LocalError::new("The public key is the point at infinity"))
    }

    /// The Paillier public key of this party.
    pub fn paillier_public(&self) -> PublicKeyPaillier {
        self.paillier_secret.public_key()
    }

    /// Extracts what a refresh of this key needs.
    pub fn to_previous(&self) -> PreviousConfig<Id> {
        PreviousConfig {
            secret: self.secret.clone(),
            public_shares: self.public_shares(),
            chain_key: self.chain_key,
        }
    }

    #[cfg(test)]
    pub(crate) fn secret_share(&self) -> &Secret<Scalar> {
        &self.secret
    }
}

/// Key material carried into a refresh.
#[derive(Serialize, Deserialize)]
#[derive_where(Clone, Debug)]
#[serde(bound = "")]
pub struct PreviousConfig<Id: PartyId> {
    pub(crate) secret: Secret<Scalar>,
    pub(crate) public_shares: BTreeMap<Id, Point>,
    pub(crate) chain_key: Rid,
}

impl<Id: PartyId> PreviousConfig<Id> {
    /// Creates a refresh input from a secret share, the public shares of all parties,
    /// and the chain key.
    pub fn new(secret_share: Scalar, public_shares: BTreeMap<Id, Point>, chain_key: Rid) -> Self {
        Self {
            secret: Secret::init_with(|| secret_share),
            public_shares,
            chain_key,
        }
    }

    /// The public key shares of all parties.
    pub fn public_shares(&self) -> &BTreeMap<Id, Point> {
        &self.public_shares
    }

    /// The chain key.
    pub fn chain_key(&self) -> &Rid {
        &self.chain_key
    }
}
