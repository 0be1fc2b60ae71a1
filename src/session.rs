//! Per-run session parameters and the session identifier.

use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
};
use core::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::{
    curve::{Point, CURVE_NAME},
    params::SchemeParams,
    protocols::SessionError,
    tools::{
        hashing::{Chain, HashOutput, Hasher},
        sss::ShareId,
    },
};

/// The requirements for a party identifier.
pub trait PartyId: 'static + Debug + Clone + Ord + Send + Sync + Serialize + for<'de> Deserialize<'de> {}

impl<T> PartyId for T where T: 'static + Debug + Clone + Ord + Send + Sync + Serialize + for<'de> Deserialize<'de> {}

/// Immutable parameters of a single protocol run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo<Id> {
    own_id: Id,
    ids: BTreeSet<Id>,
    threshold: usize,
    session_id: Option<Box<[u8]>>,
}

impl<Id: PartyId> SessionInfo<Id> {
    /// Creates the session parameters.
    ///
    /// `threshold` is the degree of the sharing polynomial: any `threshold + 1` parties
    /// can use the resulting key, and it must be smaller than the number of parties.
    pub fn new(own_id: Id, ids: BTreeSet<Id>, threshold: usize) -> Result<Self, SessionError> {
        if ids.is_empty() {
            return Err(SessionError::EmptyPartySet);
        }
        if !ids.contains(&own_id) {
            return Err(SessionError::NotAParticipant);
        }
        if threshold >= ids.len() {
            return Err(SessionError::InvalidThreshold {
                threshold,
                parties: ids.len(),
            });
        }
        Ok(Self {
            own_id,
            ids,
            threshold,
            session_id: None,
        })
    }

    /// Mixes caller-provided bytes into the session identifier.
    ///
    /// Should be unique for every run with the same set of parties.
    pub fn with_session_id(self, session_id: &[u8]) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..self
        }
    }

    /// This node's ID.
    pub fn own_id(&self) -> &Id {
        &self.own_id
    }

    /// All the parties, including this node.
    pub fn ids(&self) -> &BTreeSet<Id> {
        &self.ids
    }

    /// All the parties except this node.
    pub fn other_ids(&self) -> impl Iterator<Item = &Id> {
        self.ids.iter().filter(move |id| *id != &self.own_id)
    }

    /// The degree of the sharing polynomial.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Maps every party to its evaluation point, rejecting zero and colliding points.
    pub(crate) fn share_ids<P: SchemeParams>(&self) -> Result<BTreeMap<Id, ShareId>, SessionError> {
        let share_ids = self
            .ids
            .iter()
            .map(|id| (id.clone(), ShareId::from_party_id::<P>(id)))
            .collect::<BTreeMap<_, _>>();
        let distinct = share_ids.values().collect::<BTreeSet<_>>();
        if distinct.len() != share_ids.len() || distinct.iter().any(|share_id| share_id.is_zero()) {
            return Err(SessionError::InvalidShareIds);
        }
        Ok(share_ids)
    }
}

/// The hash of everything the parties must agree upon before the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Sid(HashOutput);

impl Sid {
    pub fn new<P: SchemeParams, Id: PartyId>(
        info: &SessionInfo<Id>,
        previous_public: Option<&BTreeMap<Id, Point>>,
    ) -> Self {
        Self(
            Hasher::<P>::new_with_dst(b"KeyGen SID")
                .chain_bytes(CURVE_NAME)
                .chain(&Point::GENERATOR)
                .chain(&info.ids)
                .chain(&(info.threshold as u64))
                .chain(&info.session_id)
                .chain(&previous_public)
                .finalize(),
        )
    }

    /// A hasher scoped to this session and to the given sender.
    pub fn hash_for_id<P: SchemeParams, Id: PartyId>(&self, id: &Id) -> Hasher<P> {
        Hasher::new_with_dst(b"KeyGen").chain(&self.0).chain(id)
    }
}
