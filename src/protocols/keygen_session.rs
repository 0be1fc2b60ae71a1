//! A state machine over the key generation rounds for an external message loop.

use alloc::{collections::BTreeMap, format, vec, vec::Vec};

use rand_core::CryptoRngCore;

use super::{
    errors::{KeygenError, LocalError, ReceiveError},
    keygen::{KeyGen, KeyGenMessage, Round1Prime, Round2, Round3, Round4, Round5},
};
use crate::{
    entities::{KeyConfig, PreviousConfig},
    paillier::SecretKeyPaillier,
    params::SchemeParams,
    session::{PartyId, SessionInfo},
    tools::executor::{Executor, Sequential},
};

/// A message to be delivered by the transport.
#[derive(Debug, Clone)]
pub enum Outgoing<Id, M> {
    /// To every other party.
    Broadcast(M),
    /// To a single party, over a confidential channel.
    Direct {
        /// The recipient.
        to: Id,
        /// The message.
        message: M,
    },
}

/// The result of finalizing a round.
#[derive(Debug)]
pub enum SessionOutcome<P: SchemeParams, Id: PartyId> {
    /// The protocol continues.
    AnotherRound {
        /// The session in the next round.
        session: KeyGenSession<P, Id>,
        /// The messages to deliver.
        outgoing: Vec<Outgoing<Id, KeyGenMessage>>,
    },
    /// The protocol finished.
    Result(KeyConfig<P, Id>),
}

#[derive(Debug)]
enum State<P: SchemeParams, Id: PartyId> {
    Round1(Round1Prime<P, Id>),
    Round2(Round2<P, Id>),
    Round3(Round3<P, Id>),
    Round4(Round4<P, Id>),
    Round5(Round5<P, Id>),
}

/// A key generation (or refresh) run of a single party.
///
/// Messages that arrive one round early are stored and processed
/// when the session advances.
#[derive(Debug)]
pub struct KeyGenSession<P: SchemeParams, Id: PartyId> {
    state: State<P, Id>,
    cached: BTreeMap<Id, KeyGenMessage>,
}

impl<P: SchemeParams, Id: PartyId> KeyGenSession<P, Id> {
    /// Starts a run. See [`KeyGen::new`] for the meaning of the arguments.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        info: SessionInfo<Id>,
        previous: Option<PreviousConfig<Id>>,
        paillier_secret: SecretKeyPaillier<P>,
    ) -> Result<Self, KeygenError<Id>> {
        let round = KeyGen::new(info, previous, paillier_secret)?.make_round(rng)?;
        Ok(Self {
            state: State::Round1(round),
            cached: BTreeMap::new(),
        })
    }

    /// The number of the current round.
    pub fn round(&self) -> u8 {
        match &self.state {
            State::Round1(_) => 1,
            State::Round2(_) => 2,
            State::Round3(_) => 3,
            State::Round4(_) => 4,
            State::Round5(_) => 5,
        }
    }

    fn info(&self) -> &SessionInfo<Id> {
        match &self.state {
            State::Round1(round) => &round.round1.context.info,
            State::Round2(round) => &round.context.info,
            State::Round3(round) => &round.context.info,
            State::Round4(round) => &round.context.info,
            State::Round5(round) => &round.context.info,
        }
    }

    /// The parameters of this run.
    pub fn session_info(&self) -> &SessionInfo<Id> {
        self.info()
    }

    /// Processes a message from another party.
    pub fn receive(&mut self, from: &Id, message: KeyGenMessage) -> Result<(), ReceiveError<Id>> {
        let current = self.round();
        if message.round() == current + 1 {
            return self.cache(from, message);
        }
        match (&mut self.state, message) {
            (State::Round2(round), KeyGenMessage::Round2(message)) => round.receive_message(from, message),
            (State::Round3(round), KeyGenMessage::Round3(message)) => round.receive_message(from, message),
            (State::Round4(round), KeyGenMessage::Round4(message)) => round.receive_message(from, message),
            (State::Round5(round), KeyGenMessage::Round5(message)) => round.receive_message(from, message),
            (_, message) => Err(ReceiveError::WrongRound {
                party: from.clone(),
                current,
                actual: message.round(),
            }),
        }
    }

    fn cache(&mut self, from: &Id, message: KeyGenMessage) -> Result<(), ReceiveError<Id>> {
        let info = self.info();
        if from == info.own_id() || !info.ids().contains(from) {
            return Err(ReceiveError::UnknownSender(from.clone()));
        }
        if self.cached.contains_key(from) {
            return Err(ReceiveError::Duplicate(from.clone()));
        }
        tracing::trace!(from = ?from, round = message.round(), "Caching an early message");
        self.cached.insert(from.clone(), message);
        Ok(())
    }

    /// `true` if the current round has everything it needs.
    pub fn can_finalize(&self) -> bool {
        match &self.state {
            State::Round1(_) => true,
            State::Round2(round) => round.can_finalize(),
            State::Round3(round) => round.can_finalize(),
            State::Round4(round) => round.can_finalize(),
            State::Round5(round) => round.can_finalize(),
        }
    }

    /// Finalizes the current round.
    ///
    /// Fails if a message stored in advance turns out to be invalid,
    /// since the protocol needs every party to finish.
    pub fn finalize(self, rng: &mut impl CryptoRngCore) -> Result<SessionOutcome<P, Id>, KeygenError<Id>> {
        self.finalize_with(rng, &Sequential)
    }

    /// Same as [`KeyGenSession::finalize`], with the first round's computations
    /// scheduled by `executor` (see [`Round1Prime::finalize_with`]).
    pub fn finalize_with<E: Executor>(
        self,
        rng: &mut impl CryptoRngCore,
        executor: &E,
    ) -> Result<SessionOutcome<P, Id>, KeygenError<Id>> {
        let (state, outgoing) = match self.state {
            State::Round1(round) => {
                let (next, message) = round.finalize_with(rng, executor)?;
                (
                    State::Round2(next),
                    vec![Outgoing::Broadcast(KeyGenMessage::Round2(message))],
                )
            }
            State::Round2(round) => {
                let (next, message) = round.finalize()?;
                (
                    State::Round3(next),
                    vec![Outgoing::Broadcast(KeyGenMessage::Round3(message))],
                )
            }
            State::Round3(round) => {
                let (next, messages) = round.finalize(rng)?;
                let outgoing = messages
                    .into_iter()
                    .map(|(to, message)| Outgoing::Direct {
                        to,
                        message: KeyGenMessage::Round4(message),
                    })
                    .collect();
                (State::Round4(next), outgoing)
            }
            State::Round4(round) => {
                let (next, message) = round.finalize()?;
                (
                    State::Round5(next),
                    vec![Outgoing::Broadcast(KeyGenMessage::Round5(message))],
                )
            }
            State::Round5(round) => return Ok(SessionOutcome::Result(round.finalize()?)),
        };

        let mut session = Self {
            state,
            cached: BTreeMap::new(),
        };
        for (from, message) in self.cached {
            session.receive(&from, message).map_err(|error| match error {
                ReceiveError::Remote { party, error } => KeygenError::Remote { party, error },
                other => KeygenError::Local(LocalError::new(format!(
                    "Failed to process a stored message: {other}"
                ))),
            })?;
        }

        Ok(SessionOutcome::AnotherRound { session, outgoing })
    }
}
