use alloc::string::String;
use core::fmt::{self, Debug, Display};

/// An error caused by a bug or a misuse of the API on this node's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalError(String);

impl LocalError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl Display for LocalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Local error: {}", self.0)
    }
}

impl core::error::Error for LocalError {}

/// Invalid session parameters or an inconsistent previous configuration.
#[derive(displaydoc::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The set of parties is empty.
    EmptyPartySet,
    /// This node's ID is not in the set of parties.
    NotAParticipant,
    /// Threshold {threshold} is invalid for {parties} parties (must be smaller than the number of parties).
    InvalidThreshold {
        /// The requested threshold.
        threshold: usize,
        /// The number of parties.
        parties: usize,
    },
    /// Two parties map to the same (or a zero) share index.
    InvalidShareIds,
    /// The previous public shares do not cover exactly the current set of parties.
    PreviousSharesMismatch,
    /// The previous secret share does not correspond to this node's previous public share.
    PreviousSecretMismatch,
}

impl core::error::Error for SessionError {}

/// A value that could not be sampled because the RNG failed.
#[derive(displaydoc::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingTarget {
    /// the session RID
    Rid,
    /// the chain key
    ChainKey,
    /// a child RNG seed
    RngSeed,
    /// the secret sharing polynomial
    Polynomial,
    /// the Pedersen parameters proof randomness
    PrmProof,
    /// the decommitment randomness
    Decommitment,
}

/// A fault attributable to another party.
#[derive(displaydoc::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteError {
    /// The revealed values do not match the commitment.
    CommitmentMismatch,
    /// The revealed polynomial has degree {actual:?}, expected {expected}.
    InvalidPolynomialDegree {
        /// The session threshold.
        expected: usize,
        /// The degree of the received polynomial (`None` if it has no coefficients).
        actual: Option<usize>,
    },
    /// The constant term of the revealed polynomial is invalid for this mode.
    InvalidConstantTerm,
    /// The revealed chain key differs from the inherited one.
    ChainKeyMismatch,
    /// The revealed Pedersen parameters are malformed: {0}.
    InvalidPedersenParams(&'static str),
    /// The Pedersen parameters proof does not verify.
    InvalidPrmProof,
    /// The received share does not match the sender's public polynomial.
    InvalidShare,
    /// The proof of knowledge of the key share does not verify.
    InvalidSchnorrProof,
}

impl core::error::Error for RemoteError {}

/// Possible errors of the key generation protocol.
#[derive(Debug, Clone)]
pub enum KeygenError<Id> {
    /// Invalid session parameters.
    Session(SessionError),
    /// The RNG failed.
    Sampling(SamplingTarget),
    /// The commitment could not be constructed.
    Commitment,
    /// A bug or a misuse on this node's side.
    Local(LocalError),
    /// Another party misbehaved.
    Remote {
        /// The offending party.
        party: Id,
        /// The fault.
        error: RemoteError,
    },
}

impl<Id: Debug> Display for KeygenError<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(err) => write!(f, "Invalid session: {err}"),
            Self::Sampling(target) => write!(f, "Failed to sample {target}"),
            Self::Commitment => write!(f, "Failed to construct the commitment"),
            Self::Local(err) => write!(f, "{err}"),
            Self::Remote { party, error } => write!(f, "Party {party:?} misbehaved: {error}"),
        }
    }
}

impl<Id: Debug> core::error::Error for KeygenError<Id> {}

impl<Id> From<SessionError> for KeygenError<Id> {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl<Id> From<LocalError> for KeygenError<Id> {
    fn from(err: LocalError) -> Self {
        Self::Local(err)
    }
}

/// Reasons a received message is rejected.
#[derive(Debug, Clone)]
pub enum ReceiveError<Id> {
    /// The sender is not a participant of the session, or it is this node itself.
    UnknownSender(Id),
    /// A message from this sender has already been received for this round.
    Duplicate(Id),
    /// The message belongs to round {actual}, but the session is in round {current}.
    WrongRound {
        /// The sender.
        party: Id,
        /// The round the session is in.
        current: u8,
        /// The round the message is for.
        actual: u8,
    },
    /// The message content is invalid.
    Remote {
        /// The sender.
        party: Id,
        /// The fault.
        error: RemoteError,
    },
}

impl<Id: Debug> Display for ReceiveError<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSender(party) => write!(f, "Message from an unknown sender {party:?}"),
            Self::Duplicate(party) => write!(f, "Duplicate message from {party:?}"),
            Self::WrongRound { party, current, actual } => write!(
                f,
                "Message from {party:?} is for round {actual}, but the session is in round {current}"
            ),
            Self::Remote { party, error } => write!(f, "Invalid message from {party:?}: {error}"),
        }
    }
}

impl<Id: Debug> core::error::Error for ReceiveError<Id> {}

impl<Id> ReceiveError<Id> {
    /// Returns the party at fault if the message was well-addressed but invalid.
    pub fn remote_fault(&self) -> Option<(&Id, &RemoteError)> {
        match self {
            Self::Remote { party, error } => Some((party, error)),
            _ => None,
        }
    }
}
