//! The key generation protocol and its driver.

mod errors;
mod keygen;
mod keygen_session;

#[cfg(test)]
mod keygen_tests;

pub use errors::{KeygenError, LocalError, ReceiveError, RemoteError, SamplingTarget, SessionError};
pub use keygen::{
    KeyGen, KeyGenMessage, PublicReveal, Round1, Round1Prime, Round2, Round2Message, Round3, Round3Message, Round4,
    Round4Message, Round5, Round5Message,
};
pub use keygen_session::{KeyGenSession, Outgoing, SessionOutcome};
