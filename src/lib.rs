#![cfg_attr(not(any(test, feature = "parallel")), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(
    clippy::mod_module_files,
    missing_docs,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_qualifications
)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::indexing_slicing))]

/*!
## Features

`parallel`: implements [`Executor`] for [`rayon::ThreadPool`](`::rayon::ThreadPool`),
so that the independent sampling in the first round can run on several threads.

`dev`: exposes the [`dev`] module with non-secure parameters for testing.
*/

extern crate alloc;

mod curve;
mod entities;
mod paillier;
mod params;
mod protocols;
mod session;
mod tools;
mod zk;

#[cfg(any(test, feature = "dev"))]
pub mod dev;

// Re-exported to avoid the need for version-matching
pub use k256::ecdsa::VerifyingKey;

pub use curve::{Point, Scalar};
pub use entities::{KeyConfig, PreviousConfig, PublicAuxInfo};
pub use paillier::{PedersenParams, PublicKeyPaillier, SecretKeyPaillier};
pub use params::{ProductionParams112, SchemeParams};
pub use protocols::{
    KeyGen, KeyGenMessage, KeyGenSession, KeygenError, LocalError, Outgoing, PublicReveal, ReceiveError, RemoteError,
    Round1, Round1Prime, Round2, Round2Message, Round3, Round3Message, Round4, Round4Message, Round5, Round5Message,
    SamplingTarget, SessionError, SessionOutcome,
};
pub use session::{PartyId, SessionInfo};
pub use tools::{
    executor::{Executor, Sequential},
    Rid,
};
pub use tools::sss::ShareId;
pub use zk::{PrmProof, SchCommitment, SchProof};
