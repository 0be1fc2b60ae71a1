//! ZK proofs used by the key generation protocol.

mod prm;
mod sch;

pub use prm::PrmProof;
pub use sch::{SchCommitment, SchProof};
pub(crate) use sch::SchSecret;
