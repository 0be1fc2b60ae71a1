pub mod executor;
pub(crate) mod hashing;
pub(crate) mod protocol_shortcuts;
mod rid;
mod secret;
pub(crate) mod sss;

pub use rid::Rid;
pub(crate) use secret::Secret;
