//! Paillier keys and the Pedersen commitment parameters derived from them.

mod keys;
mod pedersen;

pub use keys::{PublicKeyPaillier, SecretKeyPaillier};
pub use pedersen::PedersenParams;
pub(crate) use pedersen::PedersenSecret;

/// The integer type holding Paillier primes, moduli and Pedersen parameters.
///
/// Sized for the largest supported modulus; the actual bit lengths come from
/// [`SchemeParams`](`crate::SchemeParams`).
pub(crate) type PaillierUint = crypto_bigint::U2048;
