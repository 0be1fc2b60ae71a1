use core::fmt::Debug;

use digest::{ExtendableOutput, Update};

use crate::paillier::PaillierUint;

/// Key generation scheme parameters.
pub trait SchemeParams: 'static + Debug + Clone + Copy + Send + Sync + PartialEq + Eq {
    /// The extendable output hash used for commitments, challenges and session IDs.
    type Digest: Default + Clone + Update + ExtendableOutput;

    /// The number of bits of security provided by the scheme.
    ///
    /// Determines the length of hash outputs (twice this number of bits)
    /// and the number of repetitions of the binary-challenge proofs.
    const SECURITY_BITS: usize; // $m$ in the paper

    /// The size of one of the pair of Paillier primes.
    const PAILLIER_PRIME_BITS: u32;

    /// The size of the Paillier modulus (a product of two primes).
    const PAILLIER_MODULUS_BITS: u32 = Self::PAILLIER_PRIME_BITS * 2;

    /// `true` if the parameters are usable with the integer types of this crate.
    const SELF_CONSISTENT: bool = Self::SECURITY_BITS > 0
        && Self::SECURITY_BITS % 4 == 0
        && Self::PAILLIER_PRIME_BITS >= 64
        && Self::PAILLIER_MODULUS_BITS <= PaillierUint::BITS;
}
