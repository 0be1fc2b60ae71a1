//! Parameters and helpers intended for testing, scaled down to small integer sizes.

use rand_core::CryptoRngCore;
use sha3::Shake256;

use crate::{paillier::SecretKeyPaillier, params::SchemeParams};

/// Scheme parameters **for testing purposes only**.
/// Security is weakened to allow for faster execution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TestParams;

impl SchemeParams for TestParams {
    type Digest = Shake256;
    const SECURITY_BITS: usize = 32;
    const PAILLIER_PRIME_BITS: u32 = 128;
}

static_assertions::const_assert!(TestParams::SELF_CONSISTENT);

/// Generates a Paillier key from regular (not safe) primes.
///
/// **Insecure**, only makes the test suites faster.
pub fn insecure_paillier_key(rng: &mut impl CryptoRngCore) -> SecretKeyPaillier<TestParams> {
    SecretKeyPaillier::random_insecure(rng)
}
