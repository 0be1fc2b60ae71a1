//! Scheme parametes for production use.

use sha3::Shake256;

use super::traits::SchemeParams;

/// Production strength parameters corresponding to 112 bits of security.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProductionParams112;

// Source of the values: Appendix C.1.
impl SchemeParams for ProductionParams112 {
    type Digest = Shake256;
    const SECURITY_BITS: usize = 112;
    const PAILLIER_PRIME_BITS: u32 = 1024;
}

static_assertions::const_assert!(ProductionParams112::SELF_CONSISTENT);
