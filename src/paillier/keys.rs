use core::marker::PhantomData;

use crypto_bigint::NonZero;
use crypto_primes::RandomPrimeWithRng;
use derive_where::derive_where;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::{
    pedersen::{PedersenParams, PedersenSecret},
    PaillierUint,
};
use crate::{params::SchemeParams, protocols::LocalError, tools::Secret};

/// A Paillier secret key: two primes of [`SchemeParams::PAILLIER_PRIME_BITS`] bits.
#[derive(Serialize, Deserialize)]
#[derive_where(Clone, Debug)]
#[serde(bound = "")]
pub struct SecretKeyPaillier<P: SchemeParams> {
    p: Secret<PaillierUint>,
    q: Secret<PaillierUint>,
    #[serde(skip)]
    phantom: PhantomData<P>,
}

impl<P: SchemeParams> SecretKeyPaillier<P> {
    /// Generates a key with safe primes.
    ///
    /// This is slow (seconds for production parameters), which is why the protocol
    /// takes the key as an input instead of generating it inside a round.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        let p = Secret::init_with(|| PaillierUint::generate_safe_prime_with_rng(rng, P::PAILLIER_PRIME_BITS));
        let q = Secret::init_with(|| PaillierUint::generate_safe_prime_with_rng(rng, P::PAILLIER_PRIME_BITS));
        Self {
            p,
            q,
            phantom: PhantomData,
        }
    }

    /// Generates a key with regular (not safe) primes. Only suitable for tests.
    #[cfg(any(test, feature = "dev"))]
    pub(crate) fn random_insecure(rng: &mut impl CryptoRngCore) -> Self {
        let p = Secret::init_with(|| PaillierUint::generate_prime_with_rng(rng, P::PAILLIER_PRIME_BITS));
        let q = Secret::init_with(|| PaillierUint::generate_prime_with_rng(rng, P::PAILLIER_PRIME_BITS));
        Self {
            p,
            q,
            phantom: PhantomData,
        }
    }

    /// Returns the modulus `N = p * q`.
    pub(crate) fn modulus(&self) -> PaillierUint {
        self.p.expose_secret().wrapping_mul(self.q.expose_secret())
    }

    /// Euler's totient function of `p * q` - the number of positive integers up to `p * q`
    /// that are relatively prime to it.
    /// Since `p` and `q` are primes, returns `(p - 1) * (q - 1)`.
    pub(crate) fn totient(&self) -> Result<Secret<NonZero<PaillierUint>>, LocalError> {
        Secret::try_init_with(|| {
            let p_minus_one = self.p.expose_secret().wrapping_sub(&PaillierUint::ONE);
            let q_minus_one = self.q.expose_secret().wrapping_sub(&PaillierUint::ONE);
            Option::from(NonZero::new(p_minus_one.wrapping_mul(&q_minus_one)))
                .ok_or_else(|| LocalError::new("The Paillier totient is zero"))
        })
    }

    /// Returns the corresponding public key.
    pub fn public_key(&self) -> PublicKeyPaillier {
        PublicKeyPaillier {
            modulus: self.modulus(),
        }
    }

    /// Derives a fresh set of Pedersen parameters over this key's modulus,
    /// along with the discrete log witness `lambda` such that `s = t^lambda mod N`.
    pub(crate) fn generate_pedersen(
        &self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(PedersenParams, PedersenSecret), LocalError> {
        let totient = self.totient()?;
        PedersenParams::random::<P>(rng, &self.modulus(), &totient)
    }
}

/// A Paillier public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyPaillier {
    modulus: PaillierUint,
}

impl PublicKeyPaillier {
    /// The Pedersen parameters of a party share the modulus with its Paillier key.
    pub(crate) fn from_pedersen(pedersen: &PedersenParams) -> Self {
        Self {
            modulus: *pedersen.modulus(),
        }
    }

    /// Returns the modulus `N`.
    pub fn modulus(&self) -> &PaillierUint {
        &self.modulus
    }
}
