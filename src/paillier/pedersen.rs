//! Ring-Pedersen parameters (Definition 3.3 of CGGMP'21).

use crypto_bigint::{
    modular::{MontyForm, MontyParams},
    NonZero, Odd, RandomMod,
};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::PaillierUint;
use crate::{params::SchemeParams, protocols::LocalError, tools::Secret};

/// Public Pedersen commitment parameters: a modulus `N` and two generators `s`, `t`
/// of the same subgroup of quadratic residues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedersenParams {
    n: PaillierUint,
    s: PaillierUint,
    t: PaillierUint,
}

/// The discrete log of `s` to the base `t`, and the totient it was sampled modulo.
#[derive(Debug, Clone)]
pub(crate) struct PedersenSecret {
    lambda: Secret<PaillierUint>,
    totient: Secret<NonZero<PaillierUint>>,
}

impl PedersenSecret {
    pub fn lambda(&self) -> &Secret<PaillierUint> {
        &self.lambda
    }

    pub fn totient(&self) -> &Secret<NonZero<PaillierUint>> {
        &self.totient
    }
}

impl PedersenParams {
    pub(crate) fn random<P: SchemeParams>(
        rng: &mut impl CryptoRngCore,
        modulus: &PaillierUint,
        totient: &Secret<NonZero<PaillierUint>>,
    ) -> Result<(Self, PedersenSecret), LocalError> {
        let monty_params = monty_params(modulus).ok_or_else(|| LocalError::new("The Paillier modulus is even"))?;
        let modulus_nonzero = Option::<NonZero<PaillierUint>>::from(NonZero::new(*modulus))
            .ok_or_else(|| LocalError::new("The Paillier modulus is zero"))?;

        let tau = PaillierUint::random_mod(rng, &modulus_nonzero);
        let t = MontyForm::new(&tau, monty_params).square();
        let lambda = Secret::init_with(|| PaillierUint::random_mod(rng, totient.expose_secret()));
        let s = t.pow_bounded_exp(lambda.expose_secret(), P::PAILLIER_MODULUS_BITS);

        let params = Self {
            n: *modulus,
            s: s.retrieve(),
            t: t.retrieve(),
        };
        let secret = PedersenSecret {
            lambda,
            totient: totient.clone(),
        };
        Ok((params, secret))
    }

    /// The modulus `N`.
    pub fn modulus(&self) -> &PaillierUint {
        &self.n
    }

    /// The generator `s = t^lambda`.
    pub fn s(&self) -> &PaillierUint {
        &self.s
    }

    /// The base generator `t`.
    pub fn t(&self) -> &PaillierUint {
        &self.t
    }

    pub(crate) fn monty_params(&self) -> Option<MontyParams<{ PaillierUint::LIMBS }>> {
        monty_params(&self.n)
    }

    /// Checks the structural validity of parameters received from another party.
    pub(crate) fn validate<P: SchemeParams>(&self) -> Result<(), &'static str> {
        if self.monty_params().is_none() {
            return Err("the modulus is even");
        }
        let bits = self.n.bits();
        if bits < P::PAILLIER_MODULUS_BITS - 1 || bits > P::PAILLIER_MODULUS_BITS {
            return Err("the modulus has the wrong size");
        }
        if self.s == PaillierUint::ZERO || self.s >= self.n {
            return Err("`s` is out of range");
        }
        if self.t == PaillierUint::ZERO || self.t >= self.n {
            return Err("`t` is out of range");
        }
        if self.s == self.t {
            return Err("`s` and `t` are equal");
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with_t(&self, t: PaillierUint) -> Self {
        Self {
            n: self.n,
            s: self.s,
            t,
        }
    }
}

fn monty_params(modulus: &PaillierUint) -> Option<MontyParams<{ PaillierUint::LIMBS }>> {
    Option::<Odd<PaillierUint>>::from(Odd::new(*modulus)).map(MontyParams::new)
}
