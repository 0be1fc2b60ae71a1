use alloc::{collections::BTreeMap, vec::Vec};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    curve::{Point, Scalar},
    params::SchemeParams,
    protocols::LocalError,
    tools::{
        hashing::{Chain, Hasher},
        Secret,
    },
};

/// The evaluation point of a party in the secret sharing.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShareId(Scalar);

impl ShareId {
    /// Derives the evaluation point from the party ID.
    ///
    /// The result may be zero or collide with another party's; session construction rejects both.
    pub fn from_party_id<P: SchemeParams>(id: &impl Serialize) -> Self {
        Self(
            Hasher::<P>::new_with_dst(b"ShareId")
                .chain(id)
                .finalize_to_scalar(),
        )
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[cfg(test)]
    pub(crate) fn new(idx: u64) -> Self {
        Self(Scalar::from(idx))
    }
}

/// A secret polynomial over the scalar field.
#[derive(Debug)]
pub(crate) struct Polynomial(Vec<Secret<Scalar>>);

impl Polynomial {
    /// Creates a polynomial of the given degree with the given constant term
    /// and the rest of the coefficients sampled at random.
    pub fn random(rng: &mut impl CryptoRngCore, coeff0: Secret<Scalar>, degree: usize) -> Self {
        let mut coeffs = Vec::with_capacity(degree + 1);
        coeffs.push(coeff0);
        for _ in 0..degree {
            coeffs.push(Secret::init_with(|| Scalar::random_nonzero(rng)));
        }
        Self(coeffs)
    }

    pub fn evaluate(&self, x: &ShareId) -> Secret<Scalar> {
        // Evaluate in reverse to save on multiplications.
        // Basically: a0 + a1 x + a2 x^2 + a3 x^3 == (((a3 x) + a2) x + a1) x + a0
        Secret::init_with(|| {
            self.0
                .iter()
                .rev()
                .fold(Scalar::ZERO, |acc, coeff| acc * x.0 + coeff.expose_secret())
        })
    }

    pub fn public(&self) -> PublicPolynomial {
        PublicPolynomial(self.0.iter().map(|coeff| coeff.mul_by_generator()).collect())
    }

    #[cfg(test)]
    pub fn coeff0(&self) -> Option<&Secret<Scalar>> {
        self.0.first()
    }
}

/// A polynomial with the coefficients lifted to curve points.
/// The coefficients of a secret polynomial multiplied by the curve generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPolynomial(Vec<Point>);

impl PublicPolynomial {
    pub(crate) fn evaluate(&self, x: &ShareId) -> Point {
        self.0
            .iter()
            .rev()
            .fold(Point::IDENTITY, |acc, coeff| acc * x.0 + *coeff)
    }

    /// The degree of the polynomial, `None` if it has no coefficients.
    pub(crate) fn degree(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    /// The constant term lifted to the curve (the identity for an empty polynomial).
    pub(crate) fn coeff0(&self) -> Point {
        self.0.first().copied().unwrap_or(Point::IDENTITY)
    }

    #[cfg(test)]
    pub(crate) fn from_coeffs(coeffs: Vec<Point>) -> Self {
        Self(coeffs)
    }
}

pub(crate) fn interpolation_coeff<'a>(
    share_ids: impl Iterator<Item = &'a ShareId>,
    share_id: &ShareId,
) -> Result<Scalar, LocalError> {
    share_ids
        .filter(|id| *id != share_id)
        .map(|id| {
            (id.0 - share_id.0)
                .invert()
                .map(|inv| id.0 * inv)
                .ok_or_else(|| LocalError::new("Share IDs must be distinct"))
        })
        .product()
}

pub(crate) fn shamir_join_points(pairs: &BTreeMap<ShareId, Point>) -> Result<Point, LocalError> {
    pairs.iter().try_fold(Point::IDENTITY, |acc, (share_id, val)| {
        Ok(acc + *val * interpolation_coeff(pairs.keys(), share_id)?)
    })
}

#[cfg(test)]
pub(crate) fn shamir_join_scalars(pairs: &BTreeMap<ShareId, Secret<Scalar>>) -> Secret<Scalar> {
    pairs
        .iter()
        .map(|(share_id, val)| val * &interpolation_coeff(pairs.keys(), share_id).unwrap())
        .sum()
}
