use core::{
    fmt::Debug,
    ops::{Add, Mul},
};

use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use crate::curve::{Point, Scalar};

/// A helper wrapper for managing secret values.
///
/// On top of `secrecy::SecretBox` functionality, it provides:
/// - Safe `Clone` implementation (without needing to impl `CloneableSecret`)
/// - Safe `Debug` implementation
/// - Safe serialization/deserialization (down to `serde` API; what happens there we cannot control)
pub(crate) struct Secret<T: Zeroize>(SecretBox<T>);

impl<T> Secret<T>
where
    T: Zeroize,
{
    pub fn expose_secret(&self) -> &T {
        self.0.expose_secret()
    }
}

impl<T> Secret<T>
where
    T: Zeroize + Clone,
{
    pub fn init_with(ctr: impl FnOnce() -> T) -> Self {
        Self(SecretBox::init_with(ctr))
    }

    pub fn try_init_with<E>(ctr: impl FnOnce() -> Result<T, E>) -> Result<Self, E> {
        Ok(Self(SecretBox::try_init_with(ctr)?))
    }
}

impl<T> Clone for Secret<T>
where
    T: Zeroize + Clone,
{
    fn clone(&self) -> Self {
        Self::init_with(|| self.0.expose_secret().clone())
    }
}

impl<T> Serialize for Secret<T>
where
    T: Zeroize + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.expose_secret().serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Secret<T>
where
    T: Zeroize + Clone + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = T::deserialize(deserializer)?;
        let secret = Self::init_with(|| value.clone());
        value.zeroize();
        Ok(secret)
    }
}

impl<T> Debug for Secret<T>
where
    T: Zeroize,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Secret<{}>(...)", core::any::type_name::<T>())
    }
}

impl Secret<Scalar> {
    pub fn mul_by_generator(&self) -> Point {
        self.expose_secret().mul_by_generator()
    }

    pub fn is_zero(&self) -> bool {
        self.expose_secret().is_zero()
    }
}

impl Add<&Secret<Scalar>> for Secret<Scalar> {
    type Output = Secret<Scalar>;
    fn add(self, rhs: &Secret<Scalar>) -> Self::Output {
        Secret::init_with(|| self.expose_secret() + rhs.expose_secret())
    }
}

impl Add<&Secret<Scalar>> for &Secret<Scalar> {
    type Output = Secret<Scalar>;
    fn add(self, rhs: &Secret<Scalar>) -> Self::Output {
        Secret::init_with(|| self.expose_secret() + rhs.expose_secret())
    }
}

impl Mul<&Scalar> for &Secret<Scalar> {
    type Output = Secret<Scalar>;
    fn mul(self, rhs: &Scalar) -> Self::Output {
        Secret::init_with(|| self.expose_secret() * rhs)
    }
}

impl Mul<Scalar> for Secret<Scalar> {
    type Output = Secret<Scalar>;
    fn mul(self, rhs: Scalar) -> Self::Output {
        Secret::init_with(|| self.expose_secret() * &rhs)
    }
}

impl core::iter::Sum<Secret<Scalar>> for Secret<Scalar> {
    fn sum<I: Iterator<Item = Secret<Scalar>>>(iter: I) -> Self {
        iter.fold(Secret::init_with(|| Scalar::ZERO), |acc, item| acc + &item)
    }
}

impl<'a> core::iter::Sum<&'a Secret<Scalar>> for Secret<Scalar> {
    fn sum<I: Iterator<Item = &'a Secret<Scalar>>>(iter: I) -> Self {
        iter.fold(Secret::init_with(|| Scalar::ZERO), |acc, item| acc + item)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use rand_core::OsRng;

    use super::Secret;
    use crate::curve::Scalar;

    #[test]
    fn debug_does_not_leak() {
        let secret = Secret::init_with(|| Scalar::random(&mut OsRng));
        let debug = format!("{secret:?}");
        assert!(debug.ends_with("(...)"));
        assert!(!debug.contains(&format!("{:?}", secret.expose_secret())));
    }

    #[test]
    fn arithmetic_matches_exposed_values() {
        let x = Scalar::random(&mut OsRng);
        let y = Scalar::random(&mut OsRng);
        let sx = Secret::init_with(|| x);
        let sy = Secret::init_with(|| y);

        assert_eq!((&sx + &sy).expose_secret(), &(x + y));
        assert_eq!((&sx * &y).expose_secret(), &(x * y));
        assert_eq!(sx.mul_by_generator(), x.mul_by_generator());
        let sum: Secret<Scalar> = [sx, sy].iter().sum();
        assert_eq!(sum.expose_secret(), &(x + y));
    }
}
