use alloc::boxed::Box;
use core::ops::BitXorAssign;

use rand_core::CryptoRngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_encoded_bytes::{Hex, SliceLike};

/// The length of a [`Rid`] in bytes.
pub(crate) const RID_BYTES: usize = 32;

/// A fixed-length random identifier.
///
/// Used both for the per-party session randomness and for the chain key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid([u8; RID_BYTES]);

impl Rid {
    /// Samples a random identifier, reporting a failure of the RNG instead of panicking.
    pub(crate) fn try_random(rng: &mut impl CryptoRngCore) -> Result<Self, rand_core::Error> {
        let mut bytes = [0u8; RID_BYTES];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Creates an identifier from raw bytes.
    pub fn from_bytes(bytes: [u8; RID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; RID_BYTES] {
        &self.0
    }
}

impl BitXorAssign<&Rid> for Rid {
    fn bitxor_assign(&mut self, rhs: &Rid) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0.iter()) {
            *lhs ^= rhs
        }
    }
}

impl<'a> core::iter::Sum<&'a Rid> for Rid {
    /// XOR of all the identifiers (all zeros for an empty iterator).
    fn sum<I: Iterator<Item = &'a Rid>>(iter: I) -> Self {
        iter.fold(Rid([0u8; RID_BYTES]), |mut acc, rid| {
            acc ^= rid;
            acc
        })
    }
}

impl Serialize for Rid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SliceLike::<Hex>::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Rid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Box<[u8]> = SliceLike::<Hex>::deserialize(deserializer)?;
        let bytes: [u8; RID_BYTES] = bytes
            .as_ref()
            .try_into()
            .map_err(|_| de::Error::custom("Invalid length of a RID"))?;
        Ok(Self(bytes))
    }
}
