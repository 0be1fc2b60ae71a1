use alloc::{boxed::Box, vec};

use digest::{ExtendableOutput, Update, XofReader};
use hashing_serializer::HashingSerializer;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_encoded_bytes::{Hex, SliceLike};

use crate::{curve::Scalar, params::SchemeParams};

/// A digest object that takes byte slices or decomposable ([`Hashable`]) objects.
pub(crate) trait Chain: Sized {
    fn as_digest_mut(&mut self) -> &mut impl Update;

    /// Hash raw bytes.
    ///
    /// Note: only for impls in specific types, do not use directly.
    fn chain_raw_bytes(self, bytes: &[u8]) -> Self;

    /// Hash raw bytes in a collision-resistant way.
    fn chain_bytes(self, bytes: &(impl AsRef<[u8]> + ?Sized)) -> Self {
        // Hash the length too to prevent hash conflicts. (e.g. H(AB|CD) == H(ABC|D)).
        // Not strictly necessary for fixed-size arrays, but it's easier to just always do it.
        let len = (bytes.as_ref().len() as u64).to_be_bytes();
        self.chain_raw_bytes(&len).chain_raw_bytes(bytes.as_ref())
    }

    fn chain<T: Hashable>(self, hashable: &T) -> Self {
        hashable.chain(self)
    }
}

/// Wraps an extendable output hash for easier replacement, and standardizes the use of DST.
#[derive(Clone)]
pub(crate) struct Hasher<P: SchemeParams>(P::Digest);

impl<P: SchemeParams> Chain for Hasher<P> {
    fn as_digest_mut(&mut self) -> &mut impl Update {
        &mut self.0
    }

    fn chain_raw_bytes(self, bytes: &[u8]) -> Self {
        let mut digest = self.0;
        digest.update(bytes);
        Self(digest)
    }
}

/// The number of bytes in hash outputs and decommitment randomness.
pub(crate) const fn hash_output_len<P: SchemeParams>() -> usize {
    // A common heuristic for hashes is that the log2 of the collision probability is half the output size.
    (P::SECURITY_BITS * 2).div_ceil(8)
}

impl<P: SchemeParams> Hasher<P> {
    fn new() -> Self {
        Self(P::Digest::default())
    }

    pub fn new_with_dst(dst: &[u8]) -> Self {
        Self::new().chain_bytes(dst)
    }

    pub fn finalize_to_reader(self) -> <P::Digest as ExtendableOutput>::Reader {
        self.0.finalize_xof()
    }

    /// Finalizes into enough bytes to bring the collision probability to what's required by the scheme's security.
    pub fn finalize(self) -> HashOutput {
        HashOutput(self.0.finalize_xof().read_boxed(hash_output_len::<P>()))
    }

    pub fn finalize_to_scalar(self) -> Scalar {
        let mut bytes = [0u8; 32];
        self.0.finalize_xof().read(&mut bytes);
        Scalar::from_reduced_bytes(&bytes)
    }

    /// Like [`Chain::chain`] for serializable values, but reports serialization failures
    /// instead of treating them as unreachable.
    fn try_chain_serializable<T: Serialize>(self, value: &T) -> Result<Self, CommitmentError> {
        let mut digest = self;
        let serializer = HashingSerializer {
            digest: digest.as_digest_mut(),
        };
        value
            .serialize(serializer)
            .map_err(|_| CommitmentError::Serialization)?;
        Ok(digest)
    }

    /// Binds `value` under this hasher's context.
    ///
    /// The hasher is expected to be already scoped to the sender
    /// (see [`Sid::hash_for_id`](`crate::session::Sid::hash_for_id`)).
    pub fn commit<T: Serialize>(
        self,
        rng: &mut impl CryptoRngCore,
        value: &T,
    ) -> Result<(Commitment, Decommitment), CommitmentError> {
        let mut randomness = vec![0u8; hash_output_len::<P>()];
        rng.try_fill_bytes(&mut randomness)
            .map_err(|_| CommitmentError::Sampling)?;
        let decommitment = Decommitment(randomness.into());
        let commitment = self.commitment_hash(value, &decommitment)?;
        Ok((commitment, decommitment))
    }

    /// Returns `true` if `commitment` was produced by [`Hasher::commit`] for exactly this `value`
    /// and `decommitment`, under the same context.
    pub fn verify_commitment<T: Serialize>(
        self,
        commitment: &Commitment,
        decommitment: &Decommitment,
        value: &T,
    ) -> bool {
        if decommitment.0.len() != hash_output_len::<P>() {
            return false;
        }
        match self.commitment_hash(value, decommitment) {
            Ok(expected) => &expected == commitment,
            Err(_) => false,
        }
    }

    fn commitment_hash<T: Serialize>(
        self,
        value: &T,
        decommitment: &Decommitment,
    ) -> Result<Commitment, CommitmentError> {
        Ok(Commitment(
            self.chain_bytes(b"Commitment")
                .try_chain_serializable(value)?
                .chain_bytes(&decommitment.0)
                .finalize(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HashOutput(#[serde(with = "SliceLike::<Hex>")] Box<[u8]>);

impl AsRef<[u8]> for HashOutput {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A hiding and binding commitment to a tuple of protocol values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment(HashOutput);

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// The opening of a [`Commitment`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Decommitment(#[serde(with = "SliceLike::<Hex>")] Box<[u8]>);

impl core::fmt::Debug for Decommitment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Decommitment(...)")
    }
}

/// Errors that can occur while producing a commitment.
#[derive(displaydoc::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitmentError {
    /// Failed to sample the decommitment randomness.
    Sampling,
    /// Failed to serialize the committed value into the hash.
    Serialization,
}

/// A trait allowing complex objects to give access to their contents for hashing purposes
/// without the need of a conversion to a new form (e.g. serialization).
pub(crate) trait Hashable {
    fn chain<C: Chain>(&self, digest: C) -> C;
}

// We have a lot of things that already implement `Serialize`,
// so there's no point in implementing `Hashable` for them separately.
// The reproducibility of this hash depends on `serde` not breaking things,
// which we can be quite certain about - it is stable, and if it does break something,
// all the serialization will likely break too.
impl<T: Serialize> Hashable for T {
    fn chain<C: Chain>(&self, digest: C) -> C {
        let mut digest = digest;

        let serializer = HashingSerializer {
            digest: digest.as_digest_mut(),
        };

        // The only way it can return an error is if there is
        // some non-serializable element encountered, which is 100% reproducible
        // and will be caught in tests.
        self.serialize(serializer).expect("The type is serializable");

        digest
    }
}
