use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Return the unique identifier for a DFA's dead state in the chosen
/// representation indicated by `S`.
pub fn dead_id<S: StateID>() -> S {
    S::from_usize(0)
}

/// Check that the premultiplication of the given state identifier can fit
/// into the representation indicated by `S`. If it cannot, or if it overflows
/// `usize` itself, then an error is returned.
pub fn premultiply_overflow_error<S: StateID>(
    last_state: S,
    alphabet_len: usize,
) -> Result<()> {
    let requested = match last_state.to_usize().checked_mul(alphabet_len) {
        Some(requested) => requested,
        None => return Err(Error::premultiply_overflow(0, 0)),
    };
    if requested > S::max_id() {
        return Err(Error::premultiply_overflow(S::max_id(), requested));
    }
    Ok(())
}

/// A trait describing the representation of a DFA's state identifier.
///
/// The purpose of this trait is to safely express both the possible state
/// identifier representations that can be used in a DFA and to convert
/// between state identifier representations and types that can be used to
/// efficiently index memory (such as `usize`).
///
/// In general, one should not need to implement this trait explicitly. State
/// identifiers are either chosen for you (defaulting to `usize`) or can be
/// specified via the width conversion routines on `DenseDFA` or the
/// `build_with_size` method on its builder.
///
/// # Safety
///
/// This trait is not itself unsafe, but the serialization paths of this
/// crate rely on its implementations reporting `size_of::<Self>()` as one
/// of 1, 2, 4 or 8 bytes and on `from_usize`/`to_usize` being exact
/// inverses for every value up to `max_id`. All implementations in this
/// crate uphold that contract.
pub trait StateID:
    Clone + Copy + Debug + Eq + Hash + PartialEq + PartialOrd + Ord
{
    /// Convert from a `usize` to this implementation's representation.
    ///
    /// Implementors may assume that `n <= Self::max_id`. That is, implementors
    /// do not need to check whether `n` can fit inside this implementation's
    /// representation.
    fn from_usize(n: usize) -> Self;

    /// Convert this implementation's representation to a `usize`.
    ///
    /// Implementors must not return a `usize` value greater than
    /// `Self::max_id` and must not permit overflow when converting between the
    /// implementor's representation and `usize`. In general, the preferred
    /// way for implementors to achieve this is to simply not provide
    /// implementations of `StateID` that cannot fit into the target platform's
    /// `usize`.
    fn to_usize(self) -> usize;

    /// Return the maximum state identifier supported by this representation.
    ///
    /// Implementors must return a correct bound. Doing otherwise may result
    /// in unspecified behavior (but will not violate memory safety).
    fn max_id() -> usize;
}

impl StateID for usize {
    #[inline]
    fn from_usize(n: usize) -> usize {
        n
    }

    #[inline]
    fn to_usize(self) -> usize {
        self
    }

    #[inline]
    fn max_id() -> usize {
        usize::MAX
    }
}

impl StateID for u8 {
    #[inline]
    fn from_usize(n: usize) -> u8 {
        n as u8
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn max_id() -> usize {
        u8::MAX as usize
    }
}

impl StateID for u16 {
    #[inline]
    fn from_usize(n: usize) -> u16 {
        n as u16
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn max_id() -> usize {
        u16::MAX as usize
    }
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl StateID for u32 {
    #[inline]
    fn from_usize(n: usize) -> u32 {
        n as u32
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn max_id() -> usize {
        u32::MAX as usize
    }
}

#[cfg(target_pointer_width = "64")]
impl StateID for u64 {
    #[inline]
    fn from_usize(n: usize) -> u64 {
        n as u64
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn max_id() -> usize {
        u64::MAX as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_is_zero() {
        assert_eq!(0u8, dead_id::<u8>());
        assert_eq!(0u64, dead_id::<u64>());
        assert_eq!(0usize, dead_id::<usize>());
    }

    #[test]
    fn premultiply_overflow() {
        // 3 states of 10 classes each fits easily in u8...
        assert!(premultiply_overflow_error(2u8, 10).is_ok());
        // ... but 30 states does not, since the last premultiplied ID
        // would be 29 * 10 = 290.
        assert!(premultiply_overflow_error(29u8, 10).is_err());
        assert!(premultiply_overflow_error(1000u16, 256).is_err());
        assert!(premultiply_overflow_error(1000u32, 256).is_ok());
    }
}
