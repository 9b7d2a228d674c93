/*!
Helper functions, types and traits for the binary format of serialized DFAs.

This crate defines its own bespoke serialization mechanism for DFAs because
a transition table demands a specific binary layout: the deserialized object
is a read-only view over the serialized bytes, so deserialization is nearly
free. The cost paid instead is a full validation pass over the buffer before
any view is handed out, since searching trusts its table lookups to be in
bounds.

In the code below, whenever some kind of padding is inserted, it's to enforce
an 8-byte alignment, unless otherwise noted. Namely, u64 is the largest state
ID representation supported, and all smaller representations have alignments
compatible with 8.

Serialization requires the caller to pick an endianness, while
deserialization always reads native endianness. The endianness mark in the
header is written in the declared order and read natively, so handing a
buffer to a machine of the opposite order fails up front with a distinguished
error instead of silently reinterpreting every integer.
*/

use std::cmp;
use std::convert::TryInto;
use std::mem::{align_of, size_of};

use crate::state_id::StateID;

/// An error that occurs when serializing a DFA.
///
/// Serialization here universally refers to the process of transforming a
/// DFA into this crate's custom binary format, represented by `&[u8]`. To
/// this end, serialization is generally infallible. However, it can fail
/// when a caller-provided destination buffer is too small, or when the state
/// ID representation in use cannot be recorded by the format.
///
/// A `SerializeError` provides no introspection capabilities. Its only
/// supported operation is conversion to a human readable error message.
#[derive(Debug)]
pub struct SerializeError(SerializeErrorKind);

#[derive(Debug)]
enum SerializeErrorKind {
    BufferTooSmall { what: &'static str },
    UnsupportedStateSize { size: usize },
}

impl SerializeError {
    pub(crate) fn buffer_too_small(what: &'static str) -> SerializeError {
        SerializeError(SerializeErrorKind::BufferTooSmall { what })
    }

    fn unsupported_state_size(size: usize) -> SerializeError {
        SerializeError(SerializeErrorKind::UnsupportedStateSize { size })
    }
}

impl std::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use self::SerializeErrorKind::*;

        match self.0 {
            BufferTooSmall { what } => write!(
                f,
                "destination buffer is too small to write {}",
                what,
            ),
            UnsupportedStateSize { size } => write!(
                f,
                "state size of {} cannot be serialized \
                 (must be 1, 2, 4 or 8)",
                size,
            ),
        }
    }
}

impl std::error::Error for SerializeError {}

/// An error that occurs when deserializing a DFA.
///
/// Deserialization refers to the process of converting this crate's binary
/// format back to a DFA's in-memory representation. To the extent possible,
/// deserialization reports this error whenever that process fails: the
/// buffer is rejected wholesale and no partial DFA is ever returned.
///
/// A `DeserializeError` provides no introspection capabilities. Its only
/// supported operation is conversion to a human readable error message.
#[derive(Debug)]
pub struct DeserializeError(DeserializeErrorKind);

#[derive(Debug)]
enum DeserializeErrorKind {
    Generic { msg: &'static str },
    BufferTooSmall { what: &'static str },
    InvalidUsize { what: &'static str },
    VersionMismatch { expected: u16, found: u16 },
    EndianMismatch { expected: u16, found: u16 },
    StateSizeMismatch { expected: u8, found: u8 },
    AlignmentMismatch { alignment: u64, address: u64 },
    LabelMismatch { expected: &'static str },
    ArithmeticOverflow { what: &'static str },
}

impl DeserializeError {
    pub(crate) fn generic(msg: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::Generic { msg })
    }

    pub(crate) fn buffer_too_small(what: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::BufferTooSmall { what })
    }

    pub(crate) fn invalid_usize(what: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::InvalidUsize { what })
    }

    fn version_mismatch(expected: u16, found: u16) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::VersionMismatch {
            expected,
            found,
        })
    }

    fn endian_mismatch(expected: u16, found: u16) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::EndianMismatch {
            expected,
            found,
        })
    }

    fn state_size_mismatch(expected: u8, found: u8) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::StateSizeMismatch {
            expected,
            found,
        })
    }

    fn alignment_mismatch(alignment: u64, address: u64) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::AlignmentMismatch {
            alignment,
            address,
        })
    }

    fn label_mismatch(expected: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::LabelMismatch { expected })
    }

    pub(crate) fn arithmetic_overflow(what: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::ArithmeticOverflow { what })
    }
}

impl std::error::Error for DeserializeError {}

impl std::fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use self::DeserializeErrorKind::*;

        match self.0 {
            Generic { msg } => write!(f, "{}", msg),
            BufferTooSmall { what } => {
                write!(f, "buffer is too small to read {}", what)
            }
            InvalidUsize { what } => {
                write!(f, "{} is too big to fit in a usize", what)
            }
            VersionMismatch { expected, found } => write!(
                f,
                "unsupported version: \
                 expected version {} but found version {}",
                expected, found,
            ),
            EndianMismatch { expected, found } => write!(
                f,
                "endianness mismatch: expected 0x{:X} but got 0x{:X}. \
                 (Are you trying to load a DFA serialized with a different \
                 endianness?)",
                expected, found,
            ),
            StateSizeMismatch { expected, found } => write!(
                f,
                "state size mismatch: caller requested a state size of {}, \
                 but serialized DFA has a state size of {}",
                expected, found,
            ),
            AlignmentMismatch { alignment, address } => write!(
                f,
                "alignment mismatch: serialized DFA starts at address \
                 0x{:X}, which is not aligned to a {} byte boundary",
                address, alignment,
            ),
            LabelMismatch { expected } => write!(
                f,
                "label mismatch: start of serialized DFA should contain a \
                 NUL terminated {:?} label, but a different label was found",
                expected,
            ),
            ArithmeticOverflow { what } => {
                write!(f, "arithmetic overflow for {}", what)
            }
        }
    }
}

/// Checks that the given slice has an alignment that matches `S`.
///
/// Since `S` is guaranteed to be one of {u8, u16, u32, u64, usize}, it
/// follows that if the given slice has the same alignment as `S`, then it
/// can be safely cast to a `&[S]` (assuming a correct length).
pub fn check_alignment<S: StateID>(
    slice: &[u8],
) -> Result<(), DeserializeError> {
    let alignment = align_of::<S>() as u64;
    let address = slice.as_ptr() as u64;
    if address % alignment == 0 {
        return Ok(());
    }
    Err(DeserializeError::alignment_mismatch(alignment, address))
}

/// Reads a possibly empty amount of padding, up to 7 bytes, from the
/// beginning of the given slice. All padding bytes must be NUL bytes.
///
/// This is useful because it can be necessary to pad the beginning of a
/// serialized DFA with NUL bytes to ensure that it starts at a correctly
/// aligned address. These padding bytes come immediately before the label.
///
/// This returns the number of bytes read from the given slice.
pub fn skip_initial_padding(slice: &[u8]) -> usize {
    let mut nread = 0;
    while nread < 7 && nread < slice.len() && slice[nread] == 0 {
        nread += 1;
    }
    nread
}

/// Allocate a byte buffer of the given size, along with some initial padding
/// such that `buf[padding..]` has the same alignment as `S`. In particular,
/// callers should treat the first N bytes (second return value) as padding
/// bytes that must not be overwritten. In all cases, the following identity
/// holds:
///
/// ```ignore
/// let (buf, padding) = alloc_aligned_buffer(SIZE);
/// assert_eq!(SIZE, buf[padding..].len());
/// ```
///
/// In practice, padding is often zero.
pub fn alloc_aligned_buffer<S: StateID>(size: usize) -> (Vec<u8>, usize) {
    // This is a kludge because there's no easy way to allocate a Vec<u8> with
    // an alignment guaranteed to be greater than 1. We could create a
    // Vec<u64>, but this cannot be safely transmuted to a Vec<u8> without
    // concern, since reallocing or dropping the Vec<u8> is UB (different
    // alignment than the initial allocation).
    let mut buf = vec![0; size];
    let align = align_of::<S>();
    let address = buf.as_ptr() as usize;
    if address % align == 0 {
        return (buf, 0);
    }
    // Allocators in practice appear to always return addresses aligned to
    // at least 8 bytes, even when the alignment requirement is smaller, so
    // this path is hard to exercise. A feeble attempt at ensuring
    // correctness is provided with asserts.
    let padding = ((address & !0b111).checked_add(8).unwrap())
        .checked_sub(address)
        .unwrap();
    assert!(padding <= 7, "padding of {} is bigger than 7", padding);
    buf.extend(std::iter::repeat(0).take(padding));
    assert_eq!(size + padding, buf.len());
    assert_eq!(
        0,
        buf[padding..].as_ptr() as usize % align,
        "expected end of initial padding to be aligned to {}",
        align,
    );
    (buf, padding)
}

/// Reads a NUL terminated label starting at the beginning of the given
/// slice.
///
/// If a NUL terminated label could not be found, then an error is returned.
/// Similarly, if a label is found but doesn't match the expected label, then
/// an error is returned.
///
/// Upon success, the total number of bytes read (including padding bytes) is
/// returned.
pub fn read_label(
    slice: &[u8],
    expected_label: &'static str,
) -> Result<usize, DeserializeError> {
    // Set an upper bound on how many bytes we scan for a NUL. Since no label
    // in this crate is longer than 256 bytes, if we can't find one within
    // that range, then we have corrupted data.
    let first_nul =
        slice[..cmp::min(slice.len(), 256)].iter().position(|&b| b == 0);
    let first_nul = match first_nul {
        Some(first_nul) => first_nul,
        None => {
            return Err(DeserializeError::generic(
                "could not find NUL terminated label \
                 at start of serialized DFA",
            ));
        }
    };
    let len = first_nul + padding_len(first_nul);
    if slice.len() < len {
        return Err(DeserializeError::generic(
            "could not find properly sized label at start of serialized DFA",
        ));
    }
    if expected_label.as_bytes() != &slice[..first_nul] {
        return Err(DeserializeError::label_mismatch(expected_label));
    }
    Ok(len)
}

/// Writes the given label to the buffer as a NUL terminated string. The
/// label given must not contain NUL, otherwise this will panic. Similarly,
/// the label must not be longer than 255 bytes, otherwise this will panic.
///
/// Additional NUL bytes are written as necessary to ensure that the number
/// of bytes written is always a multiple of 8.
///
/// Upon success, the total number of bytes written (including padding) is
/// returned.
pub fn write_label(
    label: &str,
    dst: &mut [u8],
) -> Result<usize, SerializeError> {
    let nwrite = write_label_len(label);
    if dst.len() < nwrite {
        return Err(SerializeError::buffer_too_small("label"));
    }
    dst[..label.len()].copy_from_slice(label.as_bytes());
    for i in 0..(nwrite - label.len()) {
        dst[label.len() + i] = 0;
    }
    assert_eq!(nwrite % 8, 0);
    Ok(nwrite)
}

/// Returns the total number of bytes (including padding) that would be
/// written for the given label. This panics if the given label contains a
/// NUL byte or is longer than 255 bytes. (The size restriction exists so
/// that searching for a label during deserialization can be done in small
/// bounded space.)
pub fn write_label_len(label: &str) -> usize {
    if label.len() > 255 {
        panic!("label must not be longer than 255 bytes");
    }
    if label.as_bytes().iter().position(|&b| b == 0).is_some() {
        panic!("label must not contain NUL bytes");
    }
    let label_len = label.len() + 1; // +1 for the NUL terminator
    label_len + padding_len(label_len)
}

/// Reads the endianness mark from the beginning of the given slice and
/// confirms that the endianness of the serialized DFA matches this
/// platform's endianness. If the slice is too small or if the mark doesn't
/// read back as 0xFEFF, this returns an error.
///
/// Upon success, the total number of bytes read is returned.
pub fn read_endianness_check(slice: &[u8]) -> Result<usize, DeserializeError> {
    let n = try_read_u16(slice, "endianness check")?;
    if n != 0xFEFF {
        return Err(DeserializeError::endian_mismatch(0xFEFF, n));
    }
    Ok(write_endianness_check_len())
}

/// Writes 0xFEFF as an integer using the given endianness.
///
/// This is read during deserialization (always natively) as a check that the
/// serialized DFA's endianness is the same as the reader's.
///
/// Upon success, the total number of bytes written is returned.
pub fn write_endianness_check<E: Endian>(
    dst: &mut [u8],
) -> Result<usize, SerializeError> {
    let nwrite = write_endianness_check_len();
    if dst.len() < nwrite {
        return Err(SerializeError::buffer_too_small("endianness check"));
    }
    E::write_u16(0xFEFF, dst);
    Ok(nwrite)
}

/// Returns the number of bytes written by the endianness check.
pub fn write_endianness_check_len() -> usize {
    2
}

/// Reads a version number from the beginning of the given slice and confirms
/// that it matches the expected version number given. If the slice is too
/// small or if the version numbers aren't equivalent, this returns an error.
///
/// Upon success, the total number of bytes read is returned.
///
/// N.B. Currently, we require that the version number is exactly equivalent.
/// In the future, if the version number is bumped without a semver bump,
/// then this will need to be relaxed a bit to support older versions.
pub fn read_version(
    slice: &[u8],
    expected_version: u16,
) -> Result<usize, DeserializeError> {
    let n = try_read_u16(slice, "version")?;
    if n != expected_version {
        return Err(DeserializeError::version_mismatch(expected_version, n));
    }
    Ok(write_version_len())
}

/// Writes the given version number to the beginning of the given slice.
///
/// This is useful for writing into the header of a serialized DFA. It can be
/// read during deserialization as a sanity check to ensure that the library
/// code supports the format of the serialized DFA.
///
/// Upon success, the total number of bytes written is returned.
pub fn write_version<E: Endian>(
    version: u16,
    dst: &mut [u8],
) -> Result<usize, SerializeError> {
    let nwrite = write_version_len();
    if dst.len() < nwrite {
        return Err(SerializeError::buffer_too_small("version number"));
    }
    E::write_u16(version, dst);
    Ok(nwrite)
}

/// Returns the number of bytes written by writing the version number.
pub fn write_version_len() -> usize {
    2
}

/// Reads the state size from the beginning of the given slice and confirms
/// that it matches the size of `S`. The state size occupies a single byte
/// and must be one of 1, 2, 4 or 8.
///
/// Upon success, the total number of bytes read is returned.
pub fn read_state_size<S: StateID>(
    slice: &[u8],
) -> Result<usize, DeserializeError> {
    if slice.is_empty() {
        return Err(DeserializeError::buffer_too_small("state size"));
    }
    let found = slice[0];
    if ![1, 2, 4, 8].contains(&found) {
        return Err(DeserializeError::generic(
            "state size must be 1, 2, 4 or 8",
        ));
    }
    let expected = size_of::<S>() as u8;
    if found != expected {
        return Err(DeserializeError::state_size_mismatch(expected, found));
    }
    Ok(write_state_size_len())
}

/// Writes the size of the state ID representation (as determined by `S`) to
/// the beginning of the given slice as a single byte.
///
/// Upon success, the total number of bytes written is returned. If the size
/// of `S` is not one of 1, 2, 4 or 8, then this returns an error, since the
/// format cannot record such a representation.
pub fn write_state_size<S: StateID>(
    dst: &mut [u8],
) -> Result<usize, SerializeError> {
    let nwrite = write_state_size_len();
    if dst.len() < nwrite {
        return Err(SerializeError::buffer_too_small("state size"));
    }
    let size = size_of::<S>();
    if ![1, 2, 4, 8].contains(&size) {
        return Err(SerializeError::unsupported_state_size(size));
    }
    dst[0] = size as u8;
    Ok(nwrite)
}

/// Returns the number of bytes written by writing the state size.
pub fn write_state_size_len() -> usize {
    1
}

/// Write the given state identifier to the beginning of the given slice of
/// bytes using the specified endianness. The given slice must have length at
/// least `size_of::<S>()`, or else this panics. Upon success, the total
/// number of bytes written is returned.
pub fn write_state_id<E: Endian, S: StateID>(id: S, dst: &mut [u8]) -> usize {
    let size = size_of::<S>();
    match size {
        1 => dst[0] = id.to_usize() as u8,
        2 => E::write_u16(id.to_usize() as u16, dst),
        4 => E::write_u32(id.to_usize() as u32, dst),
        8 => E::write_u64(id.to_usize() as u64, dst),
        s => unreachable!("unsupported state size: {}", s),
    }
    size
}

/// Read a state identifier from the beginning of the given slice in native
/// endian format. The given slice must have length at least
/// `size_of::<S>()`, or else this panics.
pub fn read_state_id<S: StateID>(slice: &[u8]) -> S {
    match size_of::<S>() {
        1 => S::from_usize(slice[0] as usize),
        2 => S::from_usize(read_u16(slice) as usize),
        4 => S::from_usize(read_u32(slice) as usize),
        8 => S::from_usize(read_u64(slice) as usize),
        s => unreachable!("unsupported state size: {}", s),
    }
}

/// Try to read a u64 as a usize from the beginning of the given slice in
/// native endian format. If the slice has fewer than 8 bytes or if the
/// deserialized number cannot be represented by usize, then this returns an
/// error. The error message will include the `what` description of what is
/// being deserialized, for better error messages. `what` should be a noun in
/// singular form.
pub fn try_read_u64_as_usize(
    slice: &[u8],
    what: &'static str,
) -> Result<usize, DeserializeError> {
    if slice.len() < 8 {
        return Err(DeserializeError::buffer_too_small(what));
    }
    read_u64(slice)
        .try_into()
        .map_err(|_| DeserializeError::invalid_usize(what))
}

/// Try to read a u16 from the beginning of the given slice in native endian
/// format. If the slice has fewer than 2 bytes, then this returns an error.
/// The error message will include the `what` description of what is being
/// deserialized, for better error messages. `what` should be a noun in
/// singular form.
pub fn try_read_u16(
    slice: &[u8],
    what: &'static str,
) -> Result<u16, DeserializeError> {
    if slice.len() < 2 {
        return Err(DeserializeError::buffer_too_small(what));
    }
    Ok(read_u16(slice))
}

/// Read a u16 from the beginning of the given slice in native endian format.
/// If the slice has fewer than 2 bytes, then this panics.
#[inline(always)]
pub fn read_u16(slice: &[u8]) -> u16 {
    let bytes: [u8; 2] = slice[..2].try_into().unwrap();
    u16::from_ne_bytes(bytes)
}

/// Read a u32 from the beginning of the given slice in native endian format.
/// If the slice has fewer than 4 bytes, then this panics.
#[inline(always)]
pub fn read_u32(slice: &[u8]) -> u32 {
    let bytes: [u8; 4] = slice[..4].try_into().unwrap();
    u32::from_ne_bytes(bytes)
}

/// Read a u64 from the beginning of the given slice in native endian format.
/// If the slice has fewer than 8 bytes, then this panics.
#[inline(always)]
pub fn read_u64(slice: &[u8]) -> u64 {
    let bytes: [u8; 8] = slice[..8].try_into().unwrap();
    u64::from_ne_bytes(bytes)
}

/// Checks that the given slice has some minimal length. If it's smaller than
/// the bound given, then a "buffer too small" error is returned with `what`
/// describing what the buffer represents.
pub fn check_slice_len<T>(
    slice: &[T],
    at_least_len: usize,
    what: &'static str,
) -> Result<(), DeserializeError> {
    if slice.len() < at_least_len {
        return Err(DeserializeError::buffer_too_small(what));
    }
    Ok(())
}

/// Multiply the given numbers, and on overflow, return an error that
/// includes 'what' in the error message.
///
/// This is useful when doing arithmetic with untrusted data.
pub fn mul(
    a: usize,
    b: usize,
    what: &'static str,
) -> Result<usize, DeserializeError> {
    match a.checked_mul(b) {
        Some(c) => Ok(c),
        None => Err(DeserializeError::arithmetic_overflow(what)),
    }
}

/// Add the given numbers, and on overflow, return an error that includes
/// 'what' in the error message.
///
/// This is useful when doing arithmetic with untrusted data.
pub fn add(
    a: usize,
    b: usize,
    what: &'static str,
) -> Result<usize, DeserializeError> {
    match a.checked_add(b) {
        Some(c) => Ok(c),
        None => Err(DeserializeError::arithmetic_overflow(what)),
    }
}

/// A simple trait for writing code generic over endianness.
///
/// This is similar to what byteorder provides, but we only need a very small
/// subset.
pub trait Endian {
    /// Writes a u16 to the given destination buffer in a particular
    /// endianness. If the destination buffer has a length smaller than 2,
    /// then this panics.
    fn write_u16(n: u16, dst: &mut [u8]);

    /// Writes a u32 to the given destination buffer in a particular
    /// endianness. If the destination buffer has a length smaller than 4,
    /// then this panics.
    fn write_u32(n: u32, dst: &mut [u8]);

    /// Writes a u64 to the given destination buffer in a particular
    /// endianness. If the destination buffer has a length smaller than 8,
    /// then this panics.
    fn write_u64(n: u64, dst: &mut [u8]);
}

/// Little endian writing.
pub enum LE {}
/// Big endian writing.
pub enum BE {}

#[cfg(target_endian = "little")]
pub type NE = LE;
#[cfg(target_endian = "big")]
pub type NE = BE;

impl Endian for LE {
    fn write_u16(n: u16, dst: &mut [u8]) {
        dst[..2].copy_from_slice(&n.to_le_bytes());
    }

    fn write_u32(n: u32, dst: &mut [u8]) {
        dst[..4].copy_from_slice(&n.to_le_bytes());
    }

    fn write_u64(n: u64, dst: &mut [u8]) {
        dst[..8].copy_from_slice(&n.to_le_bytes());
    }
}

impl Endian for BE {
    fn write_u16(n: u16, dst: &mut [u8]) {
        dst[..2].copy_from_slice(&n.to_be_bytes());
    }

    fn write_u32(n: u32, dst: &mut [u8]) {
        dst[..4].copy_from_slice(&n.to_be_bytes());
    }

    fn write_u64(n: u64, dst: &mut [u8]) {
        dst[..8].copy_from_slice(&n.to_be_bytes());
    }
}

/// Returns the number of additional bytes required to add to the given
/// length in order to make the total length a multiple of 8. The return
/// value is always less than 8.
pub fn padding_len(non_padding_len: usize) -> usize {
    (8 - (non_padding_len & 0b111)) & 0b111
}
