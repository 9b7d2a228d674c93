use std::fmt;
use std::iter;
use std::mem;
use std::slice;

use crate::accel::Accel;
use crate::bytes::{self, DeserializeError, Endian, SerializeError, BE, LE, NE};
use crate::classes::ByteClasses;
use crate::dfa::DFA;
use crate::error::{Error, Result};
use crate::state_id::{dead_id, premultiply_overflow_error, StateID};

/// The size of the alphabet in a standard DFA.
///
/// Specifically, this length controls the number of transitions present in
/// each DFA state. However, when the byte class optimization is enabled,
/// then each DFA maps the space of all possible 256 byte values to at most
/// 256 distinct equivalence classes. In this case, the number of distinct
/// equivalence classes corresponds to the internal alphabet of the DFA, in
/// the sense that each DFA state has a number of transitions equal to the
/// number of equivalence classes despite supporting matching on all possible
/// byte values.
pub(crate) const ALPHABET_LEN: usize = 256;

/// The label that begins every serialized DFA, NUL padded to a multiple of
/// eight bytes.
const LABEL: &str = "clamor-regex-dense-dfa";

/// The format version of a serialized DFA. This is bumped whenever the
/// serialized representation changes in a way that old readers cannot
/// handle.
const VERSION: u16 = 1;

/// The state is a match state.
const FLAG_MATCH: u8 = 1 << 0;
/// The state is the dead state.
const FLAG_DEAD: u8 = 1 << 1;
/// The state is the start state of an unanchored automaton.
const FLAG_UNANCHORED_START: u8 = 1 << 2;

/// A dense table-based deterministic finite automaton (DFA).
///
/// A dense DFA represents the core matching primitive in this crate. That
/// is, logically, all DFAs have a single start state, zero or more match
/// states and a transition table that maps the current state and the current
/// byte of input to the next state. A DFA can use this information to
/// implement fast searching. In particular, the use of a DFA generally makes
/// the trade off that match speed is the most valuable characteristic, even
/// if building the automaton may take significant time *and* space. As such,
/// the processing of every byte of input is done with a small constant
/// number of operations that does not vary with the pattern, its size or the
/// size of the alphabet. If your needs don't line up with this trade off,
/// then a DFA may not be an adequate solution to your problem.
///
/// This crate does not compile patterns itself. A DFA is built from a
/// [`RawAutomaton`](struct.RawAutomaton.html) handed off by an external
/// pattern compiler, using a
/// [`DenseDFABuilder`](struct.DenseDFABuilder.html).
///
/// A single DFA fundamentally supports the following operations:
///
/// 1. Detection of a match.
/// 2. Location of the end of the earliest possible match.
/// 3. Location of the end of the leftmost-first match.
///
/// A notable absence from the above list of capabilities is the location of
/// the *start* of a match. In order to provide both the start and end of a
/// match, *two* DFAs are required. This functionality is provided by a
/// [`Regex`](struct.Regex.html).
///
/// # State size
///
/// A `DenseDFA` has two type parameters, `T` and `S`. `T` corresponds to
/// the type of the DFA's transition table while `S` corresponds to the
/// representation used for the DFA's state identifiers as described by the
/// [`StateID`](trait.StateID.html) trait. This type parameter is typically
/// `usize`, but other valid choices provided by this crate include `u8`,
/// `u16`, `u32` and `u64`. The primary reason for choosing a different state
/// identifier representation than the default is to reduce the amount of
/// memory used by a DFA. Note though, that if the chosen representation
/// cannot accommodate the size of your DFA, then building the DFA will fail
/// and return an error.
///
/// While the reduction in heap memory used by a DFA is one reason for
/// choosing a smaller state identifier representation, another possible
/// reason is for decreasing the serialization size of a DFA, as returned by
/// [`to_bytes_little_endian`](enum.DenseDFA.html#method.to_bytes_little_endian),
/// [`to_bytes_big_endian`](enum.DenseDFA.html#method.to_bytes_big_endian)
/// or
/// [`to_bytes_native_endian`](enum.DenseDFA.html#method.to_bytes_native_endian).
///
/// # Variants
///
/// This DFA is defined as an enumeration over the different representations
/// of its transition table. All of the variants use the same layout in
/// memory; they vary in how a state identifier and an input byte select the
/// next transition. The variant is chosen by the configuration options set
/// on [`DenseDFABuilder`](struct.DenseDFABuilder.html), and the default
/// variant is `Premultiplied`. Every search routine dispatches on the
/// variant exactly once per call, so the per byte work is free of the
/// dispatch.
///
/// # The `DFA` trait
///
/// This type implements the [`DFA`](trait.DFA.html) trait, which means it
/// can be used for searching. For example:
///
/// ```
/// use clamor_regex::{DenseDFABuilder, RawAutomaton, DFA};
///
/// # fn main() -> Result<(), clamor_regex::Error> {
/// // An automaton for the pattern `fo+`, as a pattern compiler would hand
/// // it off: state 1 scans for the first `f`, state 2 has seen `f` and
/// // state 3 has seen `fo+` and is a match state.
/// let mut transitions = vec![0; 4 * 256];
/// for b in 0..256usize {
///     let (scan, seen_f, matched) = match b as u8 {
///         b'f' => (2, 2, 0),
///         b'o' => (1, 3, 3),
///         _ => (1, 1, 0),
///     };
///     transitions[1 * 256 + b] = scan;
///     transitions[2 * 256 + b] = seen_f;
///     transitions[3 * 256 + b] = matched;
/// }
/// let dfa = DenseDFABuilder::new().build(&RawAutomaton {
///     transitions,
///     start: 1,
///     is_match: vec![false, false, false, true],
///     anchored: false,
/// })?;
/// assert_eq!(Some(8), dfa.find_leftmost(b"... fooo!!"));
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub enum DenseDFA<T: AsRef<[S]>, S: StateID> {
    /// A standard DFA that does not use premultiplication or byte classes.
    Standard(Standard<T, S>),
    /// A DFA that shrinks its alphabet to a set of equivalence classes
    /// instead of using all possible byte values. Any two bytes belong to
    /// the same equivalence class if and only if they can be used
    /// interchangeably anywhere in the DFA while never discriminating
    /// between a match and a non-match.
    ///
    /// This type of DFA can result in significant space reduction with a
    /// very small match time performance penalty.
    ByteClass(ByteClass<T, S>),
    /// A DFA that premultiplies all of its state identifiers in its
    /// transition table, and maps input bytes through byte classes exactly
    /// like the `ByteClass` variant. When the byte class optimization is
    /// disabled, the class mapping is the identity. Premultiplication
    /// trades a multiply in the search loop for a constraint on the
    /// magnitude of state identifiers.
    ///
    /// This is the default variant.
    Premultiplied(Premultiplied<T, S>),
}

impl<T: AsRef<[S]>, S: StateID> DenseDFA<T, S> {
    /// Create a new DFA whose match semantics are equivalent to this DFA,
    /// but attempt to use `u8` for the representation of state identifiers.
    /// If `u8` is insufficient to represent all state identifiers in this
    /// DFA, then this returns an error.
    ///
    /// This is a convenience routine for `to_sized::<u8>()`.
    pub fn to_u8(&self) -> Result<DenseDFA<Vec<u8>, u8>> {
        self.to_sized()
    }

    /// Create a new DFA whose match semantics are equivalent to this DFA,
    /// but attempt to use `u16` for the representation of state identifiers.
    /// If `u16` is insufficient to represent all state identifiers in this
    /// DFA, then this returns an error.
    ///
    /// This is a convenience routine for `to_sized::<u16>()`.
    pub fn to_u16(&self) -> Result<DenseDFA<Vec<u16>, u16>> {
        self.to_sized()
    }

    /// Create a new DFA whose match semantics are equivalent to this DFA,
    /// but attempt to use `u32` for the representation of state identifiers.
    /// If `u32` is insufficient to represent all state identifiers in this
    /// DFA, then this returns an error.
    ///
    /// This is a convenience routine for `to_sized::<u32>()`.
    #[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
    pub fn to_u32(&self) -> Result<DenseDFA<Vec<u32>, u32>> {
        self.to_sized()
    }

    /// Create a new DFA whose match semantics are equivalent to this DFA,
    /// but attempt to use `u64` for the representation of state identifiers.
    /// If `u64` is insufficient to represent all state identifiers in this
    /// DFA, then this returns an error.
    ///
    /// This is a convenience routine for `to_sized::<u64>()`.
    #[cfg(target_pointer_width = "64")]
    pub fn to_u64(&self) -> Result<DenseDFA<Vec<u64>, u64>> {
        self.to_sized()
    }

    /// Create a new DFA whose match semantics are equivalent to this DFA,
    /// but attempt to use `A` for the representation of state identifiers.
    /// If `A` is insufficient to represent all state identifiers in this
    /// DFA, then this returns an error.
    ///
    /// An alternative way to construct such a DFA is to use
    /// [`DenseDFABuilder::build_with_size`](struct.DenseDFABuilder.html#method.build_with_size).
    /// In general, picking the appropriate size upon construction is
    /// preferred, since it does the conversion in one step instead of two.
    pub fn to_sized<A: StateID>(&self) -> Result<DenseDFA<Vec<A>, A>> {
        self.repr().to_sized().map(|r| r.into_dense_dfa())
    }

    /// Create a new DFA whose match semantics are equivalent to this DFA,
    /// but with an owned transition table.
    pub fn to_owned(&self) -> DenseDFA<Vec<S>, S> {
        match *self {
            DenseDFA::Standard(ref r) => {
                DenseDFA::Standard(Standard(r.0.to_owned()))
            }
            DenseDFA::ByteClass(ref r) => {
                DenseDFA::ByteClass(ByteClass(r.0.to_owned()))
            }
            DenseDFA::Premultiplied(ref r) => {
                DenseDFA::Premultiplied(Premultiplied(r.0.to_owned()))
            }
        }
    }

    /// Serialize a DFA to raw bytes, aligned to an 8 byte boundary, in
    /// little endian format.
    ///
    /// If the state identifier representation of this DFA has a size
    /// different than 1, 2, 4 or 8 bytes, then this returns an error. All
    /// implementations of `StateID` provided by this crate satisfy this
    /// requirement.
    pub fn to_bytes_little_endian(
        &self,
    ) -> std::result::Result<Vec<u8>, SerializeError> {
        self.to_bytes::<LE>()
    }

    /// Serialize a DFA to raw bytes, aligned to an 8 byte boundary, in big
    /// endian format.
    ///
    /// If the state identifier representation of this DFA has a size
    /// different than 1, 2, 4 or 8 bytes, then this returns an error. All
    /// implementations of `StateID` provided by this crate satisfy this
    /// requirement.
    pub fn to_bytes_big_endian(
        &self,
    ) -> std::result::Result<Vec<u8>, SerializeError> {
        self.to_bytes::<BE>()
    }

    /// Serialize a DFA to raw bytes, aligned to an 8 byte boundary, in
    /// native endian format.
    ///
    /// Generally, it is better to pick an explicit endianness so that the
    /// serialized DFA is portable across machines. Deserialization always
    /// interprets the buffer in the endianness of the machine it runs on
    /// and rejects buffers whose endianness mark disagrees.
    ///
    /// Note that unless a fixed size state identifier representation is in
    /// use (such as `u16`), a serialized DFA is not necessarily portable
    /// between machines with different pointer sizes either, since the size
    /// of the representation is recorded in the buffer and checked on
    /// deserialization.
    pub fn to_bytes_native_endian(
        &self,
    ) -> std::result::Result<Vec<u8>, SerializeError> {
        self.to_bytes::<NE>()
    }

    fn to_bytes<E: Endian>(
        &self,
    ) -> std::result::Result<Vec<u8>, SerializeError> {
        let len = self.repr().write_to_len();
        let (mut buf, padding) = bytes::alloc_aligned_buffer::<S>(len);
        self.repr().write_to::<E>(&mut buf[padding..])?;
        Ok(buf)
    }

    /// Returns the number of states in this DFA.
    ///
    /// Every DFA has at least one state: the dead state.
    pub fn state_count(&self) -> usize {
        self.repr().state_count
    }

    /// Returns the number of transitions per state.
    ///
    /// When the byte class optimization is disabled, this is always `256`.
    /// Otherwise, it is the number of byte equivalence classes.
    pub fn alphabet_len(&self) -> usize {
        self.repr().alphabet_len
    }

    /// Returns the mapping from input bytes to byte equivalence classes.
    ///
    /// When the byte class optimization is disabled, this is the identity
    /// mapping.
    pub fn byte_classes(&self) -> &ByteClasses {
        &self.repr().byte_classes
    }

    /// Returns the memory usage, in bytes, of this DFA's transition table.
    ///
    /// This does **not** include the stack size used up by this DFA. To
    /// compute that, use `std::mem::size_of::<DenseDFA>()`.
    pub fn memory_usage(&self) -> usize {
        self.repr().memory_usage()
    }

    pub(crate) fn kind(&self) -> DenseDFAKind {
        match *self {
            DenseDFA::Standard(_) => DenseDFAKind::Standard,
            DenseDFA::ByteClass(_) => DenseDFAKind::ByteClass,
            DenseDFA::Premultiplied(_) => DenseDFAKind::Premultiplied,
        }
    }

    fn repr(&self) -> &Repr<T, S> {
        match *self {
            DenseDFA::Standard(ref r) => &r.0,
            DenseDFA::ByteClass(ref r) => &r.0,
            DenseDFA::Premultiplied(ref r) => &r.0,
        }
    }
}

impl<'a, S: StateID> DenseDFA<&'a [S], S> {
    /// Deserialize a DFA with a specific state identifier representation.
    ///
    /// Deserializing a DFA using this routine will never allocate heap
    /// memory. This is guaranteed by validating the entire buffer up front
    /// and then borrowing the transition table directly from it. For that to
    /// work, the transition table inside `buf` must be aligned to the size
    /// of `S`. Buffers produced by the `to_bytes` family of methods start
    /// with enough NUL padding to make this so whenever the buffer itself is
    /// 8 byte aligned, as fresh `Vec<u8>` allocations are.
    ///
    /// The validation performed here makes every operation on the returned
    /// DFA memory safe: the label, endianness mark, format version and state
    /// identifier size must all match, the per state flags must agree with
    /// the layout of the transition table, the byte class map must be in
    /// canonical form and every transition must point at a valid state.
    /// Buffers that are truncated or that carry trailing bytes are rejected.
    ///
    /// If any check fails, then this returns an error and the buffer is
    /// never used for searching.
    ///
    /// # Example
    ///
    /// ```
    /// use clamor_regex::{DenseDFABuilder, RawAutomaton, DenseDFA, DFA};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let mut transitions = vec![0; 4 * 256];
    /// # for b in 0..256usize {
    /// #     let (scan, seen_f, matched) = match b as u8 {
    /// #         b'f' => (2, 2, 0),
    /// #         b'o' => (1, 3, 3),
    /// #         _ => (1, 1, 0),
    /// #     };
    /// #     transitions[1 * 256 + b] = scan;
    /// #     transitions[2 * 256 + b] = seen_f;
    /// #     transitions[3 * 256 + b] = matched;
    /// # }
    /// # let raw = RawAutomaton {
    /// #     transitions,
    /// #     start: 1,
    /// #     is_match: vec![false, false, false, true],
    /// #     anchored: false,
    /// # };
    /// // `raw` describes the pattern `fo+`, built as in the `DenseDFA`
    /// // example.
    /// let initial = DenseDFABuilder::new().build_with_size::<u16>(&raw)?;
    /// let bytes = initial.to_bytes_native_endian()?;
    /// let dfa: DenseDFA<&[u16], u16> = DenseDFA::from_bytes(&bytes)?;
    ///
    /// assert_eq!(Some(8), dfa.find_leftmost(b"... fooo!!"));
    /// # Ok(()) }
    /// ```
    pub fn from_bytes(
        buf: &'a [u8],
    ) -> std::result::Result<DenseDFA<&'a [S], S>, DeserializeError> {
        let mut repr = Repr::from_bytes(buf)?;
        repr.validate()?;
        repr.accel = repr.start_accel();
        Ok(repr.into_dense_dfa())
    }

    /// Deserialize a DFA with a specific state identifier representation,
    /// without validating its transition table.
    ///
    /// This is like [`from_bytes`](enum.DenseDFA.html#method.from_bytes),
    /// except that it only checks the structure of the buffer (label,
    /// endianness mark, format version, state identifier size, state flags
    /// and section lengths) and skips the pass over the transition table
    /// itself. It is useful when the buffer is trusted, for example when it
    /// was written by this crate into storage that nothing else touches, and
    /// the cost of validation is unwanted.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `buf` contains a valid serialized DFA,
    /// since searching elides bounds checks when following transitions. If
    /// the transition table contains identifiers that are out of bounds,
    /// then searching may read arbitrary memory.
    pub unsafe fn from_bytes_unchecked(
        buf: &'a [u8],
    ) -> std::result::Result<DenseDFA<&'a [S], S>, DeserializeError> {
        let mut repr = Repr::from_bytes(buf)?;
        repr.accel = repr.start_accel();
        Ok(repr.into_dense_dfa())
    }
}

impl<T: AsRef<[S]>, S: StateID> fmt::Debug for DenseDFA<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DenseDFA::Standard(ref r) => {
                writeln!(f, "DenseDFA::Standard(")?;
                r.0.fmt(f)?;
            }
            DenseDFA::ByteClass(ref r) => {
                writeln!(f, "DenseDFA::ByteClass(")?;
                r.0.fmt(f)?;
            }
            DenseDFA::Premultiplied(ref r) => {
                writeln!(f, "DenseDFA::Premultiplied(")?;
                r.0.fmt(f)?;
            }
        }
        write!(f, ")")
    }
}

/// A standard dense DFA that does not use premultiplication or byte
/// classes.
///
/// Generally, this isn't as fast as a premultiplied DFA and it uses more
/// memory than a byte class DFA, but its transition table is indexed
/// directly by input bytes, which makes it the simplest variant to reason
/// about.
#[derive(Clone, Debug)]
pub struct Standard<T: AsRef<[S]>, S: StateID>(Repr<T, S>);

/// A dense DFA that shrinks its alphabet.
///
/// Alphabet shrinking is achieved by using a set of equivalence classes
/// instead of using all possible byte values. Any two bytes belong to the
/// same equivalence class if and only if they can be used interchangeably
/// anywhere in the DFA while never discriminating between a match and a
/// non-match.
///
/// This type of DFA can result in significant space reduction with a very
/// small match time performance penalty.
#[derive(Clone, Debug)]
pub struct ByteClass<T: AsRef<[S]>, S: StateID>(Repr<T, S>);

/// A dense DFA with premultiplied state identifiers.
///
/// This is the default variant. Premultiplication means that the state
/// identifiers in the transition table have already been multiplied by the
/// number of transitions per state, so that following a transition is an
/// addition and a load instead of a multiply, an addition and a load. Input
/// bytes are mapped through byte classes exactly as in the `ByteClass`
/// variant; when the byte class optimization is disabled, the class mapping
/// is the identity.
#[derive(Clone, Debug)]
pub struct Premultiplied<T: AsRef<[S]>, S: StateID>(Repr<T, S>);

impl<T: AsRef<[S]>, S: StateID> DFA for Standard<T, S> {
    type ID = S;

    #[inline]
    fn start_state(&self) -> S {
        self.0.start_state()
    }

    #[inline]
    fn is_match_state(&self, id: S) -> bool {
        self.0.is_match_state(id)
    }

    #[inline]
    fn is_dead_state(&self, id: S) -> bool {
        self.0.is_dead_state(id)
    }

    #[inline]
    fn is_match_or_dead_state(&self, id: S) -> bool {
        self.0.is_match_or_dead_state(id)
    }

    #[inline]
    fn is_anchored(&self) -> bool {
        self.0.is_anchored()
    }

    #[inline]
    fn next_state(&self, current: S, input: u8) -> S {
        let o = current.to_usize() * ALPHABET_LEN + input as usize;
        self.0.trans()[o]
    }

    #[inline]
    unsafe fn next_state_unchecked(&self, current: S, input: u8) -> S {
        let o = current.to_usize() * ALPHABET_LEN + input as usize;
        *self.0.trans().get_unchecked(o)
    }

    #[inline]
    fn start_accelerator(&self) -> &[u8] {
        self.0.accel.needles()
    }
}

impl<T: AsRef<[S]>, S: StateID> DFA for ByteClass<T, S> {
    type ID = S;

    #[inline]
    fn start_state(&self) -> S {
        self.0.start_state()
    }

    #[inline]
    fn is_match_state(&self, id: S) -> bool {
        self.0.is_match_state(id)
    }

    #[inline]
    fn is_dead_state(&self, id: S) -> bool {
        self.0.is_dead_state(id)
    }

    #[inline]
    fn is_match_or_dead_state(&self, id: S) -> bool {
        self.0.is_match_or_dead_state(id)
    }

    #[inline]
    fn is_anchored(&self) -> bool {
        self.0.is_anchored()
    }

    #[inline]
    fn next_state(&self, current: S, input: u8) -> S {
        let input = self.0.byte_classes.get(input);
        let o = current.to_usize() * self.0.alphabet_len + input as usize;
        self.0.trans()[o]
    }

    #[inline]
    unsafe fn next_state_unchecked(&self, current: S, input: u8) -> S {
        let input = self.0.byte_classes.get_unchecked(input);
        let o = current.to_usize() * self.0.alphabet_len + input as usize;
        *self.0.trans().get_unchecked(o)
    }

    #[inline]
    fn start_accelerator(&self) -> &[u8] {
        self.0.accel.needles()
    }
}

impl<T: AsRef<[S]>, S: StateID> DFA for Premultiplied<T, S> {
    type ID = S;

    #[inline]
    fn start_state(&self) -> S {
        self.0.start_state()
    }

    #[inline]
    fn is_match_state(&self, id: S) -> bool {
        self.0.is_match_state(id)
    }

    #[inline]
    fn is_dead_state(&self, id: S) -> bool {
        self.0.is_dead_state(id)
    }

    #[inline]
    fn is_match_or_dead_state(&self, id: S) -> bool {
        self.0.is_match_or_dead_state(id)
    }

    #[inline]
    fn is_anchored(&self) -> bool {
        self.0.is_anchored()
    }

    #[inline]
    fn next_state(&self, current: S, input: u8) -> S {
        let input = self.0.byte_classes.get(input);
        let o = current.to_usize() + input as usize;
        self.0.trans()[o]
    }

    #[inline]
    unsafe fn next_state_unchecked(&self, current: S, input: u8) -> S {
        let input = self.0.byte_classes.get_unchecked(input);
        let o = current.to_usize() + input as usize;
        *self.0.trans().get_unchecked(o)
    }

    #[inline]
    fn start_accelerator(&self) -> &[u8] {
        self.0.accel.needles()
    }
}

impl<T: AsRef<[S]>, S: StateID> DFA for DenseDFA<T, S> {
    type ID = S;

    #[inline]
    fn start_state(&self) -> S {
        self.repr().start_state()
    }

    #[inline]
    fn is_match_state(&self, id: S) -> bool {
        self.repr().is_match_state(id)
    }

    #[inline]
    fn is_dead_state(&self, id: S) -> bool {
        self.repr().is_dead_state(id)
    }

    #[inline]
    fn is_match_or_dead_state(&self, id: S) -> bool {
        self.repr().is_match_or_dead_state(id)
    }

    #[inline]
    fn is_anchored(&self) -> bool {
        self.repr().is_anchored()
    }

    #[inline]
    fn next_state(&self, current: S, input: u8) -> S {
        match *self {
            DenseDFA::Standard(ref r) => r.next_state(current, input),
            DenseDFA::ByteClass(ref r) => r.next_state(current, input),
            DenseDFA::Premultiplied(ref r) => r.next_state(current, input),
        }
    }

    #[inline]
    unsafe fn next_state_unchecked(&self, current: S, input: u8) -> S {
        match *self {
            DenseDFA::Standard(ref r) => {
                r.next_state_unchecked(current, input)
            }
            DenseDFA::ByteClass(ref r) => {
                r.next_state_unchecked(current, input)
            }
            DenseDFA::Premultiplied(ref r) => {
                r.next_state_unchecked(current, input)
            }
        }
    }

    #[inline]
    fn start_accelerator(&self) -> &[u8] {
        self.repr().accel.needles()
    }

    // The search routines below re-dispatch on the variant once per call,
    // so that each loop is monomorphized with its variant's transition
    // function instead of re-selecting it for every byte of input.

    #[inline(always)]
    fn is_match_at(&self, bytes: &[u8], start: usize) -> bool {
        match *self {
            DenseDFA::Standard(ref r) => r.is_match_at(bytes, start),
            DenseDFA::ByteClass(ref r) => r.is_match_at(bytes, start),
            DenseDFA::Premultiplied(ref r) => r.is_match_at(bytes, start),
        }
    }

    #[inline(always)]
    fn find_earliest_at(&self, bytes: &[u8], start: usize) -> Option<usize> {
        match *self {
            DenseDFA::Standard(ref r) => r.find_earliest_at(bytes, start),
            DenseDFA::ByteClass(ref r) => r.find_earliest_at(bytes, start),
            DenseDFA::Premultiplied(ref r) => {
                r.find_earliest_at(bytes, start)
            }
        }
    }

    #[inline(always)]
    fn find_leftmost_at(&self, bytes: &[u8], start: usize) -> Option<usize> {
        match *self {
            DenseDFA::Standard(ref r) => r.find_leftmost_at(bytes, start),
            DenseDFA::ByteClass(ref r) => r.find_leftmost_at(bytes, start),
            DenseDFA::Premultiplied(ref r) => {
                r.find_leftmost_at(bytes, start)
            }
        }
    }

    #[inline(always)]
    fn find_leftmost_rev(&self, bytes: &[u8]) -> Option<usize> {
        match *self {
            DenseDFA::Standard(ref r) => r.find_leftmost_rev(bytes),
            DenseDFA::ByteClass(ref r) => r.find_leftmost_rev(bytes),
            DenseDFA::Premultiplied(ref r) => r.find_leftmost_rev(bytes),
        }
    }
}

/// The kind of a dense DFA, as recorded by a single byte in its serialized
/// form.
#[derive(Clone, Copy, Debug)]
pub(crate) enum DenseDFAKind {
    Standard,
    ByteClass,
    Premultiplied,
}

impl DenseDFAKind {
    /// Returns true when the serialized form carries an explicit byte
    /// class map. The map is omitted for the standard kind, whose classes
    /// are always the identity.
    pub fn has_byte_class_map(&self) -> bool {
        match *self {
            DenseDFAKind::Standard => false,
            DenseDFAKind::ByteClass | DenseDFAKind::Premultiplied => true,
        }
    }

    pub fn is_premultiplied(&self) -> bool {
        match *self {
            DenseDFAKind::Premultiplied => true,
            _ => false,
        }
    }

    pub fn to_byte(&self) -> u8 {
        match *self {
            DenseDFAKind::Standard => 0,
            DenseDFAKind::ByteClass => 1,
            DenseDFAKind::Premultiplied => 2,
        }
    }

    pub fn from_byte(
        b: u8,
    ) -> std::result::Result<DenseDFAKind, DeserializeError> {
        match b {
            0 => Ok(DenseDFAKind::Standard),
            1 => Ok(DenseDFAKind::ByteClass),
            2 => Ok(DenseDFAKind::Premultiplied),
            _ => Err(DeserializeError::generic("unrecognized DFA variant")),
        }
    }
}

/// The internal representation of a dense DFA.
///
/// All of the variants in `DenseDFA` share this representation. They differ
/// only in how `next_state` turns a state identifier and an input byte into
/// an index into the transition table.
#[derive(Clone)]
pub(crate) struct Repr<T, S> {
    /// The bytes that cause a search to leave the start state, whenever
    /// there are few enough of them to hand to memchr. This is derived from
    /// the transition table when a DFA is built or deserialized; it is
    /// never serialized itself.
    accel: Accel,
    /// Whether the state identifiers in the transition table have been
    /// premultiplied by the alphabet length.
    premultiplied: bool,
    /// Whether this DFA can only match at the beginning of its input.
    anchored: bool,
    /// The initial state.
    start: S,
    /// The total number of states in this DFA. Note that a DFA always has
    /// at least one state---the dead state---even a DFA that never matches
    /// anything. In particular, the dead state always has ID 0 and is
    /// correspondingly always the first state. The dead state is never a
    /// match state.
    state_count: usize,
    /// States in a DFA have a *partial* ordering such that a match state
    /// always precedes any non-match state (except for the special dead
    /// state, which is always first).
    ///
    /// `max_match` corresponds to the last state that is a match state.
    /// This encoding has two critical benefits. Firstly, we are not
    /// required to store any additional per-state information about whether
    /// it is a match state or not. Secondly, when searching with the DFA,
    /// we can do a single comparison with `max_match` for each byte instead
    /// of two comparisons for each byte (one testing whether it is a match
    /// and the other testing whether we've reached a dead state).
    max_match: S,
    /// The total number of transitions per state, which is the number of
    /// byte equivalence classes. This is always equivalent to 256, unless
    /// the DFA was built with byte classes. It is a copy of
    /// `byte_classes.alphabet_len()` kept inline because the byte class
    /// variants index the transition table with it on every byte of input.
    alphabet_len: usize,
    /// A set of equivalence classes, where a single equivalence class
    /// represents a set of bytes that never discriminate between a match
    /// and a non-match in the DFA. Each equivalence class corresponds to
    /// a single letter in this DFA's alphabet, where the maximum number of
    /// letters is 256 (each possible value of a byte). When the byte class
    /// optimization is disabled, this is the identity mapping.
    byte_classes: ByteClasses,
    /// A contiguous region of memory representing the transition table in
    /// row-major order. The representation is dense. That is, every state
    /// has precisely the same number of transitions. The maximum number of
    /// transitions per state is 256.
    trans: T,
}

impl<S: StateID> Repr<Vec<S>, S> {
    /// Create a new DFA with the given byte classes and state count, where
    /// every transition leads to the dead state and the start state is the
    /// dead state.
    pub fn empty(
        byte_classes: ByteClasses,
        state_count: usize,
    ) -> Repr<Vec<S>, S> {
        assert!(state_count >= 1, "a DFA must have at least a dead state");
        let alphabet_len = byte_classes.alphabet_len();
        Repr {
            accel: Accel::empty(),
            premultiplied: false,
            anchored: true,
            start: dead_id(),
            state_count,
            max_match: dead_id(),
            alphabet_len,
            byte_classes,
            trans: vec![dead_id::<S>(); state_count * alphabet_len],
        }
    }

    /// Set the initial state of this DFA.
    pub fn set_start_state(&mut self, start: S) {
        assert!(start.to_usize() < self.state_count, "invalid start state");
        self.start = start;
    }

    /// Record whether this DFA can match anywhere or only at the beginning
    /// of its input.
    pub fn set_anchored(&mut self, yes: bool) {
        self.anchored = yes;
    }

    /// Set the transition for the given state on the given input byte. The
    /// byte is mapped through this DFA's byte classes.
    ///
    /// Both `from` and `to` must be unpremultiplied state identifiers.
    pub fn set_transition(&mut self, from: S, byte: u8, to: S) {
        assert!(!self.premultiplied, "cannot mutate premultiplied DFA");
        let class = self.byte_classes.get(byte) as usize;
        self.trans[from.to_usize() * self.alphabet_len + class] = to;
    }

    /// Swap the rows of the two given states in the transition table.
    ///
    /// This does not touch transitions pointing at either state.
    pub fn swap_states(&mut self, id1: S, id2: S) {
        assert!(!self.premultiplied, "cannot mutate premultiplied DFA");
        let o1 = id1.to_usize() * self.alphabet_len;
        let o2 = id2.to_usize() * self.alphabet_len;
        for b in 0..self.alphabet_len {
            self.trans.swap(o1 + b, o2 + b);
        }
    }

    /// This routine shuffles all match states in this DFA---according to
    /// the given map---to the beginning of the DFA such that every
    /// non-match state appears after every match state. (With one
    /// exception: the special dead state remains as the first state.) The
    /// given map should have length exactly equivalent to the number of
    /// states in this DFA, and the dead state must not be a match state.
    ///
    /// The purpose of doing this shuffling is to avoid the need to store
    /// additional state to determine whether a state is a match state or
    /// not. It also enables a single conditional in the core matching loop
    /// instead of two.
    ///
    /// This updates `self.max_match` to point to the last matching state.
    pub fn shuffle_match_states(&mut self, is_match: &[bool]) {
        assert!(
            !self.premultiplied,
            "cannot shuffle match states of premultiplied DFA"
        );
        assert_eq!(self.state_count, is_match.len());
        assert!(!is_match[0], "dead state cannot be a match state");

        let mut first_non_match = 1;
        while first_non_match < self.state_count && is_match[first_non_match]
        {
            first_non_match += 1;
        }

        // The dead state ID doubles as the "not swapped" marker, which
        // works because the dead state itself is never swapped.
        let mut swaps: Vec<S> = vec![dead_id(); self.state_count];
        let mut cur = self.state_count - 1;
        while cur > first_non_match {
            if is_match[cur] {
                self.swap_states(
                    S::from_usize(cur),
                    S::from_usize(first_non_match),
                );
                swaps[cur] = S::from_usize(first_non_match);
                swaps[first_non_match] = S::from_usize(cur);

                first_non_match += 1;
                while first_non_match < cur && is_match[first_non_match] {
                    first_non_match += 1;
                }
            }
            cur -= 1;
        }
        for next in self.trans.iter_mut() {
            if swaps[next.to_usize()] != dead_id() {
                *next = swaps[next.to_usize()];
            }
        }
        if swaps[self.start.to_usize()] != dead_id() {
            self.start = swaps[self.start.to_usize()];
        }
        self.max_match = S::from_usize(first_non_match - 1);
    }

    /// Multiply every state identifier in this DFA's transition table by
    /// its alphabet length, so that following a transition no longer
    /// requires a multiply.
    ///
    /// If the premultiplied form of any state identifier in this DFA does
    /// not fit into `S`, then this returns an error.
    pub fn premultiply(&mut self) -> Result<()> {
        if self.premultiplied {
            return Ok(());
        }
        premultiply_overflow_error(
            S::from_usize(self.state_count - 1),
            self.alphabet_len,
        )?;

        for next in self.trans.iter_mut() {
            *next = S::from_usize(next.to_usize() * self.alphabet_len);
        }
        self.premultiplied = true;
        self.start = S::from_usize(self.start.to_usize() * self.alphabet_len);
        self.max_match =
            S::from_usize(self.max_match.to_usize() * self.alphabet_len);
        Ok(())
    }

    /// Derive and record the bytes usable for accelerating searches while
    /// in the start state. This must be called after the transition table
    /// has settled, in particular after any shuffling or premultiplication.
    pub fn accelerate_start(&mut self) {
        self.accel = self.start_accel();
    }
}

impl<T: AsRef<[S]>, S: StateID> Repr<T, S> {
    fn trans(&self) -> &[S] {
        self.trans.as_ref()
    }

    fn start_state(&self) -> S {
        self.start
    }

    fn is_match_state(&self, id: S) -> bool {
        id <= self.max_match && id != dead_id()
    }

    fn is_dead_state(&self, id: S) -> bool {
        id == dead_id()
    }

    fn is_match_or_dead_state(&self, id: S) -> bool {
        id <= self.max_match
    }

    fn is_anchored(&self) -> bool {
        self.anchored
    }

    fn memory_usage(&self) -> usize {
        self.trans().len() * mem::size_of::<S>()
    }

    /// The state identifier of the state at the given index, taking
    /// premultiplication into account.
    fn index_to_state_id(&self, index: usize) -> S {
        if self.premultiplied {
            S::from_usize(index * self.alphabet_len)
        } else {
            S::from_usize(index)
        }
    }

    /// The flag byte recorded in the serialized form for the state at the
    /// given index.
    fn state_flags(&self, index: usize) -> u8 {
        let id = self.index_to_state_id(index);
        let mut flags = 0;
        if index == 0 {
            flags |= FLAG_DEAD;
        }
        if self.is_match_state(id) {
            flags |= FLAG_MATCH;
        }
        if !self.anchored && id == self.start {
            flags |= FLAG_UNANCHORED_START;
        }
        flags
    }

    /// Compute the set of bytes on which a search may skip ahead with
    /// memchr while in the start state.
    ///
    /// The set is non-empty only when the start state is not a match state
    /// and transitions back to itself on all but at most three distinct
    /// bytes. Under those conditions, every position that a skip jumps over
    /// would have left the automaton in the start state anyway, so no match
    /// can be missed.
    fn start_accel(&self) -> Accel {
        if self.is_match_state(self.start) {
            return Accel::empty();
        }
        let row = if self.premultiplied {
            self.start.to_usize()
        } else {
            self.start.to_usize() * self.alphabet_len
        };
        let mut accel = Accel::empty();
        for b in 0..=255u8 {
            let class = self.byte_classes.get(b) as usize;
            if self.trans()[row + class] == self.start {
                continue;
            }
            if !accel.add(b) {
                return Accel::empty();
            }
        }
        // A start state that never escapes itself, as in a DFA that cannot
        // match anything, produces an empty set here, which reads as "not
        // accelerated".
        accel
    }

    /// Wrap this representation in the DFA variant matching its layout.
    pub fn into_dense_dfa(self) -> DenseDFA<T, S> {
        match (self.premultiplied, self.byte_classes.is_singleton()) {
            (true, _) => DenseDFA::Premultiplied(Premultiplied(self)),
            (false, true) => DenseDFA::Standard(Standard(self)),
            (false, false) => DenseDFA::ByteClass(ByteClass(self)),
        }
    }

    fn kind(&self) -> DenseDFAKind {
        if self.premultiplied {
            DenseDFAKind::Premultiplied
        } else if self.byte_classes.is_singleton() {
            DenseDFAKind::Standard
        } else {
            DenseDFAKind::ByteClass
        }
    }

    fn to_owned(&self) -> Repr<Vec<S>, S> {
        Repr {
            accel: self.accel,
            premultiplied: self.premultiplied,
            anchored: self.anchored,
            start: self.start,
            state_count: self.state_count,
            max_match: self.max_match,
            alphabet_len: self.alphabet_len,
            byte_classes: self.byte_classes,
            trans: self.trans().to_vec(),
        }
    }

    /// Create a new representation whose match semantics are equivalent to
    /// this one, but using `A` for its state identifiers.
    fn to_sized<A: StateID>(&self) -> Result<Repr<Vec<A>, A>> {
        // The identifier of the last state bounds every identifier in this
        // DFA, every transition included. For premultiplied tables that
        // bound is the premultiplied form of the last state.
        let mut last = self.state_count - 1;
        if self.premultiplied {
            last *= self.alphabet_len;
        }
        if last > A::max_id() {
            return Err(Error::state_id_overflow(A::max_id()));
        }

        let mut trans = Vec::with_capacity(self.trans().len());
        for &next in self.trans() {
            trans.push(A::from_usize(next.to_usize()));
        }
        Ok(Repr {
            accel: self.accel,
            premultiplied: self.premultiplied,
            anchored: self.anchored,
            start: A::from_usize(self.start.to_usize()),
            state_count: self.state_count,
            max_match: A::from_usize(self.max_match.to_usize()),
            alphabet_len: self.alphabet_len,
            byte_classes: self.byte_classes,
            trans,
        })
    }

    /// Check that the byte class map agrees with the recorded alphabet
    /// length and that every transition in the table points at a valid
    /// state, so that searching may elide bounds checks.
    fn validate(&self) -> std::result::Result<(), DeserializeError> {
        if self.alphabet_len != self.byte_classes.alphabet_len() {
            return Err(DeserializeError::generic(
                "alphabet length does not agree with the byte class map",
            ));
        }
        for &next in &self.trans()[..self.alphabet_len] {
            if next != dead_id() {
                return Err(DeserializeError::generic(
                    "dead state contains a non-dead transition",
                ));
            }
        }
        for &next in self.trans() {
            let id = next.to_usize();
            if self.premultiplied {
                if id % self.alphabet_len != 0 {
                    return Err(DeserializeError::generic(
                        "premultiplied transition is not a multiple of the \
                         alphabet length",
                    ));
                }
                if id / self.alphabet_len >= self.state_count {
                    return Err(DeserializeError::generic(
                        "transition points past the last state",
                    ));
                }
            } else if id >= self.state_count {
                return Err(DeserializeError::generic(
                    "transition points past the last state",
                ));
            }
        }
        Ok(())
    }

    /// The number of bytes written by `write_to`, excluding any initial
    /// alignment padding.
    fn write_to_len(&self) -> usize {
        let mut len = bytes::write_label_len(LABEL)
            + bytes::write_endianness_check_len()
            + bytes::write_version_len()
            + bytes::write_state_size_len()
            + 3 // DFA variant and two bytes of padding
            + 3 * 8; // state count, alphabet length, start state
        if self.kind().has_byte_class_map() {
            len += self.byte_classes.write_to_len();
        }
        len += self.state_count + bytes::padding_len(self.state_count);
        len + self.trans().len() * mem::size_of::<S>()
    }

    /// Serialize this DFA into `dst` with the given endianness, returning
    /// the number of bytes written.
    fn write_to<E: Endian>(
        &self,
        dst: &mut [u8],
    ) -> std::result::Result<usize, SerializeError> {
        if dst.len() < self.write_to_len() {
            return Err(SerializeError::buffer_too_small("dense DFA"));
        }

        let mut nwrite = 0;
        nwrite += bytes::write_label(LABEL, &mut dst[nwrite..])?;
        nwrite += bytes::write_endianness_check::<E>(&mut dst[nwrite..])?;
        nwrite += bytes::write_version::<E>(VERSION, &mut dst[nwrite..])?;
        nwrite += bytes::write_state_size::<S>(&mut dst[nwrite..])?;
        dst[nwrite] = self.kind().to_byte();
        dst[nwrite + 1] = 0;
        dst[nwrite + 2] = 0;
        nwrite += 3;
        E::write_u64(self.state_count as u64, &mut dst[nwrite..]);
        nwrite += 8;
        E::write_u64(self.alphabet_len as u64, &mut dst[nwrite..]);
        nwrite += 8;
        E::write_u64(self.start.to_usize() as u64, &mut dst[nwrite..]);
        nwrite += 8;
        if self.kind().has_byte_class_map() {
            nwrite += self.byte_classes.write_to(&mut dst[nwrite..])?;
        }
        for index in 0..self.state_count {
            dst[nwrite] = self.state_flags(index);
            nwrite += 1;
        }
        for _ in 0..bytes::padding_len(self.state_count) {
            dst[nwrite] = 0;
            nwrite += 1;
        }
        for &next in self.trans() {
            nwrite += bytes::write_state_id::<E, S>(next, &mut dst[nwrite..]);
        }

        assert_eq!(
            self.write_to_len(),
            nwrite,
            "expected to write exactly the predicted number of bytes",
        );
        Ok(nwrite)
    }

    fn states(&self) -> StateIter<'_, S> {
        StateIter {
            alphabet_len: self.alphabet_len,
            premultiplied: self.premultiplied,
            it: self.trans().chunks(self.alphabet_len).enumerate(),
        }
    }
}

impl<'a, S: StateID> Repr<&'a [S], S> {
    /// Parse a serialized DFA from `buf`, borrowing its transition table.
    ///
    /// This checks everything about the buffer except the contents of the
    /// transition table, which `validate` covers. The caller decides
    /// whether to run validation. The resulting representation carries no
    /// acceleration; deriving it is also left to the caller, since it reads
    /// the transition table.
    fn from_bytes(
        buf: &'a [u8],
    ) -> std::result::Result<Repr<&'a [S], S>, DeserializeError> {
        let mut nread = bytes::skip_initial_padding(buf);
        bytes::check_alignment::<S>(&buf[nread..])?;
        nread += bytes::read_label(&buf[nread..], LABEL)?;
        nread += bytes::read_endianness_check(&buf[nread..])?;
        nread += bytes::read_version(&buf[nread..], VERSION)?;
        nread += bytes::read_state_size::<S>(&buf[nread..])?;

        bytes::check_slice_len(&buf[nread..], 3, "DFA variant")?;
        let kind = DenseDFAKind::from_byte(buf[nread])?;
        if buf[nread + 1] != 0 || buf[nread + 2] != 0 {
            return Err(DeserializeError::generic(
                "header padding must be zero",
            ));
        }
        nread += 3;

        let state_count =
            bytes::try_read_u64_as_usize(&buf[nread..], "state count")?;
        nread += 8;
        let alphabet_len =
            bytes::try_read_u64_as_usize(&buf[nread..], "alphabet length")?;
        nread += 8;
        let start =
            bytes::try_read_u64_as_usize(&buf[nread..], "start state")?;
        nread += 8;

        if state_count == 0 {
            return Err(DeserializeError::generic(
                "a DFA must have at least one state",
            ));
        }
        if alphabet_len == 0 || alphabet_len > ALPHABET_LEN {
            return Err(DeserializeError::generic(
                "alphabet length out of range",
            ));
        }
        // The identifier of the last state bounds every identifier this
        // DFA can contain, the start state included. Checking it now means
        // identifiers can be converted to S below without overflow.
        let last_id = if kind.is_premultiplied() {
            bytes::mul(state_count - 1, alphabet_len, "last state ID")?
        } else {
            state_count - 1
        };
        if last_id > S::max_id() {
            return Err(DeserializeError::generic(
                "state identifiers do not fit in the chosen representation",
            ));
        }
        let start_index = if kind.is_premultiplied() {
            if start % alphabet_len != 0 {
                return Err(DeserializeError::generic(
                    "premultiplied start state is not a multiple of the \
                     alphabet length",
                ));
            }
            start / alphabet_len
        } else {
            start
        };
        if start_index >= state_count {
            return Err(DeserializeError::generic(
                "start state points past the last state",
            ));
        }

        let byte_classes = if kind.has_byte_class_map() {
            let (classes, n) = ByteClasses::from_bytes(&buf[nread..])?;
            nread += n;
            classes
        } else {
            if alphabet_len != ALPHABET_LEN {
                return Err(DeserializeError::generic(
                    "standard DFA must have a full alphabet",
                ));
            }
            ByteClasses::singletons()
        };

        bytes::check_slice_len(&buf[nread..], state_count, "state flags")?;
        let flags = &buf[nread..nread + state_count];
        nread += state_count;
        let max_match_index = read_state_flags(flags, start_index)?;
        let anchored = flags[start_index] & FLAG_UNANCHORED_START == 0;

        let pad = bytes::padding_len(state_count);
        bytes::check_slice_len(&buf[nread..], pad, "state flag padding")?;
        if buf[nread..nread + pad].iter().any(|&b| b != 0) {
            return Err(DeserializeError::generic(
                "state flag padding must be zero",
            ));
        }
        nread += pad;

        let trans_count =
            bytes::mul(state_count, alphabet_len, "transition count")?;
        let table_bytes = bytes::mul(
            trans_count,
            mem::size_of::<S>(),
            "transition table size",
        )?;
        bytes::check_slice_len(
            &buf[nread..],
            table_bytes,
            "transition table",
        )?;
        let table_slice = &buf[nread..nread + table_bytes];
        bytes::check_alignment::<S>(table_slice)?;
        nread += table_bytes;
        if nread != buf.len() {
            return Err(DeserializeError::generic(
                "unexpected trailing bytes after the transition table",
            ));
        }
        // SAFETY: The length and alignment of table_slice were checked
        // above, and all bit patterns are valid for S. Whether the
        // identifiers inside point at real states is a separate question,
        // answered by `validate`.
        let trans = unsafe {
            slice::from_raw_parts(table_slice.as_ptr() as *const S, trans_count)
        };

        let max_match = if max_match_index == 0 {
            dead_id()
        } else if kind.is_premultiplied() {
            S::from_usize(max_match_index * alphabet_len)
        } else {
            S::from_usize(max_match_index)
        };
        Ok(Repr {
            accel: Accel::empty(),
            premultiplied: kind.is_premultiplied(),
            anchored,
            start: S::from_usize(start),
            state_count,
            max_match,
            alphabet_len,
            byte_classes,
            trans,
        })
    }
}

/// Check the per state flag bytes of a serialized DFA and return the index
/// of the last match state, or `0` when there are no match states.
///
/// The flags must describe a dead state at index 0 and nowhere else, a
/// single contiguous run of match states beginning at index 1, and an
/// unanchored start flag on at most the start state.
fn read_state_flags(
    flags: &[u8],
    start_index: usize,
) -> std::result::Result<usize, DeserializeError> {
    if flags[0] & FLAG_DEAD == 0 {
        return Err(DeserializeError::generic(
            "state 0 must be flagged as the dead state",
        ));
    }
    if flags[0] & FLAG_MATCH != 0 {
        return Err(DeserializeError::generic(
            "the dead state cannot be a match state",
        ));
    }
    let mut max_match_index = 0;
    let mut in_match_run = true;
    for (index, &flag) in flags.iter().enumerate() {
        if flag & !(FLAG_MATCH | FLAG_DEAD | FLAG_UNANCHORED_START) != 0 {
            return Err(DeserializeError::generic("unrecognized state flag"));
        }
        if index > 0 && flag & FLAG_DEAD != 0 {
            return Err(DeserializeError::generic(
                "only state 0 may be flagged as the dead state",
            ));
        }
        if flag & FLAG_UNANCHORED_START != 0 && index != start_index {
            return Err(DeserializeError::generic(
                "unanchored start flag on a state other than the start state",
            ));
        }
        if index == 0 {
            continue;
        }
        if flag & FLAG_MATCH != 0 {
            if !in_match_run {
                return Err(DeserializeError::generic(
                    "match states are not contiguous",
                ));
            }
            max_match_index = index;
        } else {
            in_match_run = false;
        }
    }
    Ok(max_match_index)
}

impl<T: AsRef<[S]>, S: StateID> fmt::Debug for Repr<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn state_status<T: AsRef<[S]>, S: StateID>(
            dfa: &Repr<T, S>,
            id: S,
        ) -> String {
            let mut status = vec![b' ', b' '];
            if id == dead_id() {
                status[0] = b'D';
            } else if id == dfa.start {
                status[0] = b'>';
            }
            if dfa.is_match_state(id) {
                status[1] = b'*';
            }
            String::from_utf8(status).unwrap()
        }

        for (id, state) in self.states() {
            let status = state_status(self, S::from_usize(id));
            writeln!(f, "{}{:04}: {:?}", status, id, state)?;
        }
        Ok(())
    }
}

/// An iterator over the states in a DFA's transition table, yielding the
/// identifier of each state along with a view of its transitions.
struct StateIter<'a, S> {
    alphabet_len: usize,
    premultiplied: bool,
    it: iter::Enumerate<slice::Chunks<'a, S>>,
}

impl<'a, S: StateID> Iterator for StateIter<'a, S> {
    type Item = (usize, State<'a, S>);

    fn next(&mut self) -> Option<(usize, State<'a, S>)> {
        self.it.next().map(|(index, chunk)| {
            let id = if self.premultiplied {
                index * self.alphabet_len
            } else {
                index
            };
            (id, State { transitions: chunk })
        })
    }
}

/// A view into a single state of a DFA's transition table.
struct State<'a, S> {
    transitions: &'a [S],
}

impl<'a, S: StateID> State<'a, S> {
    /// Return the transitions of this state as a sequence of ranges of
    /// alphabet units, where every unit in a range maps to the same next
    /// state.
    fn sparse_transitions(&self) -> Vec<(u8, u8, S)> {
        let mut ranges = vec![];
        let mut cur: Option<(u8, u8, S)> = None;
        for (i, &next) in self.transitions.iter().enumerate() {
            let b = i as u8;
            cur = match cur.take() {
                None => Some((b, b, next)),
                Some((start, end, prev)) => {
                    if prev == next {
                        Some((start, b, next))
                    } else {
                        ranges.push((start, end, prev));
                        Some((b, b, next))
                    }
                }
            };
        }
        if let Some(range) = cur {
            ranges.push(range);
        }
        ranges
    }
}

impl<'a, S: StateID> fmt::Debug for State<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut transitions = vec![];
        for (start, end, next) in self.sparse_transitions() {
            if next == dead_id() {
                continue;
            }
            let line = if start == end {
                format!("{} => {}", escape(start), next.to_usize())
            } else {
                format!(
                    "{}-{} => {}",
                    escape(start),
                    escape(end),
                    next.to_usize(),
                )
            };
            transitions.push(line);
        }
        write!(f, "{}", transitions.join(", "))
    }
}

/// Return the given byte as its escaped string form.
fn escape(b: u8) -> String {
    use std::ascii;

    String::from_utf8(ascii::escape_default(b).collect::<Vec<_>>()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DenseDFABuilder, RawAutomaton};
    use crate::bytes::skip_initial_padding;
    use crate::error::ErrorKind;

    /// An automaton for the pattern `fo+` with leftmost-first match
    /// semantics. State 1 scans for `f`, state 2 has seen an `f` and state
    /// 3 has seen `fo+` and is the only match state.
    fn raw_foplus() -> RawAutomaton {
        let mut transitions = vec![0; 4 * 256];
        for b in 0..256usize {
            let (scan, seen_f, matched) = match b as u8 {
                b'f' => (2, 2, 0),
                b'o' => (1, 3, 3),
                _ => (1, 1, 0),
            };
            transitions[1 * 256 + b] = scan;
            transitions[2 * 256 + b] = seen_f;
            transitions[3 * 256 + b] = matched;
        }
        RawAutomaton {
            transitions,
            start: 1,
            is_match: vec![false, false, false, true],
            anchored: false,
        }
    }

    /// An automaton that can never match anything.
    fn raw_never() -> RawAutomaton {
        RawAutomaton {
            transitions: vec![0; 256],
            start: 0,
            is_match: vec![false],
            anchored: false,
        }
    }

    fn build_all_variants(
        raw: &RawAutomaton,
    ) -> Vec<DenseDFA<Vec<usize>, usize>> {
        let mut dfas = vec![];
        for &byte_classes in &[false, true] {
            for &premultiply in &[false, true] {
                let dfa = DenseDFABuilder::new()
                    .byte_classes(byte_classes)
                    .premultiply(premultiply)
                    .build(raw)
                    .unwrap();
                dfas.push(dfa);
            }
        }
        dfas
    }

    #[test]
    fn variants_agree_on_searches() {
        let haystack = &b"maple syrup, fooood, foam"[..];
        for dfa in build_all_variants(&raw_foplus()) {
            assert_eq!(Some(18), dfa.find_leftmost(haystack));
            assert_eq!(Some(15), dfa.find_earliest(haystack));
            assert!(dfa.is_match(haystack));
            assert_eq!(None, dfa.find_leftmost(b"f off"));
        }
    }

    #[test]
    fn match_states_are_shuffled_to_the_front() {
        let dfa = DenseDFABuilder::new()
            .byte_classes(false)
            .premultiply(false)
            .build(&raw_foplus())
            .unwrap();
        let repr = dfa.repr();
        // One match state, so it must have been swapped to ID 1.
        assert_eq!(1, repr.max_match);
        assert!(repr.is_match_state(1));
        assert!(!repr.is_match_state(2));
        assert!(!repr.is_match_state(0));
        assert!(repr.is_match_or_dead_state(0));
    }

    #[test]
    fn start_state_acceleration_is_derived() {
        // The scanning state of `fo+` leaves itself only on `f`.
        let dfa = DenseDFABuilder::new().build(&raw_foplus()).unwrap();
        assert_eq!(b"f", dfa.repr().accel.needles());

        // A never matching automaton loops forever and so has nothing to
        // hand to memchr.
        let dfa = DenseDFABuilder::new().build(&raw_never()).unwrap();
        assert!(dfa.repr().accel.needles().is_empty());
        assert_eq!(None, dfa.find_leftmost(b"anything at all"));
    }

    #[test]
    fn accelerated_and_unaccelerated_searches_agree() {
        // Strip acceleration from one copy and compare on haystacks with
        // matches at various offsets.
        let dfa = DenseDFABuilder::new().build(&raw_foplus()).unwrap();
        let mut plain = dfa.clone();
        match plain {
            DenseDFA::Premultiplied(ref mut r) => r.0.accel = Accel::empty(),
            _ => unreachable!("default build must premultiply"),
        }
        let haystacks: &[&[u8]] = &[
            b"",
            b"fo",
            b"foo",
            b"xfoox",
            b"ffffoooo",
            b"no match here",
            b"ends with fo",
            b"fo.fo.fo.foo",
        ];
        for haystack in haystacks {
            assert_eq!(
                dfa.find_leftmost(haystack),
                plain.find_leftmost(haystack),
                "disagreement on {:?}",
                haystack,
            );
        }
    }

    #[test]
    fn premultiply_does_not_fit_u8() {
        // 4 states over a full 256 byte alphabet premultiply up to 768.
        let err = DenseDFABuilder::new()
            .byte_classes(false)
            .premultiply(true)
            .build_with_size::<u8>(&raw_foplus())
            .unwrap_err();
        match *err.kind() {
            ErrorKind::PremultiplyOverflow { max, requested_max } => {
                assert_eq!(255, max);
                assert_eq!(768, requested_max);
            }
            ref kind => panic!("unexpected error kind: {:?}", kind),
        }
        // Without premultiplication the same automaton fits comfortably.
        let dfa = DenseDFABuilder::new()
            .byte_classes(false)
            .premultiply(false)
            .build_with_size::<u8>(&raw_foplus())
            .unwrap();
        assert_eq!(Some(11), dfa.find_leftmost(b"businessfool"));
    }

    #[test]
    fn to_sized_checks_capacity() {
        let dfa = DenseDFABuilder::new()
            .byte_classes(false)
            .build(&raw_foplus())
            .unwrap();
        let err = dfa.to_u8().unwrap_err();
        match *err.kind() {
            ErrorKind::StateIDOverflow { max } => assert_eq!(255, max),
            ref kind => panic!("unexpected error kind: {:?}", kind),
        }
        let smaller = dfa.to_u16().unwrap();
        assert_eq!(Some(8), smaller.find_leftmost(b"... fooo!!"));
    }

    #[test]
    fn roundtrip_preserves_searches() {
        for dfa in build_all_variants(&raw_foplus()) {
            let dfa = dfa.to_u16().unwrap();
            let buf = dfa.to_bytes_native_endian().unwrap();
            let got: DenseDFA<&[u16], u16> =
                DenseDFA::from_bytes(&buf).unwrap();
            assert_eq!(Some(8), got.find_leftmost(b"... fooo!!"));
            assert_eq!(dfa.kind().to_byte(), got.kind().to_byte());
        }
    }

    #[test]
    fn foreign_endianness_is_rejected() {
        let dfa = DenseDFABuilder::new().build(&raw_foplus()).unwrap();
        let dfa = dfa.to_u16().unwrap();
        let little = dfa.to_bytes_little_endian().unwrap();
        let big = dfa.to_bytes_big_endian().unwrap();
        let read_little = DenseDFA::<&[u16], u16>::from_bytes(&little);
        let read_big = DenseDFA::<&[u16], u16>::from_bytes(&big);
        if cfg!(target_endian = "little") {
            assert!(read_little.is_ok());
            assert!(read_big.is_err());
        } else {
            assert!(read_little.is_err());
            assert!(read_big.is_ok());
        }
    }

    #[test]
    fn mangled_headers_are_rejected() {
        let dfa = DenseDFABuilder::new().build(&raw_foplus()).unwrap();
        let dfa = dfa.to_u16().unwrap();
        let buf = dfa.to_bytes_native_endian().unwrap();
        let start = skip_initial_padding(&buf);

        // Unmolested, it parses.
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&buf).is_ok());

        // A corrupted label.
        let mut bad = buf.clone();
        bad[start] = b'x';
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());

        // A bumped version.
        let mut bad = buf.clone();
        bad[start + 26] = 0xFF;
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());

        // A state identifier size that disagrees with S.
        let mut bad = buf.clone();
        bad[start + 28] = 4;
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());

        // An unrecognized DFA variant.
        let mut bad = buf.clone();
        bad[start + 29] = 9;
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());

        // Truncation and trailing garbage.
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&buf[..buf.len() - 2])
            .is_err());
        let mut bad = buf.clone();
        bad.extend_from_slice(&[0, 0]);
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());
    }

    #[test]
    fn mangled_state_flags_are_rejected() {
        let dfa = DenseDFABuilder::new().build(&raw_foplus()).unwrap();
        let dfa = dfa.to_u16().unwrap();
        let buf = dfa.to_bytes_native_endian().unwrap();
        let start = skip_initial_padding(&buf);
        // The flag section sits after the fixed header and the class map.
        let flags_at = start + 56 + 256;

        // Clearing the dead flag on state 0.
        let mut bad = buf.clone();
        bad[flags_at] = 0;
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());

        // A match run with a hole in it: state 1 is the only match state,
        // so flagging state 3 leaves a gap at state 2.
        let mut bad = buf.clone();
        bad[flags_at + 3] |= FLAG_MATCH;
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());

        // An unknown flag bit.
        let mut bad = buf.clone();
        bad[flags_at + 2] |= 1 << 7;
        assert!(DenseDFA::<&[u16], u16>::from_bytes(&bad).is_err());
    }

    #[test]
    fn unchecked_deserialization_still_reads_structure() {
        let dfa = DenseDFABuilder::new().build(&raw_foplus()).unwrap();
        let dfa = dfa.to_u16().unwrap();
        let buf = dfa.to_bytes_native_endian().unwrap();
        let got: DenseDFA<&[u16], u16> =
            unsafe { DenseDFA::from_bytes_unchecked(&buf).unwrap() };
        assert_eq!(Some(8), got.find_leftmost(b"... fooo!!"));
        assert_eq!(4, got.state_count());
    }

    #[test]
    fn debug_output_marks_special_states() {
        let dfa = DenseDFABuilder::new()
            .byte_classes(false)
            .premultiply(false)
            .build(&raw_foplus())
            .unwrap();
        let printed = format!("{:?}", dfa);
        assert!(printed.contains("DenseDFA::Standard("));
        assert!(printed.contains("D 0000"));
        assert!(printed.contains("*0001"));
        // The start state was shuffled away from 1, so its marker sits
        // elsewhere.
        assert!(printed.contains("> 0003"));
    }
}
