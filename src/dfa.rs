use crate::accel;
use crate::state_id::StateID;

/// A trait describing the interface of a deterministic finite automaton.
///
/// Every DFA has exactly one start state and at least one dead state (which
/// always has identifier `0`). Transitioning into the dead state means the
/// search has failed and can never recover, so implementations of this trait
/// are free to stop searching as soon as they enter it.
///
/// This trait describes a stripped down view of a DFA: a way to ask for the
/// start state, a way to step from one state to the next on an input byte,
/// and O(1) predicates classifying a state as a match state or a dead state.
/// The search routines are then provided in terms of that view, so that
/// every concrete representation shares the same search code and the same
/// semantics. Namely, all searches are a single linear scan that does one
/// table lookup per input byte.
///
/// Implementations may assume that the predicates are cheap. In particular,
/// the provided search routines check `is_match_or_dead_state` after every
/// byte, and rely on it compiling down to a single comparison.
pub trait DFA {
    /// The representation used for state identifiers in this DFA.
    type ID: StateID;

    /// Return the identifier of this DFA's start state.
    fn start_state(&self) -> Self::ID;

    /// Returns true if and only if the given identifier corresponds to a
    /// match state.
    fn is_match_state(&self, id: Self::ID) -> bool;

    /// Returns true if and only if the given identifier corresponds to a
    /// dead state. When a DFA enters a dead state, it is impossible to ever
    /// observe any other state.
    fn is_dead_state(&self, id: Self::ID) -> bool;

    /// Returns true if and only if the given identifier corresponds to
    /// either a match state or a dead state. Depending on the
    /// implementation of the DFA, this method may be used to detect both of
    /// these important conditions in a single check.
    fn is_match_or_dead_state(&self, id: Self::ID) -> bool;

    /// Returns true if and only if this DFA is anchored.
    ///
    /// An anchored DFA only permits matches beginning at the position where
    /// the search started. An unanchored DFA, in contrast, prefixes the
    /// pattern with something equivalent to `(?s:.)*?`, which permits a
    /// match to begin anywhere.
    fn is_anchored(&self) -> bool;

    /// Given the current state that this DFA is in and the next input byte,
    /// this method returns the identifier of the next state.
    fn next_state(&self, current: Self::ID, input: u8) -> Self::ID;

    /// Like `next_state`, but its implementation may look up the next state
    /// without memory safety checks such as bounds checks.
    ///
    /// # Safety
    ///
    /// Callers of this method must guarantee that `current` refers to a
    /// valid state identifier for this DFA. Implementors must, in turn,
    /// guarantee that a lookup with a valid identifier and any byte is
    /// itself valid.
    unsafe fn next_state_unchecked(&self, current: Self::ID, input: u8)
        -> Self::ID;

    /// Returns the bytes that permit accelerating the beginning of a
    /// search, if any.
    ///
    /// A non-empty return value means the start state is not a match state
    /// and loops back to itself on every byte except those returned. The
    /// provided search routines then begin by skipping (with memchr) to the
    /// first position at which one of the returned bytes occurs, since all
    /// earlier positions provably keep the DFA in its start state.
    #[inline]
    fn start_accelerator(&self) -> &[u8] {
        &[]
    }

    /// Returns true if and only if the given bytes match this DFA.
    ///
    /// This routine may short circuit if it knows that scanning future input
    /// will never lead to a different result. In particular, if a DFA enters
    /// a match state or a dead state, then this routine will return `true`
    /// or `false`, respectively, without inspecting any future input.
    #[inline]
    fn is_match(&self, bytes: &[u8]) -> bool {
        self.is_match_at(bytes, 0)
    }

    /// Returns the first position at which a match is found.
    ///
    /// This routine stops scanning input in precisely the same circumstances
    /// as `is_match`. The key difference is that this routine returns the
    /// position at which it stopped scanning input if and only if a match
    /// was found. If no match is found, then `None` is returned.
    #[inline]
    fn find_earliest(&self, bytes: &[u8]) -> Option<usize> {
        self.find_earliest_at(bytes, 0)
    }

    /// Returns the end offset of the leftmost first match. If no match
    /// exists, then `None` is returned.
    ///
    /// The "leftmost first" match corresponds to the match with the smallest
    /// starting offset, but where the end offset is determined by preferring
    /// earlier branches in the original regular expression. For example,
    /// `Sam|Samwise` will match `Sam` in `Samwise`, but `Samwise|Sam` will
    /// match `Samwise` in `Samwise`.
    ///
    /// Generally speaking, the "leftmost first" match is how most
    /// backtracking regular expressions tend to work. This is in contrast to
    /// POSIX-style regular expressions that yield "leftmost longest"
    /// matches. Namely, both `Sam|Samwise` and `Samwise|Sam` match `Samwise`
    /// when using leftmost longest semantics.
    #[inline]
    fn find_leftmost(&self, bytes: &[u8]) -> Option<usize> {
        self.find_leftmost_at(bytes, 0)
    }

    /// Returns the start offset of the leftmost first match in reverse, by
    /// searching from the end of the input towards the start of the input.
    /// If no match exists, then `None` is returned.
    ///
    /// This routine is principally useful when this DFA recognizes the
    /// reverse language of some forward DFA, in which case it recovers the
    /// starting position of a match whose ending position is already known.
    /// In general, it's unlikely to be correct to use both `find_leftmost`
    /// and `find_leftmost_rev` with the same DFA.
    #[inline]
    fn find_leftmost_rev(&self, bytes: &[u8]) -> Option<usize> {
        find_leftmost_rev(self, bytes)
    }

    /// Returns the same as `is_match`, but starts the search at the given
    /// offset.
    #[inline]
    fn is_match_at(&self, bytes: &[u8], start: usize) -> bool {
        self.find_earliest_at(bytes, start).is_some()
    }

    /// Returns the same as `find_earliest`, but starts the search at the
    /// given offset. The returned offset is absolute, i.e. measured from the
    /// beginning of `bytes`.
    #[inline]
    fn find_earliest_at(&self, bytes: &[u8], start: usize) -> Option<usize> {
        find_earliest(self, bytes, start)
    }

    /// Returns the same as `find_leftmost`, but starts the search at the
    /// given offset. The returned offset is absolute, i.e. measured from the
    /// beginning of `bytes`.
    #[inline]
    fn find_leftmost_at(&self, bytes: &[u8], start: usize) -> Option<usize> {
        find_leftmost(self, bytes, start)
    }
}

fn find_earliest<D: DFA + ?Sized>(
    dfa: &D,
    bytes: &[u8],
    start: usize,
) -> Option<usize> {
    let mut state = dfa.start_state();
    if dfa.is_match_or_dead_state(state) {
        return if dfa.is_dead_state(state) { None } else { Some(start) };
    }
    let at = accel_fwd(dfa, bytes, start);
    for (i, &b) in bytes[at..].iter().enumerate() {
        state = unsafe { dfa.next_state_unchecked(state, b) };
        if dfa.is_match_or_dead_state(state) {
            return if dfa.is_dead_state(state) {
                None
            } else {
                Some(at + i + 1)
            };
        }
    }
    None
}

fn find_leftmost<D: DFA + ?Sized>(
    dfa: &D,
    bytes: &[u8],
    start: usize,
) -> Option<usize> {
    let mut state = dfa.start_state();
    let mut last_match = if dfa.is_dead_state(state) {
        return None;
    } else if dfa.is_match_state(state) {
        Some(start)
    } else {
        None
    };
    let at = accel_fwd(dfa, bytes, start);
    for (i, &b) in bytes[at..].iter().enumerate() {
        state = unsafe { dfa.next_state_unchecked(state, b) };
        if dfa.is_match_or_dead_state(state) {
            if dfa.is_dead_state(state) {
                return last_match;
            }
            last_match = Some(at + i + 1);
        }
    }
    last_match
}

fn find_leftmost_rev<D: DFA + ?Sized>(
    dfa: &D,
    bytes: &[u8],
) -> Option<usize> {
    let mut state = dfa.start_state();
    let mut last_match = if dfa.is_dead_state(state) {
        return None;
    } else if dfa.is_match_state(state) {
        Some(bytes.len())
    } else {
        None
    };
    let at = accel_rev(dfa, bytes);
    for (i, &b) in bytes[..at].iter().enumerate().rev() {
        state = unsafe { dfa.next_state_unchecked(state, b) };
        if dfa.is_match_or_dead_state(state) {
            if dfa.is_dead_state(state) {
                return last_match;
            }
            last_match = Some(i);
        }
    }
    last_match
}

/// Returns the position at which a forward scan beginning in the start
/// state should resume. A start state with an accelerator never matches, so
/// the skipped bytes cannot contribute a match.
fn accel_fwd<D: DFA + ?Sized>(dfa: &D, bytes: &[u8], at: usize) -> usize {
    let needles = dfa.start_accelerator();
    if needles.is_empty() {
        return at;
    }
    accel::find_fwd(needles, bytes, at).unwrap_or(bytes.len())
}

/// Returns the position at which a reverse scan beginning in the start
/// state should resume, i.e. one past the last occurrence of an
/// accelerating byte.
fn accel_rev<D: DFA + ?Sized>(dfa: &D, bytes: &[u8]) -> usize {
    let needles = dfa.start_accelerator();
    if needles.is_empty() {
        return bytes.len();
    }
    match accel::find_rev(needles, bytes, bytes.len()) {
        None => 0,
        Some(i) => i + 1,
    }
}

impl<'a, T: DFA> DFA for &'a T {
    type ID = T::ID;

    #[inline]
    fn start_state(&self) -> Self::ID {
        (**self).start_state()
    }

    #[inline]
    fn is_match_state(&self, id: Self::ID) -> bool {
        (**self).is_match_state(id)
    }

    #[inline]
    fn is_dead_state(&self, id: Self::ID) -> bool {
        (**self).is_dead_state(id)
    }

    #[inline]
    fn is_match_or_dead_state(&self, id: Self::ID) -> bool {
        (**self).is_match_or_dead_state(id)
    }

    #[inline]
    fn is_anchored(&self) -> bool {
        (**self).is_anchored()
    }

    #[inline]
    fn next_state(&self, current: Self::ID, input: u8) -> Self::ID {
        (**self).next_state(current, input)
    }

    #[inline]
    unsafe fn next_state_unchecked(
        &self,
        current: Self::ID,
        input: u8,
    ) -> Self::ID {
        (**self).next_state_unchecked(current, input)
    }

    #[inline]
    fn start_accelerator(&self) -> &[u8] {
        (**self).start_accelerator()
    }
}
