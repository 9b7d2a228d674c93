use crate::dense::DenseDFA;
use crate::dfa::DFA;

/// A regular expression that uses deterministic finite automata for fast
/// searching.
///
/// A single DFA can only report where a match *ends*. A `Regex` therefore
/// holds two of them: a forward DFA that scans for the end of the leftmost
/// match, and a reverse DFA that recognizes the reversed pattern and scans
/// backwards from that end to recover the start. Both come from an external
/// pattern compiler; this crate only pairs them up and runs the protocol.
///
/// By default, a regex's automaton type parameter is set to
/// `DenseDFA<Vec<usize>, usize>`, which is the form produced by a
/// `DenseDFABuilder` in its default configuration.
///
/// # Example
///
/// ```
/// use clamor_regex::{DenseDFABuilder, RawAutomaton, Regex};
///
/// # fn main() -> Result<(), clamor_regex::Error> {
/// // Hand built automata for the pattern `ab`. The forward one scans for
/// // `ab` anywhere; the reverse one recognizes `ba` anchored to where the
/// // backwards scan begins.
/// fn row(f: impl Fn(u8) -> usize) -> Vec<usize> {
///     (0..256).map(|b| f(b as u8)).collect()
/// }
/// let mut fwd = row(|_| 0);
/// fwd.extend(row(|b| if b == b'a' { 2 } else { 1 }));
/// fwd.extend(row(|b| match b {
///     b'b' => 3,
///     b'a' => 2,
///     _ => 1,
/// }));
/// fwd.extend(row(|_| 0));
///
/// let mut rev = row(|_| 0);
/// rev.extend(row(|b| if b == b'b' { 2 } else { 0 }));
/// rev.extend(row(|b| if b == b'a' { 3 } else { 0 }));
/// rev.extend(row(|_| 0));
///
/// let builder = DenseDFABuilder::new();
/// let forward = builder.build(&RawAutomaton {
///     transitions: fwd,
///     start: 1,
///     is_match: vec![false, false, false, true],
///     anchored: false,
/// })?;
/// let reverse = builder.build(&RawAutomaton {
///     transitions: rev,
///     start: 1,
///     is_match: vec![false, false, false, true],
///     anchored: true,
/// })?;
///
/// let re = Regex::from_dfas(forward, reverse);
/// assert_eq!(Some((2, 4)), re.find(b"xxabyy"));
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Regex<D: DFA = DenseDFA<Vec<usize>, usize>> {
    forward: D,
    reverse: D,
}

impl<D: DFA> Regex<D> {
    /// Returns true if and only if the given bytes match.
    ///
    /// This routine may short circuit if it knows that scanning future
    /// input will never lead to a different result. In particular, if the
    /// forward DFA enters a match state or a dead state, then this routine
    /// will return `true` or `false`, respectively, without inspecting any
    /// future input. The reverse DFA is never consulted.
    pub fn is_match(&self, input: &[u8]) -> bool {
        self.is_match_at(input, 0)
    }

    /// Returns the same as `is_match`, but starts the search at the given
    /// offset.
    pub fn is_match_at(&self, input: &[u8], start: usize) -> bool {
        self.forward().is_match_at(input, start)
    }

    /// Returns the end offset of the first position at which a match is
    /// detected, which may be shorter than the leftmost first match.
    ///
    /// This routine stops scanning input in precisely the same
    /// circumstances as `is_match`. The key difference is that this routine
    /// returns the position at which it stopped scanning input if and only
    /// if a match was found. For example, an automaton for `abc|a` reports
    /// an earliest match end of `1` on `abc`, where the leftmost first
    /// match ends at `3`. If no match is found, then `None` is returned.
    ///
    /// Only the forward DFA runs, so no start offset is recovered.
    pub fn find_earliest(&self, input: &[u8]) -> Option<usize> {
        self.find_earliest_at(input, 0)
    }

    /// Returns the same as `find_earliest`, but starts the search at the
    /// given offset.
    pub fn find_earliest_at(
        &self,
        input: &[u8],
        start: usize,
    ) -> Option<usize> {
        self.forward().find_earliest_at(input, start)
    }

    /// Returns the start and end offset of the leftmost first match. If no
    /// match exists, then `None` is returned.
    ///
    /// The "leftmost first" match corresponds to the match with the
    /// smallest starting offset, but where the end offset is determined by
    /// how the pattern compiler prioritized the branches of the original
    /// pattern. For example, an automaton compiled from `Sam|Samwise`
    /// matches `Sam` in `Samwise`, while one compiled from `Samwise|Sam`
    /// matches all of it. This is how backtracking regex engines tend to
    /// behave, in contrast to POSIX-style leftmost longest matching.
    ///
    /// Empty matches are reported like any other: a successful search may
    /// return a span whose start and end are equal.
    pub fn find(&self, input: &[u8]) -> Option<(usize, usize)> {
        self.find_at(input, 0)
    }

    /// Returns the same as `find`, but starts the search at the given
    /// offset. The reported offsets remain relative to the start of
    /// `input`, not to `start`.
    pub fn find_at(
        &self,
        input: &[u8],
        start: usize,
    ) -> Option<(usize, usize)> {
        let end = match self.forward().find_leftmost_at(input, start) {
            None => return None,
            Some(end) => end,
        };
        let match_start = self
            .reverse()
            .find_leftmost_rev(&input[start..end])
            .map(|i| start + i)
            .expect("reverse search must match if forward search does");
        Some((match_start, end))
    }

    /// Returns an iterator over all non-overlapping leftmost first matches
    /// in the given bytes. If no match exists, then the iterator yields no
    /// elements.
    ///
    /// Note that if the pattern can match the empty string, then it is
    /// possible for the iterator to yield a zero-width match at a location
    /// that is not a valid UTF-8 boundary (for example, between the code
    /// units of a UTF-8 encoded codepoint). Whether that can happen is
    /// decided entirely by the automata the pattern compiler handed off.
    ///
    /// # Example
    ///
    /// An automaton for `a*` matches the empty string, so the iterator
    /// advances past positions where only an empty match exists and never
    /// reports the same position twice:
    ///
    /// ```
    /// use clamor_regex::{DenseDFABuilder, RawAutomaton, Regex};
    ///
    /// # fn main() -> Result<(), clamor_regex::Error> {
    /// // `a*` reversed is itself, so the forward and reverse automata
    /// // share a transition table and differ only in anchoring.
    /// let mut table = vec![0; 256];
    /// table.extend((0..256).map(|b| if b == b'a' as usize { 1 } else { 0 }));
    /// let automaton = |anchored| RawAutomaton {
    ///     transitions: table.clone(),
    ///     start: 1,
    ///     is_match: vec![false, true],
    ///     anchored,
    /// };
    /// let builder = DenseDFABuilder::new();
    /// let re = Regex::from_dfas(
    ///     builder.build(&automaton(false))?,
    ///     builder.build(&automaton(true))?,
    /// );
    ///
    /// let matches: Vec<(usize, usize)> = re.find_iter(b"aab").collect();
    /// assert_eq!(matches, vec![(0, 2), (3, 3)]);
    /// # Ok(()) }
    /// ```
    pub fn find_iter<'r, 't>(&'r self, input: &'t [u8]) -> Matches<'r, 't, D> {
        Matches::new(self, input)
    }
}

impl<D: DFA> Regex<D> {
    /// Build a new regex from its constituent forward and reverse DFAs.
    ///
    /// The two DFAs must come from the same compilation of the same
    /// pattern: the reverse DFA must recognize exactly the reverse of the
    /// forward DFA's language, be anchored, and prefer the longest match
    /// (so that the earliest start position is found). Every pair obtained
    /// from [`forward`](struct.Regex.html#method.forward) and
    /// [`reverse`](struct.Regex.html#method.reverse) on an existing regex
    /// satisfies this, which makes this constructor the way to reassemble
    /// a regex after serializing its halves. Pairing up unrelated DFAs may
    /// produce nonsensical spans or panic during a search.
    pub fn from_dfas(forward: D, reverse: D) -> Regex<D> {
        Regex { forward, reverse }
    }

    /// Return the underlying DFA responsible for forward matching.
    pub fn forward(&self) -> &D {
        &self.forward
    }

    /// Return the underlying DFA responsible for reverse matching.
    pub fn reverse(&self) -> &D {
        &self.reverse
    }
}

/// An iterator over all non-overlapping matches for a particular search.
///
/// The iterator yields a `(usize, usize)` value until no more matches could
/// be found. The first `usize` is the start of the match (inclusive) while
/// the second `usize` is the end of the match (exclusive).
///
/// `D` is the type of the underlying DFAs. The lifetime variables are as
/// follows:
///
/// * `'r` is the lifetime of the regular expression value itself.
/// * `'t` is the lifetime of the text being searched.
#[derive(Clone, Debug)]
pub struct Matches<'r, 't, D: DFA> {
    re: &'r Regex<D>,
    text: &'t [u8],
    last_end: usize,
    last_match: Option<usize>,
}

impl<'r, 't, D: DFA> Matches<'r, 't, D> {
    fn new(re: &'r Regex<D>, text: &'t [u8]) -> Matches<'r, 't, D> {
        Matches { re, text, last_end: 0, last_match: None }
    }
}

impl<'r, 't, D: DFA> Iterator for Matches<'r, 't, D> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.last_end > self.text.len() {
            return None;
        }
        let (s, e) = match self.re.find_at(self.text, self.last_end) {
            None => return None,
            Some((s, e)) => (s, e),
        };
        if s == e {
            // This is an empty match. To ensure we make progress, start
            // the next search at the smallest possible starting position
            // of the next match following this one.
            self.last_end = e + 1;
            // Don't accept empty matches immediately following a match.
            // Just move on to the next match.
            if Some(e) == self.last_match {
                return self.next();
            }
        } else {
            self.last_end = e;
        }
        self.last_match = Some(e);
        Some((s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DenseDFABuilder, RawAutomaton};

    fn table(
        state_count: usize,
        f: impl Fn(usize, u8) -> usize,
    ) -> Vec<usize> {
        let mut transitions = vec![0; state_count * 256];
        for state in 0..state_count {
            for byte in 0..256 {
                transitions[state * 256 + byte] = f(state, byte as u8);
            }
        }
        transitions
    }

    /// A regex for the pattern `ab`.
    fn regex_ab() -> Regex {
        let fwd = table(4, |state, byte| match (state, byte) {
            (1, b'a') => 2,
            (2, b'b') => 3,
            (2, b'a') => 2,
            (1, _) | (2, _) => 1,
            _ => 0,
        });
        let rev = table(4, |state, byte| match (state, byte) {
            (1, b'b') => 2,
            (2, b'a') => 3,
            _ => 0,
        });
        let is_match = vec![false, false, false, true];
        let builder = DenseDFABuilder::new();
        let forward = builder
            .build(&RawAutomaton {
                transitions: fwd,
                start: 1,
                is_match: is_match.clone(),
                anchored: false,
            })
            .unwrap();
        let reverse = builder
            .build(&RawAutomaton {
                transitions: rev,
                start: 1,
                is_match,
                anchored: true,
            })
            .unwrap();
        Regex::from_dfas(forward, reverse)
    }

    /// A regex for the pattern `a*`, which matches the empty string.
    fn regex_astar() -> Regex {
        let trans =
            table(2, |state, byte| match (state, byte) {
                (1, b'a') => 1,
                _ => 0,
            });
        let builder = DenseDFABuilder::new();
        let forward = builder
            .build(&RawAutomaton {
                transitions: trans.clone(),
                start: 1,
                is_match: vec![false, true],
                anchored: false,
            })
            .unwrap();
        let reverse = builder
            .build(&RawAutomaton {
                transitions: trans,
                start: 1,
                is_match: vec![false, true],
                anchored: true,
            })
            .unwrap();
        Regex::from_dfas(forward, reverse)
    }

    #[test]
    fn find_recovers_the_start() {
        let re = regex_ab();
        assert_eq!(Some((2, 4)), re.find(b"xxabyy"));
        assert_eq!(Some((1, 3)), re.find(b"aabb"));
        assert_eq!(Some((0, 2)), re.find(b"ab"));
        assert_eq!(None, re.find(b"ba"));
        assert!(re.is_match(b"xxabyy"));
        assert!(!re.is_match(b"ba"));
    }

    #[test]
    fn find_at_reports_absolute_offsets() {
        let re = regex_ab();
        assert_eq!(Some((2, 4)), re.find_at(b"abab", 1));
        assert_eq!(None, re.find_at(b"abab", 3));
    }

    #[test]
    fn empty_match_is_a_span() {
        let re = regex_astar();
        assert_eq!(Some((0, 0)), re.find(b"bbb"));
        assert_eq!(Some((0, 2)), re.find(b"aab"));
        assert!(re.is_match(b"bbb"));
    }

    #[test]
    fn iter_non_overlapping() {
        let re = regex_ab();
        let matches: Vec<(usize, usize)> =
            re.find_iter(b"abab").collect();
        assert_eq!(matches, vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn iter_skips_empty_match_after_a_match() {
        let re = regex_astar();
        let matches: Vec<(usize, usize)> =
            re.find_iter(b"aab").collect();
        assert_eq!(matches, vec![(0, 2), (3, 3)]);
    }

    #[test]
    fn iter_yields_every_empty_position() {
        let re = regex_astar();
        let matches: Vec<(usize, usize)> =
            re.find_iter(b"bbb").collect();
        assert_eq!(matches, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }
}
