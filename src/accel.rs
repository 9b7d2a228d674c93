/*!
Search acceleration for start states.

A state is "accelerable" when it is not a match state and all but a small
number of its transitions loop back to itself. In that case, instead of
stepping the DFA one byte at a time while it sits in such a state, a search
can jump directly to the next occurrence of one of the few bytes that leave
the state. That jump is done with memchr, which is typically implemented
with vector instructions and is much faster than a byte-at-a-time loop.

This crate only ever accelerates the start state, and only at the point
where a search begins in it. The bytes skipped over provably keep the DFA
in its start state, and since an accelerable state is never a match state,
skipping them cannot change the result of any search. Acceleration is
derived from the transition table both at construction time and at
deserialization time; it is never part of the serialized form.

The set of bytes that leave the state is capped at three because that is
the most memchr can look for in a single call.
*/

/// Search for between 1 and 3 needle bytes in the given haystack, starting
/// the search at the given position. Note that when a single byte is
/// searched for, that search may be implemented with vector instructions.
pub(crate) fn find_fwd(
    needles: &[u8],
    haystack: &[u8],
    at: usize,
) -> Option<usize> {
    let bs = needles;
    let i = match needles.len() {
        1 => memchr::memchr(bs[0], &haystack[at..])?,
        2 => memchr::memchr2(bs[0], bs[1], &haystack[at..])?,
        3 => memchr::memchr3(bs[0], bs[1], bs[2], &haystack[at..])?,
        0 => panic!("cannot find with empty needles"),
        n => panic!("invalid needles length: {}", n),
    };
    Some(at + i)
}

/// Search for between 1 and 3 needle bytes in the given haystack in reverse,
/// starting the search at the given position.
pub(crate) fn find_rev(
    needles: &[u8],
    haystack: &[u8],
    at: usize,
) -> Option<usize> {
    let bs = needles;
    match needles.len() {
        1 => memchr::memrchr(bs[0], &haystack[..at]),
        2 => memchr::memrchr2(bs[0], bs[1], &haystack[..at]),
        3 => memchr::memrchr3(bs[0], bs[1], bs[2], &haystack[..at]),
        0 => panic!("cannot find with empty needles"),
        n => panic!("invalid needles length: {}", n),
    }
}

/// Accel represents a small set of accelerating bytes.
///
/// The exact representation is a sequence of 4 bytes. The first byte is the
/// length of the sequence, which is at most 3. An empty set means the state
/// is not accelerable.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Accel {
    bytes: [u8; 4],
}

impl Accel {
    /// The maximum number of accelerating bytes.
    const CAP: usize = 3;

    /// Create an empty set of accelerating bytes.
    pub fn empty() -> Accel {
        Accel { bytes: [0; 4] }
    }

    /// Attempts to add the given byte to this set. If the set is full, then
    /// this returns false and the set is left unchanged. Adding a byte that
    /// is already in the set is a no-op that returns true.
    pub fn add(&mut self, byte: u8) -> bool {
        if self.contains(byte) {
            return true;
        }
        if self.len() >= Accel::CAP {
            return false;
        }
        self.bytes[1 + self.len()] = byte;
        self.bytes[0] += 1;
        true
    }

    /// Return the number of accelerating bytes in this set.
    pub fn len(&self) -> usize {
        self.bytes[0] as usize
    }

    /// Returns true if and only if there are no accelerating bytes, which
    /// means the corresponding state is not accelerable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if and only if the given byte is in this set.
    fn contains(&self, byte: u8) -> bool {
        self.needles().contains(&byte)
    }

    /// Returns the accelerating bytes as a slice. The slice is empty when
    /// the corresponding state is not accelerable.
    pub fn needles(&self) -> &[u8] {
        &self.bytes[1..1 + self.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_caps_at_three() {
        let mut accel = Accel::empty();
        assert!(accel.is_empty());
        assert!(accel.add(b'a'));
        assert!(accel.add(b'b'));
        // Duplicates do not consume capacity.
        assert!(accel.add(b'a'));
        assert!(accel.add(b'c'));
        assert!(!accel.add(b'd'));
        assert_eq!(accel.needles(), &[b'a', b'b', b'c']);
    }

    #[test]
    fn fwd_and_rev() {
        let haystack = b"quux baz quux";
        assert_eq!(Some(5), find_fwd(b"bz", haystack, 0));
        assert_eq!(Some(7), find_fwd(b"bz", haystack, 6));
        assert_eq!(None, find_fwd(b"bz", haystack, 8));

        assert_eq!(Some(7), find_rev(b"bz", haystack, haystack.len()));
        assert_eq!(Some(5), find_rev(b"bz", haystack, 7));
        assert_eq!(None, find_rev(b"bz", haystack, 5));
    }
}
