use std::cmp;
use std::collections::HashMap;
use std::fmt;

use crate::bytes::{DeserializeError, SerializeError};
use crate::state_id::StateID;

/// A representation of byte oriented equivalence classes.
///
/// This is used in a DFA to reduce the size of the transition table. Two
/// bytes belong to the same equivalence class if and only if every state in
/// the DFA transitions on them identically. Since bytes in the same class
/// are truly interchangeable, the transition table only needs one column per
/// class instead of one column per byte value.
///
/// Class identifiers are assigned in order of first appearance as bytes are
/// scanned from `0` through `255`. Note that this means the mapping is not
/// necessarily monotonic: byte `255` may well belong to class `0`.
#[derive(Clone, Copy)]
pub struct ByteClasses([u8; 256]);

impl ByteClasses {
    /// Creates a new set of equivalence classes where all bytes are mapped to
    /// the same class.
    pub fn empty() -> ByteClasses {
        ByteClasses([0; 256])
    }

    /// Creates a new set of equivalence classes where each byte belongs to
    /// its own equivalence class.
    pub fn singletons() -> ByteClasses {
        let mut classes = ByteClasses::empty();
        for i in 0..256 {
            classes.set(i as u8, i as u8);
        }
        classes
    }

    /// Computes the coarsest possible set of equivalence classes for the
    /// given transition table. The table must be in row major order with
    /// exactly 256 columns per state, where each column corresponds to the
    /// byte value equivalent to its position.
    ///
    /// Two bytes are placed into the same equivalence class if and only if
    /// their columns in the table are identical, so merging them loses no
    /// information. This computes the true minimal set of classes, unlike
    /// approximations that only merge contiguous byte ranges.
    pub fn from_table<S: StateID>(trans: &[S]) -> ByteClasses {
        assert!(
            trans.len() % 256 == 0,
            "transition table must have 256 columns per state",
        );
        let state_count = trans.len() / 256;
        let mut classes = ByteClasses::empty();
        let mut column_to_class: HashMap<Vec<S>, u8> = HashMap::new();
        for b in 0..256 {
            let mut column = Vec::with_capacity(state_count);
            for state in 0..state_count {
                column.push(trans[state * 256 + b]);
            }
            // The number of distinct columns never exceeds 256, so the
            // identifier of a fresh class always fits in a u8.
            let next_class = column_to_class.len() as u8;
            let class = *column_to_class.entry(column).or_insert(next_class);
            classes.set(b as u8, class);
        }
        classes
    }

    /// Deserializes a byte class map from the given slice. If the slice is
    /// of insufficient length or otherwise contains an impossible mapping,
    /// then an error is returned. Upon success, the number of bytes read
    /// along with the map are returned. The number of bytes read is always a
    /// multiple of 8.
    pub fn from_bytes(
        slice: &[u8],
    ) -> Result<(ByteClasses, usize), DeserializeError> {
        if slice.len() < 256 {
            return Err(DeserializeError::buffer_too_small("byte class map"));
        }
        let mut classes = ByteClasses::empty();
        for (b, &class) in slice[..256].iter().enumerate() {
            classes.set(b as u8, class);
        }
        // Check that classes are numbered in order of first appearance,
        // which is the only form this crate ever produces. This implies that
        // class identifiers are contiguous starting at 0, which the rest of
        // deserialization relies on when it bounds checks the transition
        // table against the alphabet length.
        let mut next_class = 0u16;
        for b in 0..256 {
            let class = u16::from(classes.get(b as u8));
            if class > next_class {
                return Err(DeserializeError::generic(
                    "byte classes are not numbered in order of \
                     first appearance",
                ));
            }
            if class == next_class {
                next_class += 1;
            }
        }
        Ok((classes, 256))
    }

    /// Writes this byte class map to the given byte buffer. If the given
    /// buffer is too small, then an error is returned. Upon success, the
    /// total number of bytes written is returned. The number of bytes
    /// written is guaranteed to be a multiple of 8.
    pub fn write_to(&self, dst: &mut [u8]) -> Result<usize, SerializeError> {
        let nwrite = self.write_to_len();
        if dst.len() < nwrite {
            return Err(SerializeError::buffer_too_small("byte class map"));
        }
        for b in 0..256 {
            dst[b] = self.get(b as u8);
        }
        Ok(nwrite)
    }

    /// Returns the total number of bytes written by `write_to`.
    pub fn write_to_len(&self) -> usize {
        256
    }

    /// Set the equivalence class for the given byte.
    #[inline]
    pub fn set(&mut self, byte: u8, class: u8) {
        self.0[byte as usize] = class;
    }

    /// Get the equivalence class for the given byte.
    #[inline]
    pub fn get(&self, byte: u8) -> u8 {
        self.0[byte as usize]
    }

    /// Get the equivalence class for the given byte while forcefully
    /// eliding bounds checks.
    #[inline]
    pub unsafe fn get_unchecked(&self, byte: u8) -> u8 {
        *self.0.get_unchecked(byte as usize)
    }

    /// Return the total number of elements in the alphabet represented by
    /// these equivalence classes. Equivalently, this returns the total
    /// number of equivalence classes.
    ///
    /// Since classes are numbered by first appearance rather than in
    /// ascending byte order, this is one more than the largest class
    /// identifier anywhere in the map, not one more than the class of byte
    /// `255`.
    #[inline]
    pub fn alphabet_len(&self) -> usize {
        let mut max = 0;
        for b in 0..256 {
            max = cmp::max(max, self.0[b]);
        }
        max as usize + 1
    }

    /// Returns true if and only if every byte in this class maps to its own
    /// equivalence class. Equivalently, there are 256 equivalence classes
    /// and each class contains exactly one byte.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.alphabet_len() == 256
    }

    /// Returns an iterator over all equivalence class identifiers in this
    /// set.
    pub fn iter(&self) -> ByteClassIter<'_> {
        ByteClassIter { classes: self, class: 0 }
    }

    /// Returns an iterator of the bytes in the given equivalence class.
    pub fn elements(&self, class: u8) -> ByteClassElements<'_> {
        ByteClassElements { classes: self, class, byte: 0 }
    }

    /// Returns an iterator of byte ranges in the given equivalence class.
    ///
    /// That is, a sequence of contiguous ranges are returned. When classes
    /// are derived from column equality, a class may map to several disjoint
    /// ranges.
    fn element_ranges(&self, class: u8) -> ByteClassElementRanges<'_> {
        ByteClassElementRanges { elements: self.elements(class), range: None }
    }
}

impl fmt::Debug for ByteClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_singleton() {
            write!(f, "ByteClasses({{singletons}})")
        } else {
            write!(f, "ByteClasses(")?;
            for (i, class) in self.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?} => [", class)?;
                for (start, end) in self.element_ranges(class) {
                    if start == end {
                        write!(f, "{:?}", start)?;
                    } else {
                        write!(f, "{:?}-{:?}", start, end)?;
                    }
                }
                write!(f, "]")?;
            }
            write!(f, ")")
        }
    }
}

/// An iterator over each equivalence class.
#[derive(Debug)]
pub struct ByteClassIter<'a> {
    classes: &'a ByteClasses,
    class: usize,
}

impl<'a> Iterator for ByteClassIter<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.class < self.classes.alphabet_len() {
            let class = self.class as u8;
            self.class += 1;
            Some(class)
        } else {
            None
        }
    }
}

/// An iterator over all elements in an equivalence class.
#[derive(Debug)]
pub struct ByteClassElements<'a> {
    classes: &'a ByteClasses,
    class: u8,
    byte: usize,
}

impl<'a> Iterator for ByteClassElements<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        while self.byte < 256 {
            let byte = self.byte as u8;
            self.byte += 1;
            if self.classes.get(byte) == self.class {
                return Some(byte);
            }
        }
        None
    }
}

/// An iterator over all elements in an equivalence class expressed as a
/// sequence of contiguous ranges.
#[derive(Debug)]
pub struct ByteClassElementRanges<'a> {
    elements: ByteClassElements<'a>,
    range: Option<(u8, u8)>,
}

impl<'a> Iterator for ByteClassElementRanges<'a> {
    type Item = (u8, u8);

    fn next(&mut self) -> Option<(u8, u8)> {
        loop {
            let element = match self.elements.next() {
                None => return self.range.take(),
                Some(element) => element,
            };
            match self.range.take() {
                None => {
                    self.range = Some((element, element));
                }
                Some((start, end)) => {
                    if end as usize + 1 != element as usize {
                        self.range = Some((element, element));
                        return Some((start, end));
                    }
                    self.range = Some((start, element));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A table with one row per state and 256 columns, where each state's
    // transition on a byte is given by the function.
    fn table(
        state_count: usize,
        f: impl Fn(usize, u8) -> usize,
    ) -> Vec<usize> {
        let mut trans = vec![0; state_count * 256];
        for state in 0..state_count {
            for byte in 0..256 {
                trans[state * 256 + byte] = f(state, byte as u8);
            }
        }
        trans
    }

    #[test]
    fn compress_typical() {
        // State 1 distinguishes lowercase letters from everything else,
        // state 0 distinguishes nothing.
        let trans = table(2, |state, byte| {
            if state == 1 && (b'a'..=b'z').contains(&byte) {
                1
            } else {
                0
            }
        });
        let classes = ByteClasses::from_table(&trans);
        assert_eq!(classes.alphabet_len(), 2);
        assert_eq!(classes.get(0), 0);
        assert_eq!(classes.get(b'a' - 1), 0);
        assert_eq!(classes.get(b'a'), 1);
        assert_eq!(classes.get(b'm'), 1);
        assert_eq!(classes.get(b'z'), 1);
        assert_eq!(classes.get(b'z' + 1), 0);
        assert_eq!(classes.get(255), 0);
    }

    #[test]
    fn compress_merges_disjoint_ranges() {
        // 'a' and 'z' transition identically everywhere, so they share a
        // class even though the bytes between them do not.
        let trans = table(1, |_, byte| match byte {
            b'a' | b'z' => 1,
            b'b'..=b'y' => 2,
            _ => 0,
        });
        let classes = ByteClasses::from_table(&trans);
        assert_eq!(classes.alphabet_len(), 3);
        assert_eq!(classes.get(b'a'), classes.get(b'z'));
        assert_ne!(classes.get(b'a'), classes.get(b'm'));
        assert_ne!(classes.get(b'a'), classes.get(0));
    }

    #[test]
    fn compress_not_monotonic() {
        // Byte 255 maps back to class 0 while a middle byte gets the
        // biggest class, so the alphabet length cannot be derived from the
        // class of byte 255.
        let trans = table(1, |_, byte| if byte == b'a' { 1 } else { 0 });
        let classes = ByteClasses::from_table(&trans);
        assert_eq!(classes.get(255), 0);
        assert_eq!(classes.get(b'a'), 1);
        assert_eq!(classes.alphabet_len(), 2);
    }

    #[test]
    fn compress_all_equal() {
        let trans = table(3, |_, _| 1);
        let classes = ByteClasses::from_table(&trans);
        assert_eq!(classes.alphabet_len(), 1);
        assert_eq!(classes.elements(0).count(), 256);
    }

    #[test]
    fn compress_all_distinct() {
        let trans = table(1, |_, byte| byte as usize);
        let classes = ByteClasses::from_table(&trans);
        assert_eq!(classes.alphabet_len(), 256);
        assert!(classes.is_singleton());
        for b in 0..256 {
            assert_eq!(classes.get(b as u8), b as u8);
        }
    }

    #[test]
    fn roundtrip_through_bytes() {
        let trans = table(1, |_, byte| match byte {
            b'0'..=b'9' => 1,
            b'f' => 2,
            b'o' => 3,
            _ => 0,
        });
        let classes = ByteClasses::from_table(&trans);

        let mut buf = [0; 256];
        let nwrite = classes.write_to(&mut buf).unwrap();
        assert_eq!(nwrite, 256);

        let (got, nread) = ByteClasses::from_bytes(&buf).unwrap();
        assert_eq!(nread, 256);
        for b in 0..256 {
            assert_eq!(classes.get(b as u8), got.get(b as u8));
        }
    }

    #[test]
    fn reject_classes_out_of_appearance_order() {
        // The first byte must always be in class 0.
        let mut buf = [0; 256];
        buf[0] = 1;
        assert!(ByteClasses::from_bytes(&buf).is_err());

        // Classes must be assigned without gaps.
        let mut buf = [0; 256];
        buf[10] = 2;
        assert!(ByteClasses::from_bytes(&buf).is_err());
    }

    #[test]
    fn elements_typical() {
        let trans = table(1, |_, byte| match byte {
            b'b'..=b'd' => 1,
            b'g'..=b'm' => 2,
            b'z' => 3,
            _ => 0,
        });
        let classes = ByteClasses::from_table(&trans);
        assert_eq!(classes.alphabet_len(), 4);

        let elements = classes.elements(1).collect::<Vec<_>>();
        assert_eq!(elements, vec![b'b', b'c', b'd']);

        let elements = classes.elements(2).collect::<Vec<_>>();
        assert_eq!(
            elements,
            vec![b'g', b'h', b'i', b'j', b'k', b'l', b'm'],
        );

        let elements = classes.elements(3).collect::<Vec<_>>();
        assert_eq!(elements, vec![b'z']);

        // Class 0 is everything else, in four disjoint ranges.
        let ranges = classes.element_ranges(0).collect::<Vec<_>>();
        assert_eq!(
            ranges,
            vec![(0, b'a'), (b'e', b'f'), (b'n', b'y'), (b'z' + 1, 255)],
        );
    }

    #[test]
    fn elements_singletons() {
        let classes = ByteClasses::singletons();
        assert_eq!(classes.alphabet_len(), 256);

        let elements = classes.elements(b'a').collect::<Vec<_>>();
        assert_eq!(elements, vec![b'a']);
    }

    #[test]
    fn elements_empty() {
        let classes = ByteClasses::empty();
        assert_eq!(classes.alphabet_len(), 1);

        let elements = classes.elements(0).collect::<Vec<_>>();
        assert_eq!(elements.len(), 256);
        assert_eq!(elements[0], 0);
        assert_eq!(elements[255], 255);
    }
}
