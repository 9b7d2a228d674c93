use clamor_regex::{DenseDFA, DenseDFABuilder, Regex};

use crate::automata;

#[test]
fn finds_the_full_span() {
    let re = automata::foo_digits_regex();
    assert_eq!(Some((2, 10)), re.find(b"xxfoo12345yy"));
    assert_eq!(Some((0, 4)), re.find(b"foo1"));
    assert_eq!(Some((1, 5)), re.find(b"ffoo1"));
    assert_eq!(None, re.find(b"xxfooyy"));
    assert_eq!(None, re.find(b""));
}

#[test]
fn is_match_agrees_with_find() {
    let re = automata::foo_digits_regex();
    assert!(re.is_match(b"foo123"));
    assert!(re.is_match(b"a foo9"));
    assert!(!re.is_match(b"foo"));
    assert!(!re.is_match(b"fo o1"));
}

#[test]
fn find_at_respects_the_start_offset() {
    let re = automata::foo_digits_regex();
    let text = b"foo1 foo22";
    assert_eq!(Some((0, 4)), re.find_at(text, 0));
    assert_eq!(Some((5, 10)), re.find_at(text, 1));
    assert_eq!(Some((5, 10)), re.find_at(text, 5));
    assert_eq!(None, re.find_at(text, 6));
}

#[test]
fn iterates_non_overlapping_matches() {
    let re = automata::foo_digits_regex();
    let matches: Vec<(usize, usize)> =
        re.find_iter(b"foo1 foo22 foo333").collect();
    assert_eq!(vec![(0, 4), (5, 10), (11, 17)], matches);
}

#[test]
fn empty_matches_have_equal_start_and_end() {
    let builder = DenseDFABuilder::new();
    let fwd = builder.build(&automata::a_star(false)).unwrap();
    let rev = builder.build(&automata::a_star(true)).unwrap();
    let re = Regex::from_dfas(fwd, rev);

    assert_eq!(Some((0, 0)), re.find(b"bbb"));
    assert_eq!(Some((0, 2)), re.find(b"aab"));
    let empties: Vec<(usize, usize)> = re.find_iter(b"bab").collect();
    assert_eq!(vec![(0, 0), (1, 2), (3, 3)], empties);
}

#[test]
fn never_matching_regex() {
    let builder = DenseDFABuilder::new();
    let fwd = builder.build(&automata::never()).unwrap();
    let rev = builder.build(&automata::never()).unwrap();
    let re = Regex::from_dfas(fwd, rev);

    assert!(!re.is_match(b""));
    assert!(!re.is_match(b"anything at all"));
    assert_eq!(None, re.find(b"anything at all"));
    assert_eq!(0, re.find_iter(b"anything at all").count());
}

#[test]
fn deserialized_pair_behaves_like_the_original() {
    let builder = DenseDFABuilder::new();
    let fwd = builder
        .build(&automata::foo_digits_forward())
        .unwrap()
        .to_u16()
        .unwrap();
    let rev = builder
        .build(&automata::foo_digits_reverse())
        .unwrap()
        .to_u16()
        .unwrap();
    let fwd_bytes = fwd.to_bytes_native_endian().unwrap();
    let rev_bytes = rev.to_bytes_native_endian().unwrap();

    let re = Regex::from_dfas(
        DenseDFA::<&[u16], u16>::from_bytes(&fwd_bytes).unwrap(),
        DenseDFA::<&[u16], u16>::from_bytes(&rev_bytes).unwrap(),
    );
    assert_eq!(Some((2, 10)), re.find(b"xxfoo12345yy"));
    assert_eq!(
        vec![(0, 4), (5, 10)],
        re.find_iter(b"foo1 foo22").collect::<Vec<_>>(),
    );
}
