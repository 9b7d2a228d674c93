use bstr::ByteSlice;
use clamor_regex::{DenseDFA, DenseDFABuilder, DFA};
use quickcheck::quickcheck;

use crate::automata;

#[test]
fn all_variants_agree_on_fixture_searches() {
    let raw = automata::foo_digits_forward();
    let dfas = automata::all_configurations(&raw);
    for &haystack in automata::HAYSTACKS {
        let expected = (
            dfas[0].1.is_match(haystack),
            dfas[0].1.find_earliest(haystack),
            dfas[0].1.find_leftmost(haystack),
        );
        for (label, dfa) in dfas.iter() {
            let got = (
                dfa.is_match(haystack),
                dfa.find_earliest(haystack),
                dfa.find_leftmost(haystack),
            );
            assert_eq!(
                expected,
                got,
                "{} build disagrees on {:?}",
                label,
                haystack.as_bstr(),
            );
        }
    }
}

#[test]
fn all_variants_agree_at_every_start_position() {
    let raw = automata::foo_digits_forward();
    let dfas = automata::all_configurations(&raw);
    let haystack: &[u8] = b"xxfoo12345yy foo77";
    for start in 0..=haystack.len() {
        let expected = dfas[0].1.find_leftmost_at(haystack, start);
        for (label, dfa) in dfas.iter() {
            assert_eq!(
                expected,
                dfa.find_leftmost_at(haystack, start),
                "{} build disagrees at start {}",
                label,
                start,
            );
        }
    }
}

#[test]
fn bytes_in_the_same_class_are_interchangeable() {
    let dfa = DenseDFABuilder::new()
        .premultiply(false)
        .build(&automata::foo_digits_forward())
        .unwrap();
    let classes = *dfa.byte_classes();
    assert!(classes.alphabet_len() < 256);
    for state in 0..dfa.state_count() {
        for b1 in 0..=255u8 {
            for b2 in 0..=255u8 {
                if classes.get(b1) == classes.get(b2) {
                    assert_eq!(
                        dfa.next_state(state, b1),
                        dfa.next_state(state, b2),
                        "state {} distinguishes 0x{:02X} and 0x{:02X}",
                        state,
                        b1,
                        b2,
                    );
                }
            }
        }
    }
}

#[test]
fn class_compression_preserves_transitions() {
    let raw = automata::foo_digits_forward();
    let plain = DenseDFABuilder::new()
        .byte_classes(false)
        .premultiply(false)
        .build(&raw)
        .unwrap();
    let compressed = DenseDFABuilder::new()
        .byte_classes(true)
        .premultiply(false)
        .build(&raw)
        .unwrap();
    assert!(compressed.alphabet_len() < plain.alphabet_len());
    for state in 0..plain.state_count() {
        for byte in 0..=255u8 {
            assert_eq!(
                plain.next_state(state, byte),
                compressed.next_state(state, byte),
                "transition from state {} on 0x{:02X} changed",
                state,
                byte,
            );
        }
    }
}

quickcheck! {
    fn prop_variants_agree(
        rows: u8,
        entropy: Vec<u8>,
        haystack: Vec<u8>
    ) -> bool {
        let raw = automata::arbitrary(rows, &entropy);
        let dfas = automata::all_configurations(&raw);
        let expected = (
            dfas[0].1.is_match(&haystack),
            dfas[0].1.find_earliest(&haystack),
            dfas[0].1.find_leftmost(&haystack),
        );
        dfas.iter().all(|(_, dfa)| {
            expected
                == (
                    dfa.is_match(&haystack),
                    dfa.find_earliest(&haystack),
                    dfa.find_leftmost(&haystack),
                )
        })
    }

    fn prop_roundtrip_preserves_searches(
        rows: u8,
        entropy: Vec<u8>,
        haystack: Vec<u8>
    ) -> bool {
        let raw = automata::arbitrary(rows, &entropy);
        let dfa = DenseDFABuilder::new()
            .build(&raw)
            .unwrap()
            .to_u16()
            .unwrap();
        let bytes = dfa.to_bytes_native_endian().unwrap();
        let back: DenseDFA<&[u16], u16> =
            DenseDFA::from_bytes(&bytes).unwrap();
        dfa.find_leftmost(&haystack) == back.find_leftmost(&haystack)
            && dfa.find_earliest(&haystack) == back.find_earliest(&haystack)
    }
}
