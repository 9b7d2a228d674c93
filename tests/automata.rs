use clamor_regex::{DenseDFA, DenseDFABuilder, RawAutomaton, Regex};

/// Haystacks that every fixture search is checked against.
pub const HAYSTACKS: &[&[u8]] = &[
    b"",
    b"foo1",
    b"xxfoo12345yy",
    b"foo foo99 foo",
    b"the food is bad",
    b"fo o1 f oo1 foo 1",
    b"\xFFfoo7\xFF",
];

/// Build a transition table with one row of 256 entries per state.
pub fn table(states: usize, f: impl Fn(usize, u8) -> usize) -> Vec<usize> {
    let mut transitions = vec![0; states * 256];
    for state in 0..states {
        for byte in 0..256 {
            transitions[state * 256 + byte] = f(state, byte as u8);
        }
    }
    transitions
}

/// The forward automaton for `foo[0-9]+` with leftmost first semantics.
pub fn foo_digits_forward() -> RawAutomaton {
    RawAutomaton {
        transitions: table(6, |state, byte| match (state, byte) {
            (1, b'f') | (2, b'f') | (3, b'f') | (4, b'f') => 2,
            (2, b'o') => 3,
            (3, b'o') => 4,
            (4, b'0'..=b'9') | (5, b'0'..=b'9') => 5,
            (1, _) | (2, _) | (3, _) | (4, _) => 1,
            _ => 0,
        }),
        start: 1,
        is_match: vec![false, false, false, false, false, true],
        anchored: false,
    }
}

/// The reverse automaton for `foo[0-9]+`, i.e. an anchored automaton for
/// `[0-9]+oof` that is fed the haystack backwards.
pub fn foo_digits_reverse() -> RawAutomaton {
    RawAutomaton {
        transitions: table(6, |state, byte| match (state, byte) {
            (1, b'0'..=b'9') | (2, b'0'..=b'9') => 2,
            (2, b'o') => 3,
            (3, b'o') => 4,
            (4, b'f') => 5,
            _ => 0,
        }),
        start: 1,
        is_match: vec![false, false, false, false, false, true],
        anchored: true,
    }
}

/// The automaton for `a*`. The same table serves both directions, since
/// `a*` reversed is itself.
pub fn a_star(anchored: bool) -> RawAutomaton {
    RawAutomaton {
        transitions: table(2, |state, byte| match (state, byte) {
            (1, b'a') => 1,
            _ => 0,
        }),
        start: 1,
        is_match: vec![false, true],
        anchored,
    }
}

/// An automaton with nothing but the dead state. It rejects everything,
/// including the empty haystack.
pub fn never() -> RawAutomaton {
    RawAutomaton {
        transitions: table(1, |_, _| 0),
        start: 0,
        is_match: vec![false],
        anchored: false,
    }
}

/// A regex for `foo[0-9]+` built with the default configuration.
pub fn foo_digits_regex() -> Regex {
    let builder = DenseDFABuilder::new();
    let fwd = builder.build(&foo_digits_forward()).unwrap();
    let rev = builder.build(&foo_digits_reverse()).unwrap();
    Regex::from_dfas(fwd, rev)
}

/// Build the given automaton under every combination of byte class
/// compression and premultiplication, labeled for error reporting.
pub fn all_configurations(
    raw: &RawAutomaton,
) -> Vec<(&'static str, DenseDFA<Vec<usize>, usize>)> {
    let mut dfas = vec![];
    for &(label, classes, premultiply) in &[
        ("standard", false, false),
        ("byte class", true, false),
        ("premultiplied", false, true),
        ("premultiplied byte class", true, true),
    ] {
        let dfa = DenseDFABuilder::new()
            .byte_classes(classes)
            .premultiply(premultiply)
            .build(raw)
            .unwrap();
        dfas.push((label, dfa));
    }
    dfas
}

/// Derive a small but otherwise arbitrary automaton from fuzz input.
///
/// Row 0 is forced to be the dead state and the start state is always
/// state 1, so the result always satisfies the builder contract.
pub fn arbitrary(rows: u8, entropy: &[u8]) -> RawAutomaton {
    let state_count = 2 + (rows as usize % 6);
    let byte_at = |i: usize| -> usize {
        if entropy.is_empty() {
            0
        } else {
            entropy[i % entropy.len()] as usize
        }
    };
    let mut transitions = vec![0; state_count * 256];
    for state in 1..state_count {
        for byte in 0..256 {
            transitions[state * 256 + byte] =
                byte_at(state * 256 + byte) % state_count;
        }
    }
    let mut is_match = vec![false; state_count];
    for state in 1..state_count {
        is_match[state] = byte_at(state) % 2 == 1;
    }
    RawAutomaton {
        transitions,
        start: 1,
        is_match,
        anchored: byte_at(0) % 2 == 1,
    }
}
