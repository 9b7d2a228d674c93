/*!
A low level regular expression library that searches with deterministic
finite automata.

Unlike most regex libraries, this crate does not compile patterns. It is
fed finished automata, either as raw transition tables or as serialized
blobs produced by an earlier run, and provides fast searches over them
along with the machinery a pattern compiler needs to package its output:
alphabet compression, match state layout, premultiplication and a checked
binary serialization format.

# Overview

The most important types and routines in this crate are:

* A [`RawAutomaton`] describes a deterministic automaton in the simple
  interchange form that a pattern compiler hands off to this crate.
* A [`DenseDFABuilder`] turns a raw automaton into a [`DenseDFA`],
  applying alphabet compression and premultiplication along the way.
* A [`DenseDFA`] answers searches via the [`DFA`] trait, and can be
  serialized with [`DenseDFA::to_bytes_native_endian`] (and its little
  and big endian siblings) and deserialized with
  [`DenseDFA::from_bytes`].
* A [`Regex`] pairs a forward DFA with a reverse DFA in order to report
  both the start and end of each match.

# Example: search with a regex

A regex needs two DFAs compiled from the same pattern: a forward DFA that
finds where matches end and a reverse DFA, fed the haystack backwards,
that finds where they start. This example builds both for the pattern
`fo+` by hand.

```
use clamor_regex::{DenseDFABuilder, RawAutomaton, Regex};

// One row of 256 transitions per state. State 0 is dead and state 1 is
// the start state.
fn table(states: usize, f: impl Fn(usize, u8) -> usize) -> Vec<usize> {
    let mut transitions = vec![0; states * 256];
    for state in 0..states {
        for byte in 0..256 {
            transitions[state * 256 + byte] = f(state, byte as u8);
        }
    }
    transitions
}

# fn example() -> Result<(), clamor_regex::Error> {
let builder = DenseDFABuilder::new();
// `fo+`, reading the haystack left to right.
let forward = builder.build(&RawAutomaton {
    transitions: table(4, |state, byte| match (state, byte) {
        (1, b'f') | (2, b'f') => 2,
        (2, b'o') | (3, b'o') => 3,
        (1, _) | (2, _) => 1,
        _ => 0,
    }),
    start: 1,
    is_match: vec![false, false, false, true],
    anchored: false,
})?;
// `o+f`, reading the haystack right to left to recover match starts.
let reverse = builder.build(&RawAutomaton {
    transitions: table(4, |state, byte| match (state, byte) {
        (1, b'o') | (2, b'o') => 2,
        (2, b'f') => 3,
        _ => 0,
    }),
    start: 1,
    is_match: vec![false, false, false, true],
    anchored: true,
})?;

let re = Regex::from_dfas(forward, reverse);
assert_eq!(Some((2, 5)), re.find(b"a fool!"));
# Ok(()) }; example().unwrap()
```

# Example: serialize and deserialize a DFA

A DFA built once can be written out and memory mapped or embedded later.
Deserialization with [`DenseDFA::from_bytes`] checks every header field
and every transition, so even an untrusted blob cannot make a search
misbehave.

```
use clamor_regex::{DenseDFA, DenseDFABuilder, RawAutomaton, DFA};

# fn example() -> Result<(), Box<dyn std::error::Error>> {
// A DFA for the pattern `a`.
let mut transitions = vec![0; 3 * 256];
for byte in 0..256 {
    transitions[1 * 256 + byte] = 1;
}
transitions[1 * 256 + b'a' as usize] = 2;

let dfa = DenseDFABuilder::new()
    .build(&RawAutomaton {
        transitions,
        start: 1,
        is_match: vec![false, false, true],
        anchored: false,
    })?
    .to_u16()?;

let bytes = dfa.to_bytes_native_endian()?;
let dfa: DenseDFA<&[u16], u16> = DenseDFA::from_bytes(&bytes)?;
assert_eq!(Some(3), dfa.find_leftmost(b"snapdragon"));
# Ok(()) }; example().unwrap()
```

# State identifier representations

The state identifier representation of a DFA is polymorphic, and this
crate supports `u8`, `u16`, `u32`, `u64` (on 64 bit targets) and `usize`.
Builders always produce `usize` DFAs; shrink them with
[`DenseDFA::to_u16`] and friends once built. A smaller representation can
halve or quarter the size of the transition table, but only if every
state fits. Conversion fails with [`ErrorKind::StateIDOverflow`] when it
does not, and building a premultiplied DFA fails with
[`ErrorKind::PremultiplyOverflow`] when the representation cannot hold
the largest premultiplied identifier.

# Cheap deserialization

[`DenseDFA::from_bytes`] borrows its transition table straight out of the
given buffer, so loading a DFA costs one validation scan and no copies.
The buffer must be aligned for the state identifier representation; the
`to_bytes_*` routines prepend up to seven NUL bytes so that a blob
written to disk and mapped back tends to line up. When the blob comes
from a trusted source, [`DenseDFA::from_bytes_unchecked`] skips the scan
entirely.

# Crate features

* `logging` emits diagnostics about alphabet compression and DFA sizes
  via the `log` crate.
* `capi` exposes the C interface declared in `include/clamor_regex.h`
  for use from the cdylib build.
*/

#![deny(missing_docs)]

#[cfg(not(any(
    target_pointer_width = "16",
    target_pointer_width = "32",
    target_pointer_width = "64"
)))]
compile_error!("clamor-regex currently not supported on non-{16,32,64}");

pub use crate::{
    builder::{DenseDFABuilder, RawAutomaton},
    bytes::{DeserializeError, SerializeError},
    classes::{ByteClassElements, ByteClassIter, ByteClasses},
    dense::{ByteClass, DenseDFA, Premultiplied, Standard},
    dfa::DFA,
    error::{Error, ErrorKind},
    regex::{Matches, Regex},
    state_id::StateID,
};

#[macro_use]
mod macros;

mod accel;
mod builder;
mod bytes;
mod classes;
mod dense;
mod dfa;
mod error;
#[cfg(feature = "capi")]
mod ffi;
mod regex;
mod state_id;
