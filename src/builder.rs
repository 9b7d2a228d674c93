use crate::classes::ByteClasses;
use crate::dense::{DenseDFA, Repr, ALPHABET_LEN};
use crate::error::{Error, Result};
use crate::state_id::{premultiply_overflow_error, StateID};

/// A builder for constructing a dense DFA from a raw automaton handoff.
///
/// This builder permits configuring two aspects of the resulting DFA's
/// representation: whether its alphabet is compressed into byte equivalence
/// classes and whether its state identifiers are premultiplied. Both options
/// are enabled by default. They impact only the size and the speed of the
/// DFA, never what it matches.
///
/// This builder always constructs a *single* DFA. As such, it can only be
/// used to build automata that either detect the presence of a match or find
/// the end location of a match. A single DFA cannot produce both the start
/// and the end of a match. For that information, pair a forward DFA with a
/// reverse DFA in a [`Regex`](struct.Regex.html).
#[derive(Clone, Debug)]
pub struct DenseDFABuilder {
    byte_classes: bool,
    premultiply: bool,
}

impl DenseDFABuilder {
    /// Create a new dense DFA builder with the default configuration.
    pub fn new() -> DenseDFABuilder {
        DenseDFABuilder { byte_classes: true, premultiply: true }
    }

    /// Build a DFA from the given raw automaton.
    ///
    /// If the handoff violates its contract, then an error is returned.
    pub fn build(
        &self,
        raw: &RawAutomaton,
    ) -> Result<DenseDFA<Vec<usize>, usize>> {
        self.build_with_size::<usize>(raw)
    }

    /// Build a DFA from the given raw automaton using a specific
    /// representation for the DFA's state IDs.
    ///
    /// If the handoff violates its contract, then an error is returned.
    ///
    /// The representation of state IDs is determined by the `S` type
    /// parameter. In general, `S` is usually one of `u8`, `u16`, `u32`,
    /// `u64` or `usize`, where `usize` is the default used for `build`. The
    /// purpose of specifying a representation for state IDs is to reduce
    /// the memory footprint of a DFA.
    ///
    /// If the automaton has more states than the chosen representation can
    /// identify, or if premultiplication is enabled and the premultiplied
    /// form of its last state identifier overflows the representation, then
    /// an error is returned before any table is built.
    pub fn build_with_size<S: StateID>(
        &self,
        raw: &RawAutomaton,
    ) -> Result<DenseDFA<Vec<S>, S>> {
        raw.check()?;

        let state_count = raw.state_count();
        if state_count - 1 > S::max_id() {
            return Err(Error::state_id_overflow(S::max_id()));
        }
        let classes = if self.byte_classes {
            ByteClasses::from_table(&raw.transitions)
        } else {
            ByteClasses::singletons()
        };
        debug!(
            "alphabet compressed from {} bytes to {} equivalence classes",
            ALPHABET_LEN,
            classes.alphabet_len(),
        );
        if self.premultiply {
            premultiply_overflow_error(
                S::from_usize(state_count - 1),
                classes.alphabet_len(),
            )?;
        }

        let mut repr: Repr<Vec<usize>, usize> =
            Repr::empty(classes, state_count);
        repr.set_start_state(raw.start);
        repr.set_anchored(raw.anchored);
        for state in 0..state_count {
            for byte in 0..ALPHABET_LEN {
                let next = raw.transitions[state * ALPHABET_LEN + byte];
                repr.set_transition(state, byte as u8, next);
            }
        }
        trace!("shuffling match states into the low identifier range");
        repr.shuffle_match_states(&raw.is_match);
        if self.premultiply {
            trace!(
                "premultiplying state identifiers by {}",
                classes.alphabet_len(),
            );
            repr.premultiply()?;
        }
        repr.accelerate_start();

        let dfa = repr.into_dense_dfa();
        debug!(
            "built a {} state dense DFA occupying {} bytes",
            dfa.state_count(),
            dfa.memory_usage(),
        );
        dfa.to_sized()
    }

    /// Shrink the size of the DFA's alphabet by mapping bytes to their
    /// equivalence classes.
    ///
    /// When enabled, the builder computes, from the raw transition table, a
    /// map from all possible bytes to their corresponding equivalence class.
    /// Two bytes share a class if and only if every state transitions on
    /// them identically, so merging them can never change what the DFA
    /// matches. For example, an automaton for the pattern `[ab]+` has two
    /// classes: one containing `a` and `b`, and one containing every other
    /// byte.
    ///
    /// The advantage of this map is that the size of the transition table
    /// shrinks from `#states * 256 * sizeof(id)` to
    /// `#states * k * sizeof(id)`, where `k` is the number of equivalence
    /// classes. The disadvantage is that every haystack byte passes through
    /// the map before it can select the next transition, which has a small
    /// match time cost.
    ///
    /// This option is enabled by default.
    pub fn byte_classes(&mut self, yes: bool) -> &mut DenseDFABuilder {
        self.byte_classes = yes;
        self
    }

    /// Premultiply state identifiers in the DFA's transition table.
    ///
    /// When enabled, state identifiers are premultiplied to point to their
    /// corresponding row in the DFA's transition table. That is, given the
    /// `i`th state, its corresponding premultiplied identifier is `i * k`
    /// where `k` is the alphabet size of the DFA. (The alphabet size is at
    /// most 256, but is in practice smaller when byte classes are enabled.)
    /// When disabled, the identifier of the `i`th state is `i`.
    ///
    /// The advantage of premultiplication is that it saves a multiplication
    /// per byte when searching with the DFA. The disadvantage is that the
    /// premultiplied identifiers require a larger integer size to represent:
    /// a 200 state DFA fits its plain identifiers into 8 bits but needs 16
    /// bits for its premultiplied ones. Overflowing the chosen
    /// representation is a build time error.
    ///
    /// This option is enabled by default.
    pub fn premultiply(&mut self, yes: bool) -> &mut DenseDFABuilder {
        self.premultiply = yes;
        self
    }
}

impl Default for DenseDFABuilder {
    fn default() -> DenseDFABuilder {
        DenseDFABuilder::new()
    }
}

/// A deterministic automaton in the raw interchange form that a pattern
/// compiler hands off to this crate.
///
/// This crate never sees pattern syntax. An external compiler parses,
/// determinizes and (optionally) minimizes a pattern, then describes the
/// result with this type: a full 256 column transition table along with the
/// start state and the per state match flags. The builder validates the
/// handoff and rejects tables that break the contract below.
///
/// The contract:
///
/// * The table is in row major order with exactly 256 columns per state,
///   so `transitions[state * 256 + byte]` is the next state.
/// * Every entry, along with `start`, identifies a state in the table.
/// * State `0` is the dead state: all of its transitions lead back to
///   itself and it is not a match state. Entering it means no further
///   match is possible.
/// * `is_match` has exactly one entry per state.
/// * An unanchored automaton embeds its own leading wildcard self loop;
///   the builder never adds one. The `anchored` flag merely records which
///   kind of automaton this is.
#[derive(Clone, Debug)]
pub struct RawAutomaton {
    /// The transition table, row major, 256 columns per state.
    pub transitions: Vec<usize>,
    /// The initial state.
    pub start: usize,
    /// For each state, whether it is a match state.
    pub is_match: Vec<bool>,
    /// Whether this automaton matches only at the beginning of the input.
    pub anchored: bool,
}

impl RawAutomaton {
    /// Returns the number of states in this automaton.
    pub fn state_count(&self) -> usize {
        self.is_match.len()
    }

    /// Check this handoff against its contract.
    fn check(&self) -> Result<()> {
        let state_count = self.state_count();
        if state_count == 0 {
            return Err(Error::automaton(
                "an automaton must have at least one state",
            ));
        }
        if self.transitions.len() != state_count * ALPHABET_LEN {
            return Err(Error::automaton(format!(
                "transition table has {} entries, but {} states \
                 require exactly {}",
                self.transitions.len(),
                state_count,
                state_count * ALPHABET_LEN,
            )));
        }
        if self.start >= state_count {
            return Err(Error::automaton(format!(
                "start state {} is out of bounds for {} states",
                self.start, state_count,
            )));
        }
        for (i, &next) in self.transitions.iter().enumerate() {
            if next >= state_count {
                return Err(Error::automaton(format!(
                    "state {} transitions to {} on byte 0x{:02X}, \
                     but the automaton has only {} states",
                    i / ALPHABET_LEN,
                    next,
                    i % ALPHABET_LEN,
                    state_count,
                )));
            }
        }
        if self.transitions[..ALPHABET_LEN].iter().any(|&next| next != 0) {
            return Err(Error::automaton(
                "state 0 must be a dead state with no outgoing transitions",
            ));
        }
        if self.is_match[0] {
            return Err(Error::automaton(
                "the dead state cannot be a match state",
            ));
        }
        Ok(())
    }
}
