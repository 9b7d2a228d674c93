use std::error;
use std::fmt;
use std::result;

pub type Result<T> = result::Result<T, Error>;

/// An error that occurred during the construction of a DFA.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The kind of error that occurred.
#[derive(Clone, Debug)]
pub enum ErrorKind {
    /// An error that occurred because the automaton handed over by the
    /// compiler was malformed. The message string describes the defect
    /// found, e.g., a transition table whose length is not a multiple of
    /// 256, a transition or start state that names a state that doesn't
    /// exist, or a dead state with an outgoing transition.
    Automaton(String),
    /// An error that occurred because a state ID was required that exceeds
    /// the maximum ID representable in the chosen state ID representation.
    /// `max` is that maximum.
    StateIDOverflow {
        /// The maximum possible state ID.
        max: usize,
    },
    /// An error that occurred because premultiplying the states of a DFA
    /// would require a state ID that exceeds the maximum representable ID.
    PremultiplyOverflow {
        /// The maximum possible state ID.
        max: usize,
        /// The maximum ID required by premultiplication.
        requested_max: usize,
    },
}

impl Error {
    /// Return the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn automaton<T: Into<String>>(msg: T) -> Error {
        Error { kind: ErrorKind::Automaton(msg.into()) }
    }

    pub(crate) fn state_id_overflow(max: usize) -> Error {
        Error { kind: ErrorKind::StateIDOverflow { max } }
    }

    pub(crate) fn premultiply_overflow(
        max: usize,
        requested_max: usize,
    ) -> Error {
        Error { kind: ErrorKind::PremultiplyOverflow { max, requested_max } }
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Automaton(ref msg) => {
                write!(f, "invalid automaton: {}", msg)
            }
            ErrorKind::StateIDOverflow { max } => write!(
                f,
                "building the DFA failed because it required building more \
                 states than can be identified, where the maximum ID for the \
                 chosen representation is {}",
                max,
            ),
            ErrorKind::PremultiplyOverflow { max, requested_max } => {
                if max == 0 && requested_max == 0 {
                    write!(
                        f,
                        "premultiplication of states requires space that \
                         exceeds the addressable memory of this system",
                    )
                } else {
                    write!(
                        f,
                        "premultiplication of states requires space that \
                         exceeds the maximum state ID of {} for the chosen \
                         representation (requires ID of at least {})",
                        max, requested_max,
                    )
                }
            }
        }
    }
}
