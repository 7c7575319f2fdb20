/*!
Party roles and run states.
*/

use std::fmt;

/// Role of this party for the whole run.
///
/// The initiator drives every interactive exchange: it sends block parities
/// first, runs the binary searches (and is the only side that flips bits),
/// draws the verification salt and the privacy amplification seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Drives the exchanges
    Initiator,
    /// Answers the initiator
    Responder,
}

impl Role {
    /// Whether this is the initiator
    pub fn is_initiator(self) -> bool {
        self == Role::Initiator
    }

    /// The other party's role
    pub fn peer(self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "Initiator"),
            Role::Responder => write!(f, "Responder"),
        }
    }
}

/// Reconciliation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReconciliationState {
    /// No pass started yet
    Init,
    /// Running the given pass
    Pass(usize),
    /// All passes finished
    Done,
}

impl fmt::Display for ReconciliationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationState::Init => write!(f, "Init"),
            ReconciliationState::Pass(p) => write!(f, "Pass({})", p),
            ReconciliationState::Done => write!(f, "Done"),
        }
    }
}

/// Stage of a full post-processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Nothing exchanged yet
    New,
    /// Cascade in progress
    Reconciling,
    /// Key equality check in progress
    Verifying,
    /// Seed exchange and compression in progress
    Amplifying,
    /// Finished with a key
    Completed,
    /// Finished without a key
    Aborted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::New => write!(f, "New"),
            SessionState::Reconciling => write!(f, "Reconciling"),
            SessionState::Verifying => write!(f, "Verifying"),
            SessionState::Amplifying => write!(f, "Amplifying"),
            SessionState::Completed => write!(f, "Completed"),
            SessionState::Aborted => write!(f, "Aborted"),
        }
    }
}
