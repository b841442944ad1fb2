//! Change detection
//!
//! Decides whether a collected address set needs to go to the nameserver
//! at all. The comparison is strict structural equality against the last
//! published state: hostname and every per-family sorted list must match
//! exactly. Anything else, including the absence of a prior state,
//! proceeds with an update.

use crate::state::PublishedState;

/// The outcome of comparing the current state against the last published one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Identical to the last published state, nothing to send
    Skip,
    /// Different or no prior state, send an update
    Proceed,
}

/// Compares `current` against the last published state.
pub fn decide(current: &PublishedState, last: Option<&PublishedState>) -> Decision {
    match last {
        Some(last) if last == current => Decision::Skip,
        _ => Decision::Proceed,
    }
}
