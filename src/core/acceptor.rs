//! Pure acceptor state machine.
//!
//! Decision rules:
//! - **Prepare**: promise only proposals *strictly above* `highest_seen`.
//! - **Accept**: accept proposals *at or above* `highest_seen`.
//!
//! The asymmetry is load-bearing. A proposer's own prepare has already
//! bumped `highest_seen` to its number, so the matching accept must pass at
//! equality or the common case would never commit.

/// Result of handling a PREPARE_REQUEST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// The number was promised; report the latest accept (if any) back to
    /// the proposer.
    Promised {
        last_accepted_proposal_number: u64,
        last_accepted_value: Option<String>,
    },
    /// Stale number; no state change.
    Ignored,
}

/// Result of handling an ACCEPT_REQUEST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The (proposal, value) pair was recorded.
    Accepted,
    /// Stale number; no state change.
    Ignored,
}

/// A consistent view of the three acceptor fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptorSnapshot {
    pub highest_seen: u64,
    pub highest_accepted: u64,
    pub accepted_value: Option<String>,
}

/// The acceptor role's durable-in-memory state.
///
/// `highest_seen` and `highest_accepted` are non-decreasing;
/// `highest_accepted <= highest_seen` always; `accepted_value` is set
/// atomically with `highest_accepted` by the same accept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptorState {
    highest_seen: u64,
    highest_accepted: u64,
    accepted_value: Option<String>,
}

impl AcceptorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State with a previously accepted pair, as if restored mid-election.
    #[must_use]
    pub fn with_accepted(proposal_number: u64, value: impl Into<String>) -> Self {
        Self {
            highest_seen: proposal_number,
            highest_accepted: proposal_number,
            accepted_value: Some(value.into()),
        }
    }

    pub fn prepare(&mut self, proposal_number: u64) -> PrepareOutcome {
        if proposal_number > self.highest_seen {
            self.highest_seen = proposal_number;
            PrepareOutcome::Promised {
                last_accepted_proposal_number: self.highest_accepted,
                last_accepted_value: self.accepted_value.clone(),
            }
        } else {
            PrepareOutcome::Ignored
        }
    }

    pub fn accept(&mut self, proposal_number: u64, value: &str) -> AcceptOutcome {
        if proposal_number >= self.highest_seen {
            self.highest_seen = proposal_number;
            self.highest_accepted = proposal_number;
            self.accepted_value = Some(value.to_string());
            AcceptOutcome::Accepted
        } else {
            AcceptOutcome::Ignored
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AcceptorSnapshot {
        AcceptorSnapshot {
            highest_seen: self.highest_seen,
            highest_accepted: self.highest_accepted,
            accepted_value: self.accepted_value.clone(),
        }
    }
}
