//! Pure protocol state machines: no I/O, no async, no synchronization.

mod acceptor;
mod proposer;

pub use acceptor::{AcceptOutcome, AcceptorSnapshot, AcceptorState, PrepareOutcome};
pub use proposer::{RoundPhase, choose_value, majority, proposal_number};
