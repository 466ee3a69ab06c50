//! # council-paxos
//!
//! A nine-member council-election simulator built on single-decree Paxos
//! over point-to-point TCP. Every member simultaneously plays the proposer,
//! acceptor, and learner roles, and can be configured with an adversarial
//! response policy: instant, delayed, flaky, lossy, or offline.
//!
//! # Usage
//!
//! Build a [`Roster`] mapping member ids to endpoints, create one [`Member`]
//! per id, spawn each member's inbox, and drive elections with
//! [`Member::propose_value`]:
//!
//! ```no_run
//! use council_paxos::{Member, MemberConfig, MemberId, Roster, RoundOutcome};
//!
//! # async fn run() -> Result<(), council_paxos::Error> {
//! let roster = Roster::loopback(9, 5001)?;
//! let m1 = Member::new(MemberId::new("M1")?, roster.clone(), MemberConfig::default())?;
//! let _inbox = m1.spawn().await?;
//!
//! match m1.propose_value("M1").await {
//!     RoundOutcome::Chosen { value, .. } => println!("{value} elected"),
//!     RoundOutcome::Failed { phase } => println!("round failed during {phase:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A round broadcasts PREPARE_REQUESTs, waits for PROMISEs from a strict
//! majority, then broadcasts ACCEPT_REQUESTs and waits for ACCEPTEDs, each
//! phase under a timeout. If any promise reports a previously accepted
//! value, the round adopts the value with the highest reported proposal
//! number instead of its own. That rule is the safety core of Paxos.
//!
//! Members never message themselves; a majority is ⌊N/2⌋+1 distinct ids out
//! of the full membership of N.
//!
//! State is in-memory only: a restarted member rejoins blank. Messages are
//! length-delimited JSON frames, one per connection, and the transport
//! never retries; connect failures are message loss.

#![warn(clippy::pedantic)]

mod codec;
mod collector;
pub mod config;
pub mod core;
mod error;
pub mod fault;
mod member;
mod message;
pub mod net;
mod proposer;

pub use crate::config::{MemberConfig, MemberId, Roster, Timeouts};
pub use crate::core::{AcceptorSnapshot, RoundPhase};
pub use crate::error::Error;
pub use crate::fault::{FaultAction, FaultProfile};
pub use crate::member::{Decision, Member};
pub use crate::message::{Message, MessageType};
pub use crate::proposer::RoundOutcome;
