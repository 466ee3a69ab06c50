//! Protocol messages exchanged between members.
//!
//! One message travels per connection. The schema is deliberately flat so
//! that readers tolerate fields they do not know about.

use serde::{Deserialize, Serialize};

use crate::config::MemberId;

/// The four message types of the two-phase protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    PrepareRequest,
    Promise,
    AcceptRequest,
    Accepted,
}

/// A single protocol message.
///
/// `value` is meaningful on ACCEPT_REQUEST and ACCEPTED;
/// `last_accepted_proposal_number` / `last_accepted_value` only on PROMISE
/// (0 / absent when the acceptor has never accepted). `sender_id` and
/// `receiver_id` are stamped by the transport at send time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub proposal_number: u64,
    pub proposer_id: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub last_accepted_proposal_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accepted_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<MemberId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<MemberId>,
}

impl Message {
    /// Phase 1 broadcast from a proposer.
    #[must_use]
    pub fn prepare(proposal_number: u64, proposer_id: MemberId) -> Self {
        Self {
            kind: MessageType::PrepareRequest,
            proposal_number,
            proposer_id,
            value: None,
            last_accepted_proposal_number: 0,
            last_accepted_value: None,
            sender_id: None,
            receiver_id: None,
        }
    }

    /// An acceptor's phase 1 grant, reporting its latest accept if any.
    #[must_use]
    pub fn promise(
        proposal_number: u64,
        proposer_id: MemberId,
        last_accepted_proposal_number: u64,
        last_accepted_value: Option<String>,
    ) -> Self {
        Self {
            kind: MessageType::Promise,
            proposal_number,
            proposer_id,
            value: None,
            last_accepted_proposal_number,
            last_accepted_value,
            sender_id: None,
            receiver_id: None,
        }
    }

    /// Phase 2 broadcast carrying the (possibly overridden) value.
    #[must_use]
    pub fn accept_request(proposal_number: u64, proposer_id: MemberId, value: String) -> Self {
        Self {
            kind: MessageType::AcceptRequest,
            proposal_number,
            proposer_id,
            value: Some(value),
            last_accepted_proposal_number: 0,
            last_accepted_value: None,
            sender_id: None,
            receiver_id: None,
        }
    }

    /// An acceptor's phase 2 confirmation.
    #[must_use]
    pub fn accepted(proposal_number: u64, proposer_id: MemberId, value: String) -> Self {
        Self {
            kind: MessageType::Accepted,
            proposal_number,
            proposer_id,
            value: Some(value),
            last_accepted_proposal_number: 0,
            last_accepted_value: None,
            sender_id: None,
            receiver_id: None,
        }
    }

    /// The PROMISE's accept report, when it carries one.
    ///
    /// A report with proposal number 0 means "never accepted" and a report
    /// without a value is treated the same way.
    #[must_use]
    pub fn accept_report(&self) -> Option<(u64, &str)> {
        if self.last_accepted_proposal_number == 0 {
            return None;
        }
        self.last_accepted_value
            .as_deref()
            .map(|v| (self.last_accepted_proposal_number, v))
    }
}
