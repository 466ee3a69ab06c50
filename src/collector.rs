//! In-flight response tallies for one proposer round.
//!
//! Responses are keyed by acceptor id, so a duplicate from the same acceptor
//! overwrites its previous entry instead of inflating the quorum count.
//! Inbox handlers insert; the round's task waits for quorum under a
//! deadline.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::MemberId;
use crate::message::Message;

#[derive(Debug, Default)]
pub struct Collector {
    promises: Mutex<HashMap<MemberId, Message>>,
    accepteds: Mutex<HashMap<MemberId, Message>>,
    changed: Notify,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_promise(&self, from: MemberId, msg: Message) {
        self.promises
            .lock()
            .expect("collector lock poisoned")
            .insert(from, msg);
        // notify_one stores a permit when the round task is between polls,
        // so a response landing there is never missed
        self.changed.notify_one();
    }

    pub fn record_accepted(&self, from: MemberId, msg: Message) {
        self.accepteds
            .lock()
            .expect("collector lock poisoned")
            .insert(from, msg);
        self.changed.notify_one();
    }

    #[must_use]
    pub fn promise_count(&self) -> usize {
        self.promises.lock().expect("collector lock poisoned").len()
    }

    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.accepteds.lock().expect("collector lock poisoned").len()
    }

    /// Wait until `quorum` distinct acceptors have promised, or the deadline
    /// passes. On quorum, returns a snapshot of the promises.
    pub async fn await_promises(&self, quorum: usize, deadline: Instant) -> Option<Vec<Message>> {
        self.await_quorum(&self.promises, quorum, deadline).await
    }

    /// Wait until `quorum` distinct acceptors have confirmed the accept, or
    /// the deadline passes.
    pub async fn await_accepteds(&self, quorum: usize, deadline: Instant) -> Option<Vec<Message>> {
        self.await_quorum(&self.accepteds, quorum, deadline).await
    }

    async fn await_quorum(
        &self,
        tally: &Mutex<HashMap<MemberId, Message>>,
        quorum: usize,
        deadline: Instant,
    ) -> Option<Vec<Message>> {
        loop {
            // register interest before checking, so an insert between the
            // check and the await still wakes us
            let changed = self.changed.notified();
            {
                let tally = tally.lock().expect("collector lock poisoned");
                if tally.len() >= quorum {
                    return Some(tally.values().cloned().collect());
                }
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                let tally = tally.lock().expect("collector lock poisoned");
                if tally.len() >= quorum {
                    return Some(tally.values().cloned().collect());
                }
                return None;
            }
        }
    }
}
