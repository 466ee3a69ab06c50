//! The proposer engine: one `propose_value` call drives one round through
//! both phases, each gated on a strict majority under the phase timeout.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::collector::Collector;
use crate::core::{RoundPhase, choose_value, majority, proposal_number};
use crate::member::{Decision, Member};
use crate::message::Message;

/// How a proposer round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A majority accepted; the value is chosen and this member learned it.
    Chosen { proposal_number: u64, value: String },
    /// The round timed out in the given phase. Acceptor state elsewhere is
    /// left as-is; a later round may learn and propagate any partial accepts.
    Failed { phase: RoundPhase },
}

impl RoundOutcome {
    /// The chosen value, when the round succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            RoundOutcome::Chosen { value, .. } => Some(value),
            RoundOutcome::Failed { .. } => None,
        }
    }
}

impl Member {
    /// Propose `value` for election. Returns once the round ends, either
    /// with the chosen value (which may differ from `value` if an earlier
    /// proposal was already accepted somewhere) or with the phase that
    /// timed out.
    ///
    /// Rounds may run concurrently on the same member; each owns its own
    /// tallies and proposal number.
    pub async fn propose_value(&self, value: impl Into<String>) -> RoundOutcome {
        let own = value.into();
        let round = self.round.fetch_add(1, Ordering::Relaxed) + 1;
        let n = proposal_number(round, self.id_number);
        let quorum = majority(self.roster.len());

        let collector = Arc::new(Collector::new());
        self.rounds
            .lock()
            .expect("rounds lock poisoned")
            .insert(n, Arc::clone(&collector));

        info!(
            "Phase 1 : {} starts Phase 1 - Prepare. Sending PREPARE to members with proposal number {}",
            self.id, n
        );
        self.broadcast(&Message::prepare(n, self.id.clone()));

        let deadline = Instant::now() + self.timeouts.phase;
        let Some(promises) = collector.await_promises(quorum, deadline).await else {
            warn!("[{}] Failed to receive promises from majority", self.id);
            self.finish_round(n);
            return RoundOutcome::Failed {
                phase: RoundPhase::Preparing,
            };
        };

        info!("Phase 2 : {} received PROMISES from majority.", self.id);
        let (chosen, adopted) = choose_value(own, &promises);
        match &adopted {
            Some((prior_n, prior_v)) => info!(
                "Phase 2 : {} learns about previously accepted value '{}' with proposal number {}",
                self.id, prior_v, prior_n
            ),
            None => info!(
                "Phase 2 : {} did not learn about any previously accepted value. Proceeding with own value '{}'",
                self.id, chosen
            ),
        }

        info!(
            "Phase 3 : {} starts Phase 3 - Accept. Sending ACCEPT_REQUEST with value '{}' to members.",
            self.id, chosen
        );
        self.broadcast(&Message::accept_request(n, self.id.clone(), chosen.clone()));

        let deadline = Instant::now() + self.timeouts.phase;
        if collector.await_accepteds(quorum, deadline).await.is_none() {
            warn!("[{}] Failed to reach consensus on value: {}", self.id, chosen);
            self.finish_round(n);
            return RoundOutcome::Failed {
                phase: RoundPhase::Accepting,
            };
        }

        *self.decision.lock().expect("decision lock poisoned") = Some(Decision {
            proposal_number: n,
            value: chosen.clone(),
        });
        info!("Final value accepted is {} by proposer {}", chosen, self.id);
        self.finish_round(n);
        RoundOutcome::Chosen {
            proposal_number: n,
            value: chosen,
        }
    }

    fn finish_round(&self, proposal_number: u64) {
        self.rounds
            .lock()
            .expect("rounds lock poisoned")
            .remove(&proposal_number);
    }
}
