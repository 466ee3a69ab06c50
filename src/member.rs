//! A council member: one node running the proposer, acceptor, and learner
//! roles behind a single inbox.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::codec;
use crate::collector::Collector;
use crate::config::{MemberConfig, MemberId, Roster, Timeouts};
use crate::core::{AcceptOutcome, AcceptorSnapshot, AcceptorState, PrepareOutcome};
use crate::error::Error;
use crate::fault::{FaultAction, FaultInjector};
use crate::message::{Message, MessageType};
use crate::net;

/// A value this member has learned to be chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub proposal_number: u64,
    pub value: String,
}

/// One member of the council.
///
/// Created with an id and the full peer roster; lives until process exit.
/// Acceptor state persists for the member's lifetime, proposer rounds come
/// and go with each [`propose_value`](Member::propose_value) call.
pub struct Member {
    pub(crate) id: MemberId,
    pub(crate) id_number: u64,
    pub(crate) roster: Roster,
    pub(crate) timeouts: Timeouts,
    /// Monotone counter of rounds originated here.
    pub(crate) round: AtomicU64,
    pub(crate) acceptor: Mutex<AcceptorState>,
    /// Active rounds, keyed by proposal number. Concurrent rounds never
    /// share a collector.
    pub(crate) rounds: Mutex<HashMap<u64, Arc<Collector>>>,
    pub(crate) decision: Mutex<Option<Decision>>,
    pub(crate) injector: FaultInjector,
    inbound_up: AtomicBool,
    outbound_up: AtomicBool,
}

impl Member {
    /// Create a member. The id must appear in the roster.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPeer`] when the roster has no entry for `id`.
    pub fn new(id: MemberId, roster: Roster, config: MemberConfig) -> Result<Arc<Self>, Error> {
        if !roster.contains(&id) {
            return Err(Error::UnknownPeer(id));
        }
        let acceptor = match config.restore {
            Some((n, v)) => AcceptorState::with_accepted(n, v),
            None => AcceptorState::new(),
        };
        Ok(Arc::new(Self {
            id_number: id.id_number(),
            id,
            roster,
            timeouts: config.timeouts,
            round: AtomicU64::new(0),
            acceptor: Mutex::new(acceptor),
            rounds: Mutex::new(HashMap::new()),
            decision: Mutex::new(None),
            injector: FaultInjector::new(config.profile, config.seed),
            inbound_up: AtomicBool::new(true),
            outbound_up: AtomicBool::new(true),
        }))
    }

    #[must_use]
    pub fn id(&self) -> &MemberId {
        &self.id
    }

    /// Bind the member's inbox to its roster port (on all interfaces).
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind; the process cannot
    /// participate without its inbox.
    pub async fn bind(&self) -> Result<net::TcpListener, Error> {
        let endpoint = self
            .roster
            .endpoint(&self.id)
            .ok_or_else(|| Error::UnknownPeer(self.id.clone()))?;
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), endpoint.port());
        Ok(net::TcpListener::bind(addr).await?)
    }

    /// Run the inbox on an already-bound listener.
    pub fn spawn_inbox(self: &Arc<Self>, listener: net::TcpListener) -> JoinHandle<()> {
        let member = Arc::clone(self);
        tokio::spawn(async move { member.accept_loop(listener).await })
    }

    /// Bind and run the inbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn spawn(self: &Arc<Self>) -> Result<JoinHandle<()>, Error> {
        let listener = self.bind().await?;
        Ok(self.spawn_inbox(listener))
    }

    /// Stop participating entirely: inbound and outbound traffic is dropped.
    pub fn go_offline(&self) {
        self.inbound_up.store(false, Ordering::Relaxed);
        self.outbound_up.store(false, Ordering::Relaxed);
        info!("{} is now offline", self.id);
    }

    /// Resume participating after [`go_offline`](Member::go_offline).
    pub fn go_online(&self) {
        self.inbound_up.store(true, Ordering::Relaxed);
        self.outbound_up.store(true, Ordering::Relaxed);
        info!("{} is back online", self.id);
    }

    /// Disable the send path only: the member keeps hearing the network but
    /// everything it sends is dropped.
    pub fn sever_sends(&self) {
        self.outbound_up.store(false, Ordering::Relaxed);
        info!("{} send path severed", self.id);
    }

    /// A consistent view of the acceptor fields.
    #[must_use]
    pub fn acceptor_snapshot(&self) -> AcceptorSnapshot {
        self.acceptor.lock().expect("acceptor lock poisoned").snapshot()
    }

    /// The decision this member has learned, if any.
    #[must_use]
    pub fn learned(&self) -> Option<Decision> {
        self.decision.lock().expect("decision lock poisoned").clone()
    }

    async fn accept_loop(self: Arc<Self>, listener: net::TcpListener) {
        debug!("{} inbox listening", self.id);
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let member = Arc::clone(&self);
                    tokio::spawn(async move { member.handle_connection(stream).await });
                }
                Err(e) => {
                    warn!("{} failed to accept a connection: {e}", self.id);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Read exactly one message, then let the connection drop.
    async fn handle_connection(self: Arc<Self>, stream: net::TcpStream) {
        let mut frames = FramedRead::new(stream, codec::frame_codec());
        match frames.next().await {
            Some(Ok(payload)) => match codec::decode(&payload) {
                Ok(msg) => self.handle_message(msg).await,
                Err(e) => warn!("{} dropping malformed message: {e}", self.id),
            },
            Some(Err(e)) => warn!("{} dropping unreadable frame: {e}", self.id),
            None => debug!("{} connection closed without a message", self.id),
        }
    }

    /// Route one inbound message to its role handler.
    async fn handle_message(&self, msg: Message) {
        if !self.inbound_up.load(Ordering::Relaxed) {
            return;
        }
        match msg.kind {
            MessageType::PrepareRequest => self.handle_prepare(msg).await,
            MessageType::AcceptRequest => self.handle_accept_request(msg).await,
            MessageType::Promise => self.handle_promise(msg),
            MessageType::Accepted => self.handle_accepted(msg),
        }
    }

    async fn handle_prepare(&self, msg: Message) {
        let Some(sender) = msg.sender_id.clone() else {
            warn!("{} dropping PREPARE without a sender", self.id);
            return;
        };
        match self.injector.decide() {
            FaultAction::Drop => return,
            FaultAction::DelayThenProcess(delay) => tokio::time::sleep(delay).await,
            FaultAction::Process => {}
        }

        let n = msg.proposal_number;
        let outcome = self.acceptor.lock().expect("acceptor lock poisoned").prepare(n);
        match outcome {
            PrepareOutcome::Promised {
                last_accepted_proposal_number,
                last_accepted_value,
            } => {
                info!(
                    "Phase 1 : Acceptor {} received PREPARE from {} with proposal number {}",
                    self.id, sender, n
                );
                let promise = Message::promise(
                    n,
                    msg.proposer_id,
                    last_accepted_proposal_number,
                    last_accepted_value,
                );
                info!("Phase 1 : Acceptor {} sends PROMISE to {}", self.id, sender);
                self.send_to(&sender, promise);
            }
            PrepareOutcome::Ignored => {
                debug!(
                    "Phase 1 : Acceptor {} ignores PREPARE from {} with proposal number {}",
                    self.id, sender, n
                );
            }
        }
    }

    async fn handle_accept_request(&self, msg: Message) {
        let Some(sender) = msg.sender_id.clone() else {
            warn!("{} dropping ACCEPT_REQUEST without a sender", self.id);
            return;
        };
        let Some(value) = msg.value.clone() else {
            warn!("{} dropping ACCEPT_REQUEST without a value", self.id);
            return;
        };
        match self.injector.decide() {
            FaultAction::Drop => return,
            FaultAction::DelayThenProcess(delay) => tokio::time::sleep(delay).await,
            FaultAction::Process => {}
        }

        let n = msg.proposal_number;
        let outcome = self
            .acceptor
            .lock()
            .expect("acceptor lock poisoned")
            .accept(n, &value);
        match outcome {
            AcceptOutcome::Accepted => {
                info!(
                    "Phase 3 : Acceptor {} accepts value '{}' from proposer {}",
                    self.id, value, msg.proposer_id
                );
                let accepted = Message::accepted(n, msg.proposer_id, value);
                info!("Phase 3 : Acceptor {} sends ACCEPTED to {}", self.id, sender);
                self.send_to(&sender, accepted);
            }
            AcceptOutcome::Ignored => {
                debug!(
                    "Phase 3 : Acceptor {} rejects ACCEPT_REQUEST from {} with proposal number {}",
                    self.id, sender, n
                );
            }
        }
    }

    fn handle_promise(&self, msg: Message) {
        let Some(sender) = msg.sender_id.clone() else {
            warn!("{} dropping PROMISE without a sender", self.id);
            return;
        };
        let collector = self.active_round(msg.proposal_number);
        match collector {
            Some(collector) => {
                info!("Phase 2 : Proposer {} received PROMISE from {}", self.id, sender);
                collector.record_promise(sender, msg);
            }
            None => debug!(
                "{} ignoring PROMISE for inactive round {}",
                self.id, msg.proposal_number
            ),
        }
    }

    fn handle_accepted(&self, msg: Message) {
        let Some(sender) = msg.sender_id.clone() else {
            warn!("{} dropping ACCEPTED without a sender", self.id);
            return;
        };
        let collector = self.active_round(msg.proposal_number);
        match collector {
            Some(collector) => {
                info!("Phase 4 : Proposer {} received ACCEPTED from {}", self.id, sender);
                collector.record_accepted(sender, msg);
            }
            None => debug!(
                "{} ignoring ACCEPTED for inactive round {}",
                self.id, msg.proposal_number
            ),
        }
    }

    fn active_round(&self, proposal_number: u64) -> Option<Arc<Collector>> {
        self.rounds
            .lock()
            .expect("rounds lock poisoned")
            .get(&proposal_number)
            .cloned()
    }

    /// Stamp and unicast a message. All failures degrade to message loss.
    pub(crate) fn send_to(&self, to: &MemberId, mut msg: Message) {
        if !self.outbound_up.load(Ordering::Relaxed) {
            debug!("{} outbound disabled, dropping message to {to}", self.id);
            return;
        }
        let Some(addr) = self.roster.endpoint(to) else {
            debug!("{} has no endpoint for {to}, dropping message", self.id);
            return;
        };
        msg.sender_id = Some(self.id.clone());
        msg.receiver_id = Some(to.clone());
        net::send_detached(addr, msg);
    }

    /// Unicast to every peer except self.
    pub(crate) fn broadcast(&self, msg: &Message) {
        for (peer, _) in self.roster.peers_of(&self.id) {
            self.send_to(peer, msg.clone());
        }
    }
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("id", &self.id)
            .field("profile", self.injector.profile())
            .finish_non_exhaustive()
    }
}
