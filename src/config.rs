//! Member identities, the peer roster, and tunable timing.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::fault::FaultProfile;

/// Short string identity of a council member, e.g. `"M1"`.
///
/// The trailing decimal digits are the member's *id number*, used as the
/// deterministic tiebreaker inside proposal numbers.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

fn numeric_suffix(id: &str) -> Option<u64> {
    let start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    id[start..].parse().ok()
}

impl MemberId {
    /// Parse a member id. The id must be a name ending in at least one
    /// decimal digit, e.g. `"M4"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMemberId`] when the id has no numeric suffix.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if numeric_suffix(&id).is_none() {
            return Err(Error::InvalidMemberId(id));
        }
        Ok(Self(id))
    }

    /// The integer suffix of the id.
    #[must_use]
    pub fn id_number(&self) -> u64 {
        numeric_suffix(&self.0).unwrap_or(0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", self.0)
    }
}

/// The closed membership table: member id to transport endpoint.
///
/// Includes every member (self included) and is immutable after construction.
/// Proposal numbers encode the id number into the last decimal digit, so the
/// constructor rejects rosters whose id numbers are not unique single digits.
#[derive(Debug, Clone)]
pub struct Roster {
    members: BTreeMap<MemberId, SocketAddr>,
}

impl Roster {
    /// Build a roster from explicit `(id, endpoint)` entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoster`] when the roster is empty or any id
    /// number is ≥ 10 or repeated.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (MemberId, SocketAddr)>,
    ) -> Result<Self, Error> {
        let members: BTreeMap<_, _> = entries.into_iter().collect();
        if members.is_empty() {
            return Err(Error::InvalidRoster("no members".into()));
        }
        let mut seen = [false; 10];
        for id in members.keys() {
            let n = id.id_number();
            let Ok(n) = usize::try_from(n) else {
                return Err(Error::InvalidRoster(format!("id number out of range: {id}")));
            };
            if n >= 10 {
                return Err(Error::InvalidRoster(format!(
                    "id number must be a single digit: {id}"
                )));
            }
            if seen[n] {
                return Err(Error::InvalidRoster(format!("duplicate id number: {id}")));
            }
            seen[n] = true;
        }
        Ok(Self { members })
    }

    /// The reference deployment: `M1..Mn` on loopback ports
    /// `base_port..base_port + n - 1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoster`] when `count` is 0 or exceeds 9.
    pub fn loopback(count: usize, base_port: u16) -> Result<Self, Error> {
        if count == 0 || count > 9 {
            return Err(Error::InvalidRoster(format!(
                "loopback roster supports 1..=9 members, got {count}"
            )));
        }
        let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
        Self::from_entries((1..=count).map(|i| {
            let id = MemberId::new(format!("M{i}")).expect("generated ids are valid");
            let port = base_port + u16::try_from(i - 1).expect("count fits in u16");
            (id, SocketAddr::new(loopback, port))
        }))
    }

    /// Endpoint of a member, if present.
    #[must_use]
    pub fn endpoint(&self, id: &MemberId) -> Option<SocketAddr> {
        self.members.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &MemberId) -> bool {
        self.members.contains_key(id)
    }

    /// Total membership size N. Majorities are computed over this, not over
    /// the number of peers actually contacted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// All members except `me`, in id order.
    pub fn peers_of<'a>(
        &'a self,
        me: &'a MemberId,
    ) -> impl Iterator<Item = (&'a MemberId, SocketAddr)> {
        self.members
            .iter()
            .filter(move |(id, _)| *id != me)
            .map(|(id, addr)| (id, *addr))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, SocketAddr)> {
        self.members.iter().map(|(id, addr)| (id, *addr))
    }
}

/// Timing knobs for a proposer round.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Bound on each of the two quorum-gathering phases.
    pub phase: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            phase: Duration::from_secs(15),
        }
    }
}

/// Per-member construction options.
#[derive(Debug, Clone, Default)]
pub struct MemberConfig {
    /// Response policy applied to inbound PREPARE and ACCEPT_REQUEST traffic.
    pub profile: FaultProfile,
    /// Seed for the fault injector's RNG. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub timeouts: Timeouts,
    /// Start the acceptor with a previously accepted `(proposal, value)`
    /// pair, as if restored mid-election.
    pub restore: Option<(u64, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_parses_numeric_suffix() {
        let id = MemberId::new("M7").unwrap();
        assert_eq!(id.id_number(), 7);
        assert_eq!(id.as_str(), "M7");
    }

    #[test]
    fn member_id_without_suffix_rejected() {
        assert!(MemberId::new("chair").is_err());
        assert!(MemberId::new("").is_err());
    }

    #[test]
    fn loopback_roster_is_reference_deployment() {
        let roster = Roster::loopback(9, 5001).unwrap();
        assert_eq!(roster.len(), 9);
        let m1 = MemberId::new("M1").unwrap();
        assert_eq!(roster.endpoint(&m1).unwrap().port(), 5001);
        let m9 = MemberId::new("M9").unwrap();
        assert_eq!(roster.endpoint(&m9).unwrap().port(), 5009);
        assert_eq!(roster.peers_of(&m1).count(), 8);
    }

    #[test]
    fn roster_rejects_duplicate_id_numbers() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let entries = vec![
            (MemberId::new("M1").unwrap(), addr),
            (MemberId::new("N1").unwrap(), addr),
        ];
        assert!(Roster::from_entries(entries).is_err());
    }

    #[test]
    fn roster_rejects_wide_id_numbers() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let entries = vec![(MemberId::new("M12").unwrap(), addr)];
        assert!(Roster::from_entries(entries).is_err());
    }
}
