//! Pure proposer-side logic: proposal numbering, quorum arithmetic, and the
//! value-override rule.

use crate::message::Message;

/// Compose a proposal number from a member's round counter and id number.
///
/// `round * 10 + id_number` is unique across members within a round (the
/// roster enforces distinct single-digit id numbers), strictly increasing
/// per proposer, and totally ordered across the membership.
#[must_use]
pub fn proposal_number(round: u64, id_number: u64) -> u64 {
    debug_assert!(id_number < 10, "id numbers are single decimal digits");
    round * 10 + id_number
}

/// Strict simple majority of a membership of `n`.
#[must_use]
pub fn majority(n: usize) -> usize {
    n / 2 + 1
}

/// Apply the value-safety rule to a set of PROMISEs.
///
/// If any promise reports a previous accept, the round must adopt the value
/// attached to the highest reported proposal number; otherwise the
/// proposer's own value stands. Returns the value to send in phase 2 and
/// the adopted report, if any, for the caller to announce.
///
/// Ties on the maximum can pick either report: a number is accepted with
/// exactly one value, so tied reports always carry the same value.
#[must_use]
pub fn choose_value<'a>(
    own: String,
    promises: impl IntoIterator<Item = &'a Message>,
) -> (String, Option<(u64, String)>) {
    let adopted = promises
        .into_iter()
        .filter_map(Message::accept_report)
        .max_by_key(|&(n, _)| n);
    match adopted {
        Some((n, v)) => (v.to_string(), Some((n, v.to_string()))),
        None => (own, None),
    }
}

/// States of one proposer round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    /// Phase 1: gathering PROMISEs.
    Preparing,
    /// Phase 2: gathering ACCEPTEDs.
    Accepting,
    Done,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemberId;

    fn promise(from: &str, last_n: u64, last_v: Option<&str>) -> Message {
        let mut msg = Message::promise(
            99,
            MemberId::new("M9").unwrap(),
            last_n,
            last_v.map(String::from),
        );
        msg.sender_id = Some(MemberId::new(from).unwrap());
        msg
    }

    #[test]
    fn proposal_numbers_are_unique_and_ordered() {
        // same round, different members
        assert_ne!(proposal_number(1, 1), proposal_number(1, 2));
        // later rounds always dominate
        assert!(proposal_number(2, 1) > proposal_number(1, 9));
        // strictly increasing per proposer
        let numbers: Vec<u64> = (1..=5).map(|round| proposal_number(round, 4)).collect();
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn majority_of_nine_is_five() {
        assert_eq!(majority(9), 5);
        assert_eq!(majority(3), 2);
        assert_eq!(majority(1), 1);
    }

    #[test]
    fn keeps_own_value_without_reports() {
        let promises = [promise("M4", 0, None), promise("M5", 0, None)];
        let (value, adopted) = choose_value("M2".into(), &promises);
        assert_eq!(value, "M2");
        assert!(adopted.is_none());
    }

    #[test]
    fn adopts_reported_value() {
        let promises = [promise("M4", 11, Some("M1")), promise("M5", 0, None)];
        let (value, adopted) = choose_value("M2".into(), &promises);
        assert_eq!(value, "M1");
        assert_eq!(adopted, Some((11, "M1".to_string())));
    }

    #[test]
    fn adopts_highest_of_several_reports() {
        let promises = [
            promise("M4", 11, Some("M1")),
            promise("M5", 23, Some("M3")),
            promise("M6", 11, Some("M1")),
        ];
        let (value, adopted) = choose_value("M2".into(), &promises);
        assert_eq!(value, "M3");
        assert_eq!(adopted, Some((23, "M3".to_string())));
    }

    #[test]
    fn tied_reports_agree_so_either_wins() {
        let promises = [
            promise("M4", 11, Some("M1")),
            promise("M5", 11, Some("M1")),
        ];
        let (value, _) = choose_value("M2".into(), &promises);
        assert_eq!(value, "M1");
    }

    #[test]
    fn valueless_report_is_not_adopted() {
        // an acceptor that has never accepted sends number 0 and no value
        let promises = [promise("M4", 0, Some("stray"))];
        let (value, adopted) = choose_value("M2".into(), &promises);
        assert_eq!(value, "M2");
        assert!(adopted.is_none());
    }
}
