//! Per-member response policies.
//!
//! The injector is consulted on each inbound PREPARE_REQUEST and
//! ACCEPT_REQUEST and turns a uniform membership into a heterogeneous one:
//! instant, delayed, flaky, lossy, or entirely offline members. Delays are
//! served inside the connection handler, so they never block the listener.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What to do with one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    Process,
    /// Sleep, then process and respond.
    DelayThenProcess(Duration),
    /// Return without side effects, as if the message was lost.
    Drop,
}

/// Response policy of one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultProfile {
    /// Always processes immediately.
    Responsive,
    /// Always processes after a fixed delay.
    Delayed { delay: Duration },
    /// Poor connectivity: 50% delayed, 25% dropped, 25% immediate.
    FlakySlow { delay: Duration },
    /// Drops a fixed percentage of requests, processes the rest immediately.
    Lossy { drop_percent: u8 },
    /// Uniform delay in `[0, max_delay)`, then processes.
    Variable { max_delay: Duration },
    /// Drops everything.
    Offline,
}

impl FaultProfile {
    /// Reference delay of the flaky-slow profile.
    pub const FLAKY_DELAY: Duration = Duration::from_secs(5);
    /// Reference drop rate of the lossy profile.
    pub const LOSSY_DROP_PERCENT: u8 = 30;
    /// Reference delay ceiling of the variable profile.
    pub const VARIABLE_MAX_DELAY: Duration = Duration::from_secs(3);

    /// The flaky-slow profile at its reference delay.
    #[must_use]
    pub fn flaky_slow() -> Self {
        Self::FlakySlow {
            delay: Self::FLAKY_DELAY,
        }
    }

    /// The lossy profile at its reference drop rate.
    #[must_use]
    pub fn lossy() -> Self {
        Self::Lossy {
            drop_percent: Self::LOSSY_DROP_PERCENT,
        }
    }

    /// The variable profile at its reference ceiling.
    #[must_use]
    pub fn variable() -> Self {
        Self::Variable {
            max_delay: Self::VARIABLE_MAX_DELAY,
        }
    }

    fn decide(&self, rng: &mut StdRng) -> FaultAction {
        match *self {
            FaultProfile::Responsive => FaultAction::Process,
            FaultProfile::Delayed { delay } => FaultAction::DelayThenProcess(delay),
            FaultProfile::FlakySlow { delay } => match rng.random_range(0..100u32) {
                0..50 => FaultAction::DelayThenProcess(delay),
                50..75 => FaultAction::Drop,
                _ => FaultAction::Process,
            },
            FaultProfile::Lossy { drop_percent } => {
                if rng.random_range(0..100u32) < u32::from(drop_percent) {
                    FaultAction::Drop
                } else {
                    FaultAction::Process
                }
            }
            FaultProfile::Variable { max_delay } => {
                let max = max_delay.as_millis().max(1);
                let millis = rng.random_range(0..max);
                FaultAction::DelayThenProcess(Duration::from_millis(
                    u64::try_from(millis).unwrap_or(u64::MAX),
                ))
            }
            FaultProfile::Offline => FaultAction::Drop,
        }
    }
}

impl Default for FaultProfile {
    fn default() -> Self {
        Self::Responsive
    }
}

/// A profile plus its RNG, consulted concurrently by connection handlers.
#[derive(Debug)]
pub struct FaultInjector {
    profile: FaultProfile,
    rng: Mutex<StdRng>,
}

impl FaultInjector {
    /// Seeded injectors replay the same decision sequence, which keeps
    /// whole-election schedules reproducible.
    #[must_use]
    pub fn new(profile: FaultProfile, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            profile,
            rng: Mutex::new(rng),
        }
    }

    pub fn decide(&self) -> FaultAction {
        let mut rng = self.rng.lock().expect("fault rng poisoned");
        self.profile.decide(&mut rng)
    }

    #[must_use]
    pub fn profile(&self) -> &FaultProfile {
        &self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decisions(profile: FaultProfile, seed: u64, count: usize) -> Vec<FaultAction> {
        let injector = FaultInjector::new(profile, Some(seed));
        (0..count).map(|_| injector.decide()).collect()
    }

    #[test]
    fn responsive_never_interferes() {
        assert!(
            decisions(FaultProfile::Responsive, 1, 100)
                .iter()
                .all(|a| *a == FaultAction::Process)
        );
    }

    #[test]
    fn offline_drops_everything() {
        assert!(
            decisions(FaultProfile::Offline, 1, 100)
                .iter()
                .all(|a| *a == FaultAction::Drop)
        );
    }

    #[test]
    fn delayed_is_exact() {
        let delay = Duration::from_millis(250);
        assert!(
            decisions(FaultProfile::Delayed { delay }, 1, 20)
                .iter()
                .all(|a| *a == FaultAction::DelayThenProcess(delay))
        );
    }

    #[test]
    fn lossy_drop_rate_is_roughly_reference() {
        let dropped = decisions(FaultProfile::lossy(), 7, 1000)
            .iter()
            .filter(|a| **a == FaultAction::Drop)
            .count();
        assert!((200..400).contains(&dropped), "dropped {dropped} of 1000");
    }

    #[test]
    fn flaky_slow_mixes_all_three_actions() {
        let actions = decisions(FaultProfile::flaky_slow(), 11, 1000);
        let delayed = actions
            .iter()
            .filter(|a| matches!(a, FaultAction::DelayThenProcess(_)))
            .count();
        let dropped = actions.iter().filter(|a| **a == FaultAction::Drop).count();
        let instant = actions.iter().filter(|a| **a == FaultAction::Process).count();
        assert!((400..600).contains(&delayed), "delayed {delayed}");
        assert!((150..350).contains(&dropped), "dropped {dropped}");
        assert!((150..350).contains(&instant), "instant {instant}");
    }

    #[test]
    fn variable_delays_stay_under_ceiling() {
        let max = Duration::from_millis(300);
        for action in decisions(FaultProfile::Variable { max_delay: max }, 3, 200) {
            match action {
                FaultAction::DelayThenProcess(d) => assert!(d < max),
                other => panic!("variable profile always delays, got {other:?}"),
            }
        }
    }

    #[test]
    fn same_seed_same_schedule() {
        let a = decisions(FaultProfile::flaky_slow(), 42, 50);
        let b = decisions(FaultProfile::flaky_slow(), 42, 50);
        assert_eq!(a, b);
    }
}
