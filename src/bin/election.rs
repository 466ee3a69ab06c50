//! Scripted council election.
//!
//! Spawns the full membership on loopback ports, then runs the reference
//! scenario: M1 proposes itself; later M2 proposes and immediately goes
//! offline; later M3 does the same. The value M1 got accepted must survive
//! every subsequent round.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use council_paxos::{
    FaultProfile, Member, MemberConfig, MemberId, Roster, RoundOutcome, Timeouts,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "election")]
#[command(about = "Run the nine-member council election simulation")]
struct Args {
    /// First loopback port; member Mi listens on base_port + i - 1
    #[arg(long, default_value_t = 5001)]
    base_port: u16,

    /// Membership size (1..=9)
    #[arg(long, default_value_t = 9)]
    members: usize,

    /// Per-phase timeout in seconds
    #[arg(long, default_value_t = 15)]
    phase_timeout: u64,

    /// Pause between scripted stages in seconds
    #[arg(long, default_value_t = 20)]
    stage_pause: u64,

    /// Seed for the members' fault injectors; member Mi uses seed + i.
    /// Omit for OS randomness.
    #[arg(long)]
    seed: Option<u64>,
}

/// The reference member temperaments: M1 answers instantly, M2 has poor
/// connectivity, M3 loses mail, everyone else is merely slow.
fn profile_for(id_number: u64) -> FaultProfile {
    match id_number {
        1 => FaultProfile::Responsive,
        2 => FaultProfile::flaky_slow(),
        3 => FaultProfile::lossy(),
        _ => FaultProfile::variable(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let roster = Roster::loopback(args.members, args.base_port)?;
    let timeouts = Timeouts {
        phase: Duration::from_secs(args.phase_timeout),
    };

    info!("------------- Start Council Election ----------------");

    let mut members = Vec::new();
    for (id, _) in roster.iter() {
        let config = MemberConfig {
            profile: profile_for(id.id_number()),
            seed: args.seed.map(|s| s + id.id_number()),
            timeouts,
            restore: None,
        };
        let member = Member::new(id.clone(), roster.clone(), config)?;
        member.spawn().await?;
        members.push(member);
    }

    // let the inboxes settle before the first proposal
    tokio::time::sleep(Duration::from_secs(2)).await;

    let stage_pause = Duration::from_secs(args.stage_pause);

    run_stage(&members, "M1", false).await?;
    tokio::time::sleep(stage_pause).await;

    info!("-------------- M2 will be offline after sending proposal -------------");
    run_stage(&members, "M2", true).await?;
    tokio::time::sleep(stage_pause).await;

    info!("-------------- M3 will be offline after sending proposal -------------");
    run_stage(&members, "M3", true).await?;

    for member in &members {
        match member.learned() {
            Some(decision) => info!("{} learned '{}'", member.id(), decision.value),
            None => info!("{} learned nothing", member.id()),
        }
    }
    Ok(())
}

/// Run one scripted proposal. With `offline_after_send` the proposer drops
/// off the network right after its PREPAREs go out, so its round is doomed
/// to time out.
async fn run_stage(
    members: &[Arc<Member>],
    proposer: &str,
    offline_after_send: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = MemberId::new(proposer)?;
    let member = members
        .iter()
        .find(|m| *m.id() == id)
        .ok_or_else(|| format!("{proposer} is not in the council"))?;

    info!("--------------- Voting:: {proposer} will send proposal. --------------");
    let round = {
        let member = Arc::clone(member);
        let value = proposer.to_string();
        tokio::spawn(async move { member.propose_value(value).await })
    };

    if offline_after_send {
        tokio::time::sleep(Duration::from_millis(500)).await;
        member.go_offline();
    }

    match round.await? {
        RoundOutcome::Chosen { value, .. } => {
            info!("************     {value} has been elected as Council President!     ************");
        }
        RoundOutcome::Failed { phase } => {
            info!("{proposer}'s proposal did not carry (timed out during {phase:?})");
        }
    }
    Ok(())
}
