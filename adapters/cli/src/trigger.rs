use anyhow::{Context, Result};
use log::{debug, info, warn};
use lucky_draw_core::{Event, ManualRoundSchedule, Participant, PrizeAward, RoundParameters};
use lucky_draw_pool::{query, Pool};
use lucky_draw_system_selector::{run_draw, Config, DrawOutcome};
use serde::Serialize;

/// Campaign rules the trigger applies around the selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RoundPolicy {
    /// Whether participants who already won stay in the draw.
    pub(crate) allow_repeat_wins: bool,
    /// Schedule deciding which rounds honour manual overrides.
    pub(crate) schedule: ManualRoundSchedule,
}

/// Winner line reported back to the operator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct AnnouncedWinner {
    /// Position in the round's winner list, starting at 1.
    pub(crate) rank: usize,
    /// Policy that selected the winner.
    pub(crate) source: String,
    /// Updated participant record.
    pub(crate) participant: Participant,
}

/// Runs one round against `pool` and returns the announced winners.
///
/// When repeat wins are disallowed only participants without a previous win
/// take part; everyone else sits the round out with unchanged counters.
pub(crate) fn run_round(
    pool: &mut Pool,
    params: &RoundParameters,
    prize: &PrizeAward,
    policy: RoundPolicy,
    seed: u64,
) -> Result<Vec<AnnouncedWinner>> {
    let config = Config::new(seed).with_schedule(policy.schedule);
    let mut events = Vec::new();

    let outcome = if policy.allow_repeat_wins {
        run_draw(&config, pool, params, prize, &mut events)
    } else {
        let mut eligible = pool.subset(|participant| !participant.is_win());
        debug!(
            "{} of {} participants have not won yet",
            query::len(&eligible),
            query::len(pool)
        );
        let outcome = run_draw(&config, &mut eligible, params, prize, &mut events);
        if outcome.is_ok() {
            pool.merge(eligible);
        }
        outcome
    }
    .with_context(|| format!("draw round {} failed", params.draw_count))?;

    log_events(&events);
    Ok(announce(&outcome, pool))
}

fn announce(outcome: &DrawOutcome, pool: &Pool) -> Vec<AnnouncedWinner> {
    outcome
        .winners()
        .iter()
        .zip(outcome.participants(pool))
        .enumerate()
        .map(|(index, (winner, participant))| AnnouncedWinner {
            rank: index + 1,
            source: winner.source.to_string(),
            participant: participant.clone(),
        })
        .collect()
}

fn log_events(events: &[Event]) {
    for event in events {
        match event {
            Event::ManualGateClosed { draw_count } => {
                info!("round {draw_count} is not a manual round, manual overrides skipped");
            }
            Event::ManualIdIgnored { uid } => warn!("manual uid {uid} is not in the pool"),
            Event::ManualIdDuplicated { uid } => info!("manual uid {uid} listed more than once"),
            Event::GuaranteeCapped {
                candidates,
                committed,
            } => warn!("{candidates} guaranteed candidates, only {committed} seated this round"),
            Event::WinnerSelected { id, source } => info!("participant {id} selected ({source})"),
            Event::ShortfallReported { requested, filled } => {
                warn!("requested {requested} winners, pool supplied {filled}");
            }
            Event::ParticipantWon { id, wins } => {
                debug!("participant {id} now holds {wins} prizes");
            }
            Event::ParticipantMissed { id, miss_count } => {
                debug!("participant {id} missed, counter at {miss_count}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucky_draw_core::ParticipantId;

    fn pool() -> Pool {
        let mut first = Participant::new(ParticipantId::new(1), "U001");
        first.record_win(&PrizeAward::new("p1", "First prize", "t0"));
        Pool::new(vec![
            first,
            Participant::new(ParticipantId::new(2), "U002").with_miss_count(5),
            Participant::new(ParticipantId::new(3), "U003").with_miss_count(1),
        ])
        .expect("pool")
    }

    fn policy(allow_repeat_wins: bool) -> RoundPolicy {
        RoundPolicy {
            allow_repeat_wins,
            schedule: ManualRoundSchedule::default(),
        }
    }

    #[test]
    fn announces_winners_in_result_order() {
        let mut pool = pool();
        let winners = run_round(
            &mut pool,
            &RoundParameters::new(1, 1),
            &PrizeAward::new("p2", "Second prize", "t1"),
            policy(true),
            3,
        )
        .expect("round resolves");

        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].rank, 1);
        assert_eq!(winners[0].source, "guarantee");
        assert_eq!(winners[0].participant.uid().as_str(), "U002");
        assert_eq!(winners[0].participant.miss_count(), 0);
    }

    #[test]
    fn excluded_previous_winners_keep_their_counters() {
        let mut pool = pool();
        let winners = run_round(
            &mut pool,
            &RoundParameters::new(2, 6).with_manual_ids(["U001"]),
            &PrizeAward::new("p2", "Second prize", "t1"),
            policy(false),
            3,
        )
        .expect("round resolves");

        let uids: Vec<&str> = winners
            .iter()
            .map(|winner| winner.participant.uid().as_str())
            .collect();
        assert_eq!(uids, vec!["U002", "U003"]);

        let previous = query::participant(&pool, ParticipantId::new(1)).expect("participant");
        assert_eq!(previous.win_count(), 1);
        assert_eq!(previous.miss_count(), 0);
    }

    #[test]
    fn fails_when_everyone_already_won_and_repeats_are_disallowed() {
        let mut pool = Pool::new(vec![{
            let mut only = Participant::new(ParticipantId::new(1), "U001");
            only.record_win(&PrizeAward::new("p1", "First prize", "t0"));
            only
        }])
        .expect("pool");
        let before = pool.clone();

        let result = run_round(
            &mut pool,
            &RoundParameters::new(1, 2),
            &PrizeAward::new("p2", "Second prize", "t1"),
            policy(false),
            1,
        );

        assert!(result.is_err());
        assert_eq!(pool, before);
    }
}
