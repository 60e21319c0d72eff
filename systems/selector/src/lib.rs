#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic draw selection system.
//!
//! A round is resolved in three prioritized passes over the pool: manual
//! overrides (only on manual rounds), automatic guarantees for participants
//! whose miss counter reached the threshold, and a uniform random fill from
//! the remaining ordinary participants. [`run_draw`] validates the round,
//! resolves it against an immutable view of the pool and only then commits
//! the outcome through [`lucky_draw_pool::apply`], so a failed round never
//! touches participant state.

use std::collections::HashSet;

use lucky_draw_core::{
    Command, DrawError, Event, ManualRoundSchedule, Participant, ParticipantId, PrizeAward,
    RoundParameters, SelectionSource, Uid,
};
use lucky_draw_pool::{self as pool, query, Pool};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the selector.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    schedule: ManualRoundSchedule,
}

impl Config {
    /// Creates a configuration using the provided seed and the default manual round schedule.
    #[must_use]
    pub fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            schedule: ManualRoundSchedule::default(),
        }
    }

    /// Replaces the schedule that decides which rounds honour manual overrides.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: ManualRoundSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Seed of the random source used for the fill pass.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Schedule used by the manual gate.
    #[must_use]
    pub const fn schedule(&self) -> ManualRoundSchedule {
        self.schedule
    }
}

/// Winner of a round together with the policy that selected it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Winner {
    /// Identifier of the winning participant.
    pub id: ParticipantId,
    /// Uid of the winning participant.
    pub uid: Uid,
    /// Policy responsible for the selection.
    pub source: SelectionSource,
}

/// Result of resolving one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawOutcome {
    winners: Vec<Winner>,
    requested: u32,
}

impl DrawOutcome {
    /// Winners in result order: guaranteed winners first, then random winners.
    #[must_use]
    pub fn winners(&self) -> &[Winner] {
        &self.winners
    }

    /// Identifiers of the winners in result order.
    pub fn winner_ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.winners.iter().map(|winner| winner.id)
    }

    /// Number of winners requested by the round parameters.
    #[must_use]
    pub const fn requested(&self) -> u32 {
        self.requested
    }

    /// Number of requested winners the pool could not supply.
    #[must_use]
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(count_u32(self.winners.len()))
    }

    /// Reports whether every requested winner was selected.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.shortfall() == 0
    }

    /// Resolves the winners to their records in `pool`, in result order.
    pub fn participants<'a>(
        &'a self,
        pool: &'a Pool,
    ) -> impl Iterator<Item = &'a Participant> + 'a {
        self.winners
            .iter()
            .filter_map(move |winner| query::participant(pool, winner.id))
    }
}

/// Pure system that resolves draw rounds against an immutable participant view.
#[derive(Debug)]
pub struct Selector {
    rng: ChaCha8Rng,
    schedule: ManualRoundSchedule,
    scratch: Vec<usize>,
}

impl Selector {
    /// Creates a selector with its own random source seeded from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            schedule: config.schedule,
            scratch: Vec::new(),
        }
    }

    /// Decides the winners of one round without mutating any participant.
    pub fn select(
        &mut self,
        participants: &[Participant],
        params: &RoundParameters,
        out_events: &mut Vec<Event>,
    ) -> Result<DrawOutcome, DrawError> {
        if participants.is_empty() {
            return Err(DrawError::EmptyPool);
        }
        params.validate()?;

        let lucky_count = usize::try_from(params.lucky_count).unwrap_or(usize::MAX);
        let threshold = params.miss_threshold;
        let mut taken = vec![false; participants.len()];

        let mut guaranteed: Vec<(usize, SelectionSource)> = self
            .resolve_manual(participants, params, out_events)
            .into_iter()
            .map(|index| (index, SelectionSource::Manual))
            .collect();
        for &(index, _) in &guaranteed {
            taken[index] = true;
        }

        for (index, participant) in participants.iter().enumerate() {
            if !taken[index] && participant.miss_count() >= threshold {
                guaranteed.push((index, SelectionSource::Guarantee));
            }
        }

        let candidates = guaranteed.len();
        let committed = candidates.min(lucky_count);
        if committed < candidates {
            out_events.push(Event::GuaranteeCapped {
                candidates: count_u32(candidates),
                committed: count_u32(committed),
            });
        }
        guaranteed.truncate(committed);
        for &(index, _) in &guaranteed {
            taken[index] = true;
        }

        let remaining = lucky_count - committed;
        let mut selection = guaranteed;
        if remaining > 0 {
            self.scratch.clear();
            self.scratch.extend(
                participants
                    .iter()
                    .enumerate()
                    .filter(|(index, participant)| {
                        !taken[*index] && participant.miss_count() < threshold
                    })
                    .map(|(index, _)| index),
            );
            let (drawn, _) = self.scratch.partial_shuffle(&mut self.rng, remaining);
            selection.extend(drawn.iter().map(|&index| (index, SelectionSource::Random)));
        }

        let winners: Vec<Winner> = selection
            .into_iter()
            .map(|(index, source)| {
                let participant = &participants[index];
                Winner {
                    id: participant.id(),
                    uid: participant.uid().clone(),
                    source,
                }
            })
            .collect();

        for winner in &winners {
            out_events.push(Event::WinnerSelected {
                id: winner.id,
                source: winner.source,
            });
        }

        let outcome = DrawOutcome {
            winners,
            requested: params.lucky_count,
        };
        if !outcome.is_filled() {
            out_events.push(Event::ShortfallReported {
                requested: outcome.requested,
                filled: count_u32(outcome.winners.len()),
            });
        }

        Ok(outcome)
    }

    fn resolve_manual(
        &self,
        participants: &[Participant],
        params: &RoundParameters,
        out_events: &mut Vec<Event>,
    ) -> Vec<usize> {
        if params.manual_guaranteed_ids.is_empty() {
            return Vec::new();
        }
        if !self.schedule.is_manual_round(params.draw_count) {
            out_events.push(Event::ManualGateClosed {
                draw_count: params.draw_count,
            });
            return Vec::new();
        }

        let mut seen = HashSet::with_capacity(params.manual_guaranteed_ids.len());
        let mut resolved = Vec::with_capacity(params.manual_guaranteed_ids.len());
        for uid in &params.manual_guaranteed_ids {
            if !seen.insert(uid) {
                out_events.push(Event::ManualIdDuplicated { uid: uid.clone() });
                continue;
            }
            match participants
                .iter()
                .position(|participant| participant.uid() == uid)
            {
                Some(index) => resolved.push(index),
                None => out_events.push(Event::ManualIdIgnored { uid: uid.clone() }),
            }
        }
        resolved
    }
}

/// Runs one draw round: selects the winners and commits the outcome to `pool`.
///
/// A fresh random source is seeded from `config` for every call. On error the
/// pool is left untouched.
pub fn run_draw(
    config: &Config,
    pool: &mut Pool,
    params: &RoundParameters,
    prize: &PrizeAward,
    out_events: &mut Vec<Event>,
) -> Result<DrawOutcome, DrawError> {
    let mut selector = Selector::new(*config);
    let outcome = selector.select(query::participants(pool), params, out_events)?;

    pool::apply(
        pool,
        Command::RecordRound {
            winners: outcome.winner_ids().collect(),
            prize: prize.clone(),
        },
        out_events,
    );

    Ok(outcome)
}

fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: u32, uid: &str) -> Participant {
        Participant::new(ParticipantId::new(id), uid)
    }

    #[test]
    fn manual_resolution_skips_duplicates_and_unknown_uids() {
        let selector = Selector::new(Config::new(1));
        let participants = vec![person(1, "U001"), person(2, "U002")];
        let params = RoundParameters::new(2, 6).with_manual_ids(["U002", "U404", "U002", "U001"]);
        let mut events = Vec::new();

        let resolved = selector.resolve_manual(&participants, &params, &mut events);

        assert_eq!(resolved, vec![1, 0]);
        assert_eq!(
            events,
            vec![
                Event::ManualIdIgnored {
                    uid: Uid::from("U404"),
                },
                Event::ManualIdDuplicated {
                    uid: Uid::from("U002"),
                },
            ]
        );
    }

    #[test]
    fn manual_resolution_reports_closed_gate() {
        let selector = Selector::new(Config::new(1));
        let participants = vec![person(1, "U001")];
        let params = RoundParameters::new(1, 5).with_manual_ids(["U001"]);
        let mut events = Vec::new();

        let resolved = selector.resolve_manual(&participants, &params, &mut events);

        assert!(resolved.is_empty());
        assert_eq!(events, vec![Event::ManualGateClosed { draw_count: 5 }]);
    }

    #[test]
    fn manual_resolution_is_silent_without_overrides() {
        let selector = Selector::new(Config::new(1));
        let participants = vec![person(1, "U001")];
        let mut events = Vec::new();

        let resolved =
            selector.resolve_manual(&participants, &RoundParameters::new(1, 3), &mut events);

        assert!(resolved.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn shortfall_counts_missing_winners() {
        let outcome = DrawOutcome {
            winners: vec![Winner {
                id: ParticipantId::new(1),
                uid: Uid::from("U001"),
                source: SelectionSource::Random,
            }],
            requested: 3,
        };
        assert_eq!(outcome.shortfall(), 2);
        assert!(!outcome.is_filled());
    }
}
