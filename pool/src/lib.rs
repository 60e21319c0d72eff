#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative participant pool state for the lucky draw engine.

use std::collections::HashSet;

use lucky_draw_core::{Command, Event, Participant, ParticipantId, Uid};
use thiserror::Error;

/// Reasons a set of participant records cannot form a pool.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Two records share the same numeric identifier.
    #[error("participant id {0} appears more than once")]
    DuplicateId(ParticipantId),
    /// Two records share the same uid.
    #[error("participant uid '{0}' appears more than once")]
    DuplicateUid(Uid),
    /// A record's prize name, id and time sequences differ in length.
    #[error("participant {0} has prize sequences of different lengths")]
    MisalignedPrizeHistory(ParticipantId),
}

/// Ordered set of participants owned by one campaign.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pool {
    participants: Vec<Participant>,
}

impl Pool {
    /// Creates a pool after checking identifier uniqueness and prize history alignment.
    pub fn new(participants: Vec<Participant>) -> Result<Self, PoolError> {
        let mut ids = HashSet::with_capacity(participants.len());
        let mut uids = HashSet::with_capacity(participants.len());

        for participant in &participants {
            if !ids.insert(participant.id()) {
                return Err(PoolError::DuplicateId(participant.id()));
            }
            if !uids.insert(participant.uid()) {
                return Err(PoolError::DuplicateUid(participant.uid().clone()));
            }
            if !participant.prize_history_is_aligned() {
                return Err(PoolError::MisalignedPrizeHistory(participant.id()));
            }
        }

        Ok(Self { participants })
    }

    /// Copies the participants accepted by `keep` into a new pool, preserving order.
    #[must_use]
    pub fn subset(&self, mut keep: impl FnMut(&Participant) -> bool) -> Self {
        Self {
            participants: self
                .participants
                .iter()
                .filter(|participant| keep(participant))
                .cloned()
                .collect(),
        }
    }

    /// Writes the records of `updated` back over the records sharing their id.
    ///
    /// Records whose id is unknown to this pool are dropped.
    pub fn merge(&mut self, updated: Pool) {
        for record in updated.participants {
            if let Some(index) = self.index_of(record.id()) {
                self.participants[index] = record;
            }
        }
    }

    /// Consumes the pool, yielding the records for persistence.
    #[must_use]
    pub fn into_participants(self) -> Vec<Participant> {
        self.participants
    }

    fn index_of(&self, id: ParticipantId) -> Option<usize> {
        self.participants
            .iter()
            .position(|participant| participant.id() == id)
    }
}

/// Applies the provided command to the pool, mutating state deterministically.
pub fn apply(pool: &mut Pool, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::RecordRound { winners, prize } => {
            let winners: HashSet<ParticipantId> = winners.into_iter().collect();
            for participant in pool.participants.iter_mut() {
                let id = participant.id();
                if winners.contains(&id) {
                    participant.record_win(&prize);
                    out_events.push(Event::ParticipantWon {
                        id,
                        wins: u32::try_from(participant.win_count()).unwrap_or(u32::MAX),
                    });
                } else {
                    participant.record_miss();
                    out_events.push(Event::ParticipantMissed {
                        id,
                        miss_count: participant.miss_count(),
                    });
                }
            }
        }
    }
}

/// Query functions that provide read-only access to the pool state.
pub mod query {
    use super::Pool;
    use lucky_draw_core::{Participant, ParticipantId, Uid};

    /// Provides the participants in pool order.
    #[must_use]
    pub fn participants(pool: &Pool) -> &[Participant] {
        &pool.participants
    }

    /// Number of participants in the pool.
    #[must_use]
    pub fn len(pool: &Pool) -> usize {
        pool.participants.len()
    }

    /// Reports whether the pool holds no participants.
    #[must_use]
    pub fn is_empty(pool: &Pool) -> bool {
        pool.participants.is_empty()
    }

    /// Looks up a participant by numeric identifier.
    #[must_use]
    pub fn participant(pool: &Pool, id: ParticipantId) -> Option<&Participant> {
        pool.participants
            .iter()
            .find(|participant| participant.id() == id)
    }

    /// Looks up a participant by uid.
    #[must_use]
    pub fn by_uid<'a>(pool: &'a Pool, uid: &Uid) -> Option<&'a Participant> {
        pool.participants
            .iter()
            .find(|participant| participant.uid() == uid)
    }

    /// Participants that have won at least once, in pool order.
    pub fn winners_so_far(pool: &Pool) -> impl Iterator<Item = &Participant> {
        pool.participants.iter().filter(|participant| participant.is_win())
    }

    /// Participants whose miss counter reached `threshold`, in pool order.
    pub fn guaranteed_candidates(
        pool: &Pool,
        threshold: u32,
    ) -> impl Iterator<Item = &Participant> {
        pool.participants
            .iter()
            .filter(move |participant| participant.miss_count() >= threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucky_draw_core::PrizeAward;

    fn person(id: u32, miss_count: u32) -> Participant {
        Participant::new(ParticipantId::new(id), format!("U{id:03}")).with_miss_count(miss_count)
    }

    fn prize() -> PrizeAward {
        PrizeAward::new("p1", "First prize", "2024-02-01T12:00:00Z")
    }

    #[test]
    fn rejects_duplicate_ids() {
        let duplicate = Participant::new(ParticipantId::new(1), "U999");
        let result = Pool::new(vec![person(1, 0), duplicate]);
        assert_eq!(result, Err(PoolError::DuplicateId(ParticipantId::new(1))));
    }

    #[test]
    fn rejects_duplicate_uids() {
        let duplicate = Participant::new(ParticipantId::new(2), "U001");
        let result = Pool::new(vec![person(1, 0), duplicate]);
        assert_eq!(result, Err(PoolError::DuplicateUid(Uid::from("U001"))));
    }

    #[test]
    fn rejects_misaligned_prize_history() {
        let json = r#"{"id": 4, "uid": "U004", "prizeName": ["a"], "prizeId": []}"#;
        let broken: Participant = serde_json::from_str(json).expect("participant parses");
        let result = Pool::new(vec![broken]);
        assert_eq!(
            result,
            Err(PoolError::MisalignedPrizeHistory(ParticipantId::new(4)))
        );
    }

    #[test]
    fn record_round_updates_winners_and_misses() {
        let mut pool = Pool::new(vec![person(1, 5), person(2, 3), person(3, 0)]).expect("pool");
        let mut events = Vec::new();

        apply(
            &mut pool,
            Command::RecordRound {
                winners: vec![ParticipantId::new(1)],
                prize: prize(),
            },
            &mut events,
        );

        let winner = query::participant(&pool, ParticipantId::new(1)).expect("winner");
        assert!(winner.is_win());
        assert_eq!(winner.miss_count(), 0);
        assert_eq!(winner.prize_ids(), ["p1"]);

        let loser = query::participant(&pool, ParticipantId::new(2)).expect("loser");
        assert!(!loser.is_win());
        assert_eq!(loser.miss_count(), 4);
        assert!(loser.prize_names().is_empty());

        assert_eq!(
            events,
            vec![
                Event::ParticipantWon {
                    id: ParticipantId::new(1),
                    wins: 1,
                },
                Event::ParticipantMissed {
                    id: ParticipantId::new(2),
                    miss_count: 4,
                },
                Event::ParticipantMissed {
                    id: ParticipantId::new(3),
                    miss_count: 1,
                },
            ]
        );
    }

    #[test]
    fn record_round_ignores_unknown_winner_ids() {
        let mut pool = Pool::new(vec![person(1, 2)]).expect("pool");
        let mut events = Vec::new();

        apply(
            &mut pool,
            Command::RecordRound {
                winners: vec![ParticipantId::new(42)],
                prize: prize(),
            },
            &mut events,
        );

        let only = query::participant(&pool, ParticipantId::new(1)).expect("participant");
        assert_eq!(only.miss_count(), 3);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn subset_and_merge_write_back_by_id() {
        let mut pool = Pool::new(vec![person(1, 1), person(2, 2), person(3, 3)]).expect("pool");
        let mut subset = pool.subset(|participant| participant.miss_count() >= 2);
        assert_eq!(query::len(&subset), 2);

        let mut events = Vec::new();
        apply(
            &mut subset,
            Command::RecordRound {
                winners: vec![ParticipantId::new(3)],
                prize: prize(),
            },
            &mut events,
        );
        pool.merge(subset);

        let misses: Vec<u32> = pool
            .into_participants()
            .iter()
            .map(Participant::miss_count)
            .collect();
        assert_eq!(misses, vec![1, 3, 0]);
    }

    #[test]
    fn guaranteed_candidates_follow_pool_order() {
        let pool = Pool::new(vec![person(1, 5), person(2, 3), person(3, 6), person(4, 0)])
            .expect("pool");
        let ids: Vec<u32> = query::guaranteed_candidates(&pool, 5)
            .map(|participant| participant.id().get())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn lookups_by_uid() {
        let pool = Pool::new(vec![person(1, 0), person(2, 0)]).expect("pool");
        let found = query::by_uid(&pool, &Uid::from("U002")).expect("participant");
        assert_eq!(found.id(), ParticipantId::new(2));
        assert!(query::by_uid(&pool, &Uid::from("U404")).is_none());
        assert_eq!(query::winners_so_far(&pool).count(), 0);
        assert!(!query::is_empty(&pool));
    }
}
