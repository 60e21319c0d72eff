#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the lucky draw engine.
//!
//! This crate defines the records and the message surface that connect the
//! draw-trigger adapters, the authoritative participant pool, and the pure
//! selection system. The selector resolves a round into a [`Command`], the
//! pool executes that command via its `apply` entry point, and both report
//! what happened as [`Event`] values that adapters may log or audit.

use std::{fmt, num::NonZeroU32};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Consecutive misses after which a participant is guaranteed a win.
pub const DEFAULT_MISS_THRESHOLD: u32 = 5;

/// Number of rounds between two manual rounds.
pub const MANUAL_ROUND_PERIOD: NonZeroU32 = match NonZeroU32::new(6) {
    Some(period) => period,
    None => unreachable!(),
};

/// Commands that express all permissible pool mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Commits the outcome of a draw round to every participant in the pool.
    RecordRound {
        /// Participants that won the round, in result order.
        winners: Vec<ParticipantId>,
        /// Prize appended to the history of every winner.
        prize: PrizeAward,
    },
}

/// Events broadcast while a round is resolved and committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Manual overrides were configured but the round is not a manual round.
    ManualGateClosed {
        /// Sequence number of the round that kept the gate closed.
        draw_count: u32,
    },
    /// A manual uid did not match any participant in the pool.
    ManualIdIgnored {
        /// Identifier that was skipped.
        uid: Uid,
    },
    /// A manual uid was listed more than once.
    ManualIdDuplicated {
        /// Identifier whose repeated entries were dropped.
        uid: Uid,
    },
    /// More participants qualified for a guarantee than the round can seat.
    GuaranteeCapped {
        /// Number of manual and automatic candidates.
        candidates: u32,
        /// Number of candidates committed as winners.
        committed: u32,
    },
    /// Confirms that a participant was selected as a winner.
    WinnerSelected {
        /// Identifier of the selected participant.
        id: ParticipantId,
        /// Policy responsible for the selection.
        source: SelectionSource,
    },
    /// The pool could not supply every requested winner.
    ShortfallReported {
        /// Winners requested by the round parameters.
        requested: u32,
        /// Winners actually selected.
        filled: u32,
    },
    /// Confirms that a winner's draw state was updated.
    ParticipantWon {
        /// Identifier of the winner.
        id: ParticipantId,
        /// Total number of prizes held after the update.
        wins: u32,
    },
    /// Confirms that a non-winner's miss counter advanced.
    ParticipantMissed {
        /// Identifier of the participant.
        id: ParticipantId,
        /// Miss counter after the update.
        miss_count: u32,
    },
}

/// Numeric identifier of a participant, unique within a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(u32);

impl ParticipantId {
    /// Creates a new participant identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Stable external identifier used to address participants in manual overrides.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Creates a new uid from the provided string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Prize granted to every winner of a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeAward {
    /// Identifier of the prize, appended to `prizeId`.
    pub prize_id: String,
    /// Display name of the prize, appended to `prizeName`.
    pub prize_name: String,
    /// Timestamp of the award, appended to `prizeTime`.
    pub awarded_at: String,
}

impl PrizeAward {
    /// Creates a prize award from its three recorded values.
    #[must_use]
    pub fn new(
        prize_id: impl Into<String>,
        prize_name: impl Into<String>,
        awarded_at: impl Into<String>,
    ) -> Self {
        Self {
            prize_id: prize_id.into(),
            prize_name: prize_name.into(),
            awarded_at: awarded_at.into(),
        }
    }
}

/// One person eligible to win.
///
/// Field names serialize in `camelCase` so stored pools keep the layout used
/// by the participant lists they are imported from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    id: ParticipantId,
    uid: Uid,
    #[serde(default)]
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    identity: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    is_win: bool,
    #[serde(default)]
    miss_count: u32,
    #[serde(default)]
    prize_name: Vec<String>,
    #[serde(default)]
    prize_id: Vec<String>,
    #[serde(default)]
    prize_time: Vec<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    create_time: String,
    #[serde(default)]
    update_time: String,
}

impl Participant {
    /// Creates a participant that has never won and never missed a round.
    #[must_use]
    pub fn new(id: ParticipantId, uid: impl Into<Uid>) -> Self {
        Self {
            id,
            uid: uid.into(),
            uuid: String::new(),
            name: String::new(),
            department: String::new(),
            identity: String::new(),
            avatar: String::new(),
            is_win: false,
            miss_count: 0,
            prize_name: Vec::new(),
            prize_id: Vec::new(),
            prize_time: Vec::new(),
            x: 0.0,
            y: 0.0,
            create_time: String::new(),
            update_time: String::new(),
        }
    }

    /// Overrides the opaque uuid token.
    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Overrides the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the department label.
    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// Overrides the role or category label.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Overrides the consecutive miss counter.
    #[must_use]
    pub fn with_miss_count(mut self, miss_count: u32) -> Self {
        self.miss_count = miss_count;
        self
    }

    /// Identifier of the participant within its pool.
    #[must_use]
    pub const fn id(&self) -> ParticipantId {
        self.id
    }

    /// External identifier used by manual overrides.
    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Opaque stable token.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Department label.
    #[must_use]
    pub fn department(&self) -> &str {
        &self.department
    }

    /// Role or category label.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Opaque avatar reference.
    #[must_use]
    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    /// Reports whether the participant has won during the campaign.
    #[must_use]
    pub const fn is_win(&self) -> bool {
        self.is_win
    }

    /// Consecutive rounds lost since the last win or since joining.
    #[must_use]
    pub const fn miss_count(&self) -> u32 {
        self.miss_count
    }

    /// Names of the prizes won, oldest first.
    #[must_use]
    pub fn prize_names(&self) -> &[String] {
        &self.prize_name
    }

    /// Identifiers of the prizes won, oldest first.
    #[must_use]
    pub fn prize_ids(&self) -> &[String] {
        &self.prize_id
    }

    /// Award timestamps of the prizes won, oldest first.
    #[must_use]
    pub fn prize_times(&self) -> &[String] {
        &self.prize_time
    }

    /// Number of prizes won.
    #[must_use]
    pub fn win_count(&self) -> usize {
        self.prize_name.len()
    }

    /// Presentation position, never read by selection.
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Creation timestamp as stored.
    #[must_use]
    pub fn create_time(&self) -> &str {
        &self.create_time
    }

    /// Last update timestamp as stored.
    #[must_use]
    pub fn update_time(&self) -> &str {
        &self.update_time
    }

    /// Reports whether the three prize sequences have the same length.
    #[must_use]
    pub fn prize_history_is_aligned(&self) -> bool {
        self.prize_name.len() == self.prize_id.len()
            && self.prize_name.len() == self.prize_time.len()
    }

    /// Marks the participant as a winner of the provided prize.
    pub fn record_win(&mut self, prize: &PrizeAward) {
        self.is_win = true;
        self.miss_count = 0;
        self.prize_name.push(prize.prize_name.clone());
        self.prize_id.push(prize.prize_id.clone());
        self.prize_time.push(prize.awarded_at.clone());
    }

    /// Advances the miss counter after a lost round.
    pub fn record_miss(&mut self) {
        self.miss_count = self.miss_count.saturating_add(1);
    }
}

/// Ephemeral parameters supplied for one draw round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundParameters {
    /// Number of winners requested.
    pub lucky_count: u32,
    /// Sequence number of the round within its campaign.
    pub draw_count: u32,
    /// Uids guaranteed to win on manual rounds, highest priority first.
    pub manual_guaranteed_ids: Vec<Uid>,
    /// Miss counter at which a participant is guaranteed a win.
    pub miss_threshold: u32,
}

impl RoundParameters {
    /// Creates round parameters without manual overrides and the default threshold.
    #[must_use]
    pub fn new(lucky_count: u32, draw_count: u32) -> Self {
        Self {
            lucky_count,
            draw_count,
            manual_guaranteed_ids: Vec::new(),
            miss_threshold: DEFAULT_MISS_THRESHOLD,
        }
    }

    /// Replaces the manual override list.
    #[must_use]
    pub fn with_manual_ids<I, U>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Uid>,
    {
        self.manual_guaranteed_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the guarantee threshold.
    #[must_use]
    pub fn with_miss_threshold(mut self, miss_threshold: u32) -> Self {
        self.miss_threshold = miss_threshold;
        self
    }

    /// Checks the numeric parameters before any selection happens.
    pub fn validate(&self) -> Result<(), DrawError> {
        if self.lucky_count < 1 {
            return Err(DrawError::InvalidRoundParameters(
                InvalidParameter::LuckyCount,
            ));
        }
        if self.miss_threshold < 1 {
            return Err(DrawError::InvalidRoundParameters(
                InvalidParameter::MissThreshold,
            ));
        }
        Ok(())
    }
}

/// Decides which rounds honour manual overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ManualRoundSchedule {
    period: NonZeroU32,
}

impl Default for ManualRoundSchedule {
    fn default() -> Self {
        Self::every(MANUAL_ROUND_PERIOD)
    }
}

impl ManualRoundSchedule {
    /// Creates a schedule that opens the manual gate every `period` rounds.
    #[must_use]
    pub const fn every(period: NonZeroU32) -> Self {
        Self { period }
    }

    /// Number of rounds between two manual rounds.
    #[must_use]
    pub const fn period(&self) -> NonZeroU32 {
        self.period
    }

    /// Reports whether the provided round is a manual round.
    #[must_use]
    pub const fn is_manual_round(&self, draw_count: u32) -> bool {
        draw_count % self.period.get() == 0
    }
}

/// Reports whether the provided round is a manual round under the default schedule.
#[must_use]
pub const fn is_manual_round(draw_count: u32) -> bool {
    draw_count % MANUAL_ROUND_PERIOD.get() == 0
}

/// Policy that selected a winner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionSource {
    /// Listed in the manual overrides of a manual round.
    Manual,
    /// Reached the miss threshold.
    Guarantee,
    /// Drawn uniformly from the ordinary sub-pool.
    Random,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Manual => "manual",
            Self::Guarantee => "guarantee",
            Self::Random => "random",
        };
        f.pad(label)
    }
}

/// Round parameter that failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum InvalidParameter {
    /// `lucky_count` was zero.
    #[error("lucky count must be at least 1")]
    LuckyCount,
    /// `miss_threshold` was zero.
    #[error("miss threshold must be at least 1")]
    MissThreshold,
}

/// Failures that abort a draw round before any participant is mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The pool contains no participants.
    #[error("participant pool is empty")]
    EmptyPool,
    /// The round parameters are out of range.
    #[error("invalid round parameters: {0}")]
    InvalidRoundParameters(InvalidParameter),
}
