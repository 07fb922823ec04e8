//! Normalized per-faction outcome of one game.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Faction, MapVariant, PlayerId, RuleOptions, ROUND_COLUMNS};

/// Offset added to raw victory points (every faction starts with 20 VP).
pub const SCORE_BASELINE: i64 = 20;

pub const FAVOR_TILES: usize = 12;
pub const TOWN_TILES: usize = 8;
pub const BONUS_TILES: usize = 10;

/// Favor tile round for "never taken". Favors can be taken in round 0,
/// so 0 cannot be used.
pub const FAVOR_NEVER: u8 = 9;

/// Town tile round for "never taken".
pub const TOWN_NEVER: u8 = 0;

/// Highest leech bucket.
pub const LEECH_BUCKET_MAX: u8 = 4;

/// Building tiers in upgrade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Building {
    Dwelling,
    TradingPost,
    Temple,
    Sanctuary,
    Stronghold,
}

impl Building {
    pub const ALL: [Building; 5] = [
        Building::Dwelling,
        Building::TradingPost,
        Building::Temple,
        Building::Sanctuary,
        Building::Stronghold,
    ];

    /// Event counting how many buildings of this tier were created.
    pub fn event_key(&self) -> &'static str {
        match self {
            Building::Dwelling => "build:D",
            Building::TradingPost => "upgrade:TP",
            Building::Temple => "upgrade:TE",
            Building::Sanctuary => "upgrade:SA",
            Building::Stronghold => "upgrade:SH",
        }
    }

    /// Tiers a building of this tier can be upgraded into.
    pub fn upgrades(&self) -> &'static [Building] {
        match self {
            Building::Dwelling => &[Building::TradingPost],
            Building::TradingPost => &[Building::Temple, Building::Stronghold],
            Building::Temple => &[Building::Sanctuary],
            Building::Sanctuary | Building::Stronghold => &[],
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Buildings held at the end of each round, per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildTrajectory([[i64; ROUND_COLUMNS]; 5]);

impl BuildTrajectory {
    /// Derive holdings from per-round creation counts (indexed by
    /// [`Building::index`]). A tier gains what was built into it and loses
    /// what was upgraded out of it.
    ///
    /// Returns the first (tier, round) whose holding goes negative.
    pub fn from_created(
        created: &[[i64; ROUND_COLUMNS]; 5],
    ) -> Result<Self, (Building, usize)> {
        let mut held = [[0; ROUND_COLUMNS]; 5];
        for tier in Building::ALL {
            let mut running = 0;
            for round in 0..ROUND_COLUMNS {
                let promoted: i64 = tier
                    .upgrades()
                    .iter()
                    .map(|up| created[up.index()][round])
                    .sum();
                running += created[tier.index()][round] - promoted;
                if running < 0 {
                    return Err((tier, round));
                }
                held[tier.index()][round] = running;
            }
        }
        Ok(Self(held))
    }

    pub fn holding(&self, tier: Building, round: usize) -> i64 {
        self.0[tier.index()][round]
    }

    /// Holdings of every tier at the end of a round.
    pub fn at_round(&self, round: usize) -> [i64; 5] {
        let mut column = [0; 5];
        for tier in Building::ALL {
            column[tier.index()] = self.holding(tier, round);
        }
        column
    }

    pub fn tier(&self, tier: Building) -> &[i64; ROUND_COLUMNS] {
        &self.0[tier.index()]
    }
}

/// Two-digit year plus the month as one hex digit (`"17c"` = Dec 2017).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period(String);

impl Period {
    /// Parse from the server's `YYYY-MM-DD ...` timestamp.
    pub fn from_timestamp(timestamp: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(timestamp.get(..10)?, "%Y-%m-%d").ok()?;
        Some(Self::from_date(date))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{:02}{:x}", date.year() % 100, date.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One faction's result in one game, flattened from the event tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOutcome {
    /// Game identifier
    pub game_id: String,

    /// Faction played
    pub faction: Faction,

    /// Player account (or anonymous stand-in)
    pub player: PlayerId,

    /// Declared player count
    pub player_count: u32,

    /// Final VP plus the baseline
    pub score: i64,

    /// Score minus the game's average score
    pub margin: f64,

    /// Map played
    pub map: MapVariant,

    /// Buildings held per tier and round
    pub builds: BuildTrajectory,

    /// Round each favor tile was taken, [`FAVOR_NEVER`] if never
    pub favor_rounds: [u8; FAVOR_TILES],

    /// Round each town tile was taken, [`TOWN_NEVER`] if never
    pub town_rounds: [u8; TOWN_TILES],

    /// Bonus tile (0-based) picked in each round, if any
    pub bonus_by_round: [Option<u8>; ROUND_COLUMNS],

    /// Per bonus tile (index 1..=10), the most picks it got in any round
    /// across the whole table
    pub all_bonus_picks: [i64; BONUS_TILES + 1],

    /// Turn order position per round ("1".."6")
    pub turn_order: BTreeMap<String, u8>,

    /// Leeched power per round, bucketed
    pub leech_buckets: [u8; ROUND_COLUMNS],

    /// Rule options of the game
    pub options: RuleOptions,

    /// Round scoring tile id per round ("1".."6")
    pub score_tiles: BTreeMap<String, u32>,

    /// Players dropped during the game
    pub dropped_players: i64,

    /// Some player holds more than one seat
    pub multi_role: bool,

    /// Declared player count minus factions the game counted
    pub missing_roles: i64,

    /// 1 + opponents with a strictly higher score
    pub rank: u32,

    /// Month of the last update
    pub period: Period,
}

impl NormalizedOutcome {
    /// Raw victory points.
    pub fn vp(&self) -> i64 {
        self.score - SCORE_BASELINE
    }

    /// First bonus tile picked (the one held entering round 1).
    pub fn first_bonus(&self) -> Option<u8> {
        self.bonus_by_round.iter().flatten().next().copied()
    }

    pub fn score_tile(&self, round: u8) -> Option<u32> {
        self.score_tiles.get(&round.to_string()).copied()
    }

    pub fn turn_position(&self, round: u8) -> Option<u8> {
        self.turn_order.get(&round.to_string()).copied()
    }

    /// Favor tile indices (0-based) taken by the given round.
    pub fn favors_by_round(&self, round: u8) -> impl Iterator<Item = usize> + '_ {
        self.favor_rounds
            .iter()
            .enumerate()
            .filter(move |(_, r)| **r <= round)
            .map(|(i, _)| i)
    }

    /// Set the rank once all opponents are known.
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }
}

/// Bucket leeched power: one step per 4 power, capped.
pub fn leech_bucket(power: i64) -> u8 {
    (power.max(0) / 4).min(LEECH_BUCKET_MAX as i64) as u8
}
