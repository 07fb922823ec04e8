//! Raw game records as published by the game server.
//!
//! Only the fields the extractor reads are modelled; everything else in the
//! server's JSON is ignored by serde.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Aggregate key present in every round map.
pub const ALL_ROUNDS: &str = "all";

/// Number of round columns tracked per event (round 0 is setup).
pub const ROUND_COLUMNS: usize = 7;

/// One counted event, broken down by round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    /// Round number as string ("0".."6") or "all" -> count
    #[serde(default)]
    pub round: BTreeMap<String, i64>,

    /// Top-level total, only written by a few global events (e.g. `drop-faction`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<i64>,
}

impl EventEntry {
    /// Count for a round key, 0 when the round is absent.
    pub fn count(&self, round: &str) -> i64 {
        self.round.get(round).copied().unwrap_or(0)
    }

    /// Aggregate over all rounds.
    pub fn total(&self) -> Option<i64> {
        self.round.get(ALL_ROUNDS).copied()
    }

    /// Per-round counts for rounds 0..=6.
    pub fn by_round(&self) -> [i64; ROUND_COLUMNS] {
        let mut counts = [0; ROUND_COLUMNS];
        for (r, slot) in counts.iter_mut().enumerate() {
            *slot = self.count(&r.to_string());
        }
        counts
    }

    /// Numeric rounds this event happened in, with the "all" key stripped.
    pub fn rounds(&self) -> Vec<u8> {
        let mut rounds: Vec<u8> = self
            .round
            .keys()
            .filter(|k| k.as_str() != ALL_ROUNDS)
            .filter_map(|k| k.parse().ok())
            .collect();
        rounds.sort_unstable();
        rounds
    }

    /// Earliest round this event happened in.
    pub fn first_round(&self) -> Option<u8> {
        self.rounds().first().copied()
    }
}

/// Events keyed by event name (`build:D`, `favor:FAV3`, ...).
pub type EventMap = HashMap<String, EventEntry>;

/// Event tree of a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameEvents {
    /// Game-wide events: options, score tiles, counters
    #[serde(default)]
    pub global: EventMap,

    /// Per-faction events; the `all` entry sums every faction
    #[serde(default)]
    pub faction: HashMap<String, EventMap>,
}

/// A seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Faction (role) name, or a reserved token such as `player3`
    pub faction: String,

    /// Player account, null for anonymous seats
    pub player: Option<String>,
}

/// One finished game as it comes out of the server's event dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game identifier
    pub game: String,

    /// Map hash
    pub base_map: String,

    /// Declared number of players
    pub player_count: u32,

    /// Nested event tree
    pub events: GameEvents,

    /// Seats
    pub factions: Vec<Participant>,

    /// Last update timestamp (`YYYY-MM-DD HH:MM:SS`)
    pub last_update: String,
}

impl GameRecord {
    /// Events of one faction.
    pub fn faction_events(&self, faction: &str) -> Option<&EventMap> {
        self.events.faction.get(faction)
    }

    /// Events summed over every faction.
    pub fn all_faction_events(&self) -> Option<&EventMap> {
        self.events.faction.get(ALL_ROUNDS)
    }

    /// A global event by name.
    pub fn global_event(&self, name: &str) -> Option<&EventEntry> {
        self.events.global.get(name)
    }
}
