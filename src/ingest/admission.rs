//! Game-level admission: which games are fit for statistics at all.

use std::collections::HashSet;

use thiserror::Error;

use super::extract::ExtractError;
use crate::models::{GameRecord, Role};

/// Games known to be corrupt or not representative.
const EXCLUDED_GAMES: &[&str] = &[
    // test maps
    "nan0002",
    "gareth44",
    "expm28",
    "gareth45",
    // bridged more than 3
    "Bgg50",
    "DaveMattDouble2",
    // invalid score tiles
    "wayne",
    // chaos magicians double pass bug
    "JogaGREat5",
    "JogaGreat4",
    "PenisEnvy1",
    "JG9",
    "sky05",
    "JG10",
    "Terra4m",
    "Tools001",
    "DvMvRvB4",
    "marcelp24",
    // S1 scoring tile in round 5
    "5",
    // early play-by-forum games
    "0627puyo",
    "10",
    "17",
    "19",
    "20",
    "23",
    "24",
    "26",
    "27",
    "8",
    "9",
    "BlaGame11",
    "BlaGame8",
    "IBGPBF5",
    "Noerrorpls",
    "gamecepet",
    "gareth2",
    "nyobagame",
    "pbc1",
    "pbc2",
    "pbc3",
    "skelly1",
    "skelly1a",
    "skelly1b",
    "skelly1c",
    "skelly1d",
    "skelly1e",
    "skelly1f",
    "verandi1",
    "verandi2",
];

/// Global event present when a player dropped out mid-game.
pub const DROP_EVENT: &str = "drop-faction";

/// Why a whole game produced no outcomes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameRejection {
    #[error("seat player{0} was never filled")]
    UnfilledSeat(u8),

    #[error("game is on the exclusion list")]
    Excluded,

    #[error("players dropped out")]
    PlayersDropped,

    #[error("inconsistent participant set: {0}")]
    InconsistentParticipantSet(Inconsistency),

    #[error(transparent)]
    Malformed(#[from] ExtractError),
}

impl GameRejection {
    /// Short label for counting rejections.
    pub fn label(&self) -> &'static str {
        match self {
            GameRejection::UnfilledSeat(_) => "unfilled_seat",
            GameRejection::Excluded => "excluded",
            GameRejection::PlayersDropped => "players_dropped",
            GameRejection::InconsistentParticipantSet(Inconsistency::MultiRole) => "multi_role",
            GameRejection::InconsistentParticipantSet(Inconsistency::RoleCountMismatch {
                ..
            }) => "role_count_mismatch",
            GameRejection::Malformed(ExtractError::MalformedMapReference(_)) => "unknown_map",
            GameRejection::Malformed(_) => "malformed",
        }
    }
}

/// Seats that cannot be attributed cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("a player holds more than one faction")]
    MultiRole,

    #[error("{declared} players declared but {counted} factions counted")]
    RoleCountMismatch { declared: u32, counted: i64 },
}

/// Set of excluded game ids.
#[derive(Debug, Clone)]
pub struct ExclusionList {
    games: HashSet<String>,
}

impl ExclusionList {
    /// The curated list of known bad games.
    pub fn builtin() -> Self {
        Self::empty().with_games(EXCLUDED_GAMES.iter().copied())
    }

    pub fn empty() -> Self {
        Self {
            games: HashSet::new(),
        }
    }

    /// Add more game ids.
    pub fn with_games<I, S>(mut self, games: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.games.extend(games.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.games.contains(game_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Check a game before any seat is extracted.
pub fn admit(game: &GameRecord, exclusions: &ExclusionList) -> Result<(), GameRejection> {
    for seat in &game.factions {
        if let Role::Placeholder(n) = Role::parse(&seat.faction) {
            return Err(GameRejection::UnfilledSeat(n));
        }
    }

    if exclusions.contains(&game.game) {
        return Err(GameRejection::Excluded);
    }

    if game.global_event(DROP_EVENT).is_some() {
        return Err(GameRejection::PlayersDropped);
    }

    Ok(())
}
