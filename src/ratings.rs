//! Player skill tiers from the server's rating dump.
//!
//! `ratings.json` looks like `{"players": {"<name>": {"score": 1234.5, ...}}}`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Faction, PlayerId};

/// Errors loading ratings.
#[derive(Debug, Error)]
pub enum RatingsError {
    #[error("Failed to read ratings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse ratings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse skill bucket; `Unknown` for unrated players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillTier {
    Unknown = 0,
    Novice = 1,
    Intermediate = 2,
    Advanced = 3,
    Expert = 4,
}

impl SkillTier {
    /// Bucket a rating score (thresholds 1000 / 1100 / 1250).
    pub fn from_score(score: f64) -> Self {
        if score < 1000.0 {
            SkillTier::Novice
        } else if score < 1100.0 {
            SkillTier::Intermediate
        } else if score < 1250.0 {
            SkillTier::Advanced
        } else {
            SkillTier::Expert
        }
    }

    pub fn digit(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for SkillTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digit())
    }
}

/// Source of skill tiers.
pub trait RatingsLookup: Send + Sync {
    /// Tier of a player when playing a faction.
    fn tier_of(&self, player: &PlayerId, faction: Faction) -> SkillTier;
}

/// Every player unrated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRatings;

impl RatingsLookup for NoRatings {
    fn tier_of(&self, _player: &PlayerId, _faction: Faction) -> SkillTier {
        SkillTier::Unknown
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRating {
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RatingsFile {
    #[serde(default)]
    players: HashMap<String, PlayerRating>,
}

/// Ratings loaded from the server dump. Only the player's overall score
/// is used; the faction is ignored.
#[derive(Debug, Clone, Default)]
pub struct RatingsTable {
    players: HashMap<String, PlayerRating>,
}

impl RatingsTable {
    pub fn new(players: HashMap<String, PlayerRating>) -> Self {
        Self { players }
    }

    pub fn from_json(json: &str) -> Result<Self, RatingsError> {
        let file: RatingsFile = serde_json::from_str(json)?;
        Ok(Self::new(file.players))
    }

    pub fn from_file(path: &Path) -> Result<Self, RatingsError> {
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_json(&contents)?;
        info!("Loaded ratings for {} players from {:?}", table.len(), path);
        Ok(table)
    }

    /// Load ratings, falling back to an empty table (every tier 0) when the
    /// file is missing or unreadable.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    "No usable ratings at {:?} ({}); download ratings.json from the game server to get skill tiers",
                    path, e
                );
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl RatingsLookup for RatingsTable {
    fn tier_of(&self, player: &PlayerId, _faction: Faction) -> SkillTier {
        self.players
            .get(player.as_str())
            .and_then(|r| r.score)
            .map_or(SkillTier::Unknown, SkillTier::from_score)
    }
}
