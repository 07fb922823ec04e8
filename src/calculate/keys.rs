//! Bucket key derivation.
//!
//! A bucket key is a short string grouping outcomes that were played under
//! comparable conditions. Two layouts exist: the primary key (opening
//! position detail, skill tier) and the secondary "chooser" key (all round
//! scoring tiles plus table-wide bonus tile popularity).

use std::fmt;
use std::fmt::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    Building, KeyOption, NormalizedOutcome, BONUS_TILES, FAVOR_TILES,
};
use crate::ratings::RatingsLookup;

/// Favor tiles are written as a single hex digit each.
const _: () = assert!(FAVOR_TILES < 16);

/// Written in place of the first bonus tile when none was picked.
pub const NO_BONUS: char = 'x';

/// Round whose opening position the primary key describes.
const OPENING_ROUND: u8 = 1;

/// Outcome lacks data a key needs. The record is corrupt and is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBucketInput {
    #[error("{game_id}: no scoring tile for round {round}")]
    MissingScoreTile { game_id: String, round: u8 },

    #[error("{game_id}: no turn order for round {round}")]
    MissingTurnOrder { game_id: String, round: u8 },
}

/// Which key layout a bank is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyVariant {
    Primary,
    Secondary,
}

impl KeyVariant {
    /// Table file written for this variant.
    pub fn table_name(&self) -> &'static str {
        match self {
            KeyVariant::Primary => "stats.json",
            KeyVariant::Secondary => "chooser.json",
        }
    }
}

impl fmt::Display for KeyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyVariant::Primary => write!(f, "primary"),
            KeyVariant::Secondary => write!(f, "secondary"),
        }
    }
}

/// A derived bucket key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the key of an outcome under the given layout.
pub fn derive_key(
    outcome: &NormalizedOutcome,
    variant: KeyVariant,
    ratings: &dyn RatingsLookup,
) -> Result<BucketKey, InvalidBucketInput> {
    match variant {
        KeyVariant::Primary => primary_key(outcome, ratings),
        KeyVariant::Secondary => secondary_key(outcome),
    }
}

/// Map, options, round-1 tile and turn order, faction, player count, skill
/// tier, round-1 buildings, first bonus tile, round-1 leech, period, then
/// one hex digit per favor tile taken by round 1.
pub fn primary_key(
    outcome: &NormalizedOutcome,
    ratings: &dyn RatingsLookup,
) -> Result<BucketKey, InvalidBucketInput> {
    let score_tile = score_tile(outcome, OPENING_ROUND)?;
    let position = turn_position(outcome, OPENING_ROUND)?;
    let tier = ratings.tier_of(&outcome.player, outcome.faction);

    let mut key = String::with_capacity(40);
    key.push(outcome.map.code());
    push_options(&mut key, outcome);
    let _ = write!(
        key,
        "{score_tile}{position}{}{}{}",
        outcome.faction.code(),
        outcome.player_count,
        tier.digit()
    );
    for tier in Building::ALL {
        let _ = write!(key, "{}", outcome.builds.holding(tier, OPENING_ROUND as usize));
    }
    match outcome.first_bonus() {
        Some(tile) => {
            let _ = write!(key, "{tile}");
        }
        None => key.push(NO_BONUS),
    }
    let _ = write!(
        key,
        "{}{}",
        outcome.leech_buckets[OPENING_ROUND as usize],
        outcome.period
    );
    for favor in outcome.favors_by_round(OPENING_ROUND) {
        if let Some(digit) = char::from_digit(favor as u32 + 1, 16) {
            key.push(digit);
        }
    }

    Ok(BucketKey(key))
}

/// Map, options, scoring tiles of all rounds, round-1 turn order, faction,
/// player count, table-wide pick count of every bonus tile, period.
pub fn secondary_key(outcome: &NormalizedOutcome) -> Result<BucketKey, InvalidBucketInput> {
    let mut tiles = String::new();
    for round in 1..=6 {
        let _ = write!(tiles, "{}", score_tile(outcome, round)?);
    }
    let position = turn_position(outcome, OPENING_ROUND)?;

    let mut key = String::with_capacity(40);
    key.push(outcome.map.code());
    push_options(&mut key, outcome);
    let _ = write!(
        key,
        "{tiles}{position}{}{}",
        outcome.faction.code(),
        outcome.player_count
    );
    for tile in 1..=BONUS_TILES {
        let _ = write!(key, "{}", outcome.all_bonus_picks[tile]);
    }
    key.push_str(outcome.period.as_str());

    Ok(BucketKey(key))
}

fn push_options(key: &mut String, outcome: &NormalizedOutcome) {
    for option in KeyOption::IN_KEY_ORDER {
        let _ = write!(key, "{}", outcome.options.indicator(option));
    }
}

fn score_tile(outcome: &NormalizedOutcome, round: u8) -> Result<u32, InvalidBucketInput> {
    outcome
        .score_tile(round)
        .ok_or_else(|| InvalidBucketInput::MissingScoreTile {
            game_id: outcome.game_id.clone(),
            round,
        })
}

fn turn_position(outcome: &NormalizedOutcome, round: u8) -> Result<u8, InvalidBucketInput> {
    outcome
        .turn_position(round)
        .ok_or_else(|| InvalidBucketInput::MissingTurnOrder {
            game_id: outcome.game_id.clone(),
            round,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::extract;
    use crate::ingest::testing::GameBuilder;
    use crate::models::{Faction, PlayerId};
    use crate::ratings::{NoRatings, RatingsTable, SkillTier};
    use pretty_assertions::assert_eq;

    fn outcome() -> NormalizedOutcome {
        let game = GameBuilder::two_player("g1")
            .global("SCORE3", &[("1", 1), ("all", 1)])
            .global("SCORE5", &[("2", 1)])
            .global("option-shipping-bonus", &[("all", 1)])
            .global("final-scoring-connected-sa-sh-distance", &[("all", 1)])
            .event("witches", "build:D", &[("0", 2), ("1", 1)])
            .event("witches", "upgrade:TP", &[("1", 1)])
            .event("witches", "leech:pw", &[("1", 5)])
            .event("witches", "favor:FAV11", &[("1", 1)])
            .event("witches", "favor:FAV2", &[("0", 1)])
            .event("witches", "favor:FAV5", &[("3", 1)])
            .event("witches", "pass:BON4", &[("0", 1)])
            .build();
        extract(&game, "witches").unwrap()
    }

    #[test]
    fn test_primary_key_layout() {
        let o = outcome();
        let key = primary_key(&o, &NoRatings).unwrap();

        // a | 001200000 | 3 | 1 | s | 2 | 0 | 21000 | 3 | 1 | 17c | 2b
        let code = Faction::Witches.code();
        assert_eq!(key.as_str(), format!("a0012000003 1{code}20210003117c2b").replace(' ', ""));
    }

    #[test]
    fn test_primary_key_uses_skill_tier() {
        let o = outcome();
        let ratings =
            RatingsTable::from_json(r#"{"players": {"alice": {"score": 1260}}}"#).unwrap();
        assert_eq!(
            ratings.tier_of(&PlayerId::new("alice"), Faction::Witches),
            SkillTier::Expert
        );

        let unrated = primary_key(&o, &NoRatings).unwrap();
        let rated = primary_key(&o, &ratings).unwrap();
        assert_ne!(unrated, rated);
        assert_eq!(rated.as_str().chars().nth(14), Some('4'));
        assert_eq!(unrated.as_str().chars().nth(14), Some('0'));
    }

    #[test]
    fn test_primary_key_without_bonus_uses_sentinel() {
        let mut o = outcome();
        o.bonus_by_round = [None; 7];
        let key = primary_key(&o, &NoRatings).unwrap();
        assert_eq!(key.as_str().chars().nth(20), Some(NO_BONUS));
    }

    #[test]
    fn test_no_early_favors_means_no_suffix() {
        let mut o = outcome();
        o.favor_rounds = [crate::models::FAVOR_NEVER; FAVOR_TILES];
        let key = primary_key(&o, &NoRatings).unwrap();
        assert!(key.as_str().ends_with("17c"));
    }

    #[test]
    fn test_last_favor_tile_is_hex_c() {
        let mut o = outcome();
        o.favor_rounds = [crate::models::FAVOR_NEVER; FAVOR_TILES];
        o.favor_rounds[FAVOR_TILES - 1] = 0;
        let key = primary_key(&o, &NoRatings).unwrap();
        assert!(key.as_str().ends_with("17cc"));
    }

    #[test]
    fn test_secondary_key_layout() {
        let mut o = outcome();
        for (round, tile) in [(3, 1), (4, 7), (5, 2), (6, 8)] {
            o.score_tiles.insert(round.to_string(), tile);
        }
        o.all_bonus_picks = [0, 1, 0, 0, 2, 0, 0, 11, 0, 0, 1];

        let key = secondary_key(&o).unwrap();
        let code = Faction::Witches.code();
        assert_eq!(
            key.as_str(),
            format!("a001200000351728 1{code}2 10020011001 17c").replace(' ', "")
        );
    }

    #[test]
    fn test_secondary_key_ignores_skill_and_builds() {
        let mut a = outcome();
        for round in 3..=6 {
            a.score_tiles.insert(round.to_string(), 1);
        }
        let mut b = a.clone();
        b.builds = Default::default();
        b.favor_rounds = [0; FAVOR_TILES];
        b.leech_buckets = [4; 7];

        assert_eq!(secondary_key(&a).unwrap(), secondary_key(&b).unwrap());
        assert_ne!(
            primary_key(&a, &NoRatings).unwrap(),
            primary_key(&b, &NoRatings).unwrap()
        );
    }

    #[test]
    fn test_missing_round_one_tile_is_invalid() {
        let mut o = outcome();
        o.score_tiles.remove("1");
        for variant in [KeyVariant::Primary, KeyVariant::Secondary] {
            assert_eq!(
                derive_key(&o, variant, &NoRatings),
                Err(InvalidBucketInput::MissingScoreTile {
                    game_id: "g1".to_string(),
                    round: 1,
                })
            );
        }
    }

    #[test]
    fn test_missing_turn_order_is_invalid() {
        let mut o = outcome();
        o.turn_order.clear();
        assert!(matches!(
            derive_key(&o, KeyVariant::Primary, &NoRatings),
            Err(InvalidBucketInput::MissingTurnOrder { round: 1, .. })
        ));
    }

    #[test]
    fn test_secondary_needs_every_round() {
        let o = outcome();
        assert!(matches!(
            secondary_key(&o),
            Err(InvalidBucketInput::MissingScoreTile { round: 3, .. })
        ));
    }

    #[test]
    fn test_keys_are_deterministic() {
        let o = outcome();
        assert_eq!(
            derive_key(&o, KeyVariant::Primary, &NoRatings),
            derive_key(&o.clone(), KeyVariant::Primary, &NoRatings)
        );
    }
}
