//! Faction record extraction.
//!
//! Turns one game record plus one seat into a [`NormalizedOutcome`]. Facts
//! shared by every seat (map, options, score tiles, table-wide bonus picks)
//! are resolved once into a [`GameContext`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::models::{
    leech_bucket, Building, BuildTrajectory, EventEntry, EventMap, Faction, GameRecord,
    MapVariant, NormalizedOutcome, Period, PlayerId, Role, RuleOptions, BONUS_TILES,
    FAVOR_NEVER, FAVOR_TILES, ROUND_COLUMNS, SCORE_BASELINE, TOWN_NEVER, TOWN_TILES,
};

/// Global event naming the round scoring tile, e.g. `SCORE5`.
static SCORE_TILE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SCORE(\d+)$").expect("score tile pattern"));

/// Scoring rounds (round 0 is setup and has no scoring tile).
const SCORING_ROUNDS: std::ops::RangeInclusive<u8> = 1..=6;

/// Turn order positions the server records (`order:1`..`order:7`).
const TURN_POSITIONS: std::ops::RangeInclusive<u8> = 1..=7;

const GLOBAL: &str = "global";

/// Errors extracting an outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("Unknown map hash: {0}")]
    MalformedMapReference(String),

    #[error("{faction} has no '{key}' event")]
    MissingEventKey { faction: String, key: String },

    #[error("Unknown faction: {0}")]
    UnknownFaction(String),

    #[error("Unparseable last update timestamp: {0:?}")]
    MalformedTimestamp(String),

    #[error("Game declares {0} players")]
    InvalidPlayerCount(u32),

    #[error("{faction} holds a negative number of {tier:?} in round {round}")]
    NegativeHolding {
        faction: String,
        tier: Building,
        round: usize,
    },

    #[error("{faction} picked more than one bonus tile in round {round}")]
    AmbiguousBonusPick { faction: String, round: usize },

    #[error("{faction} never picked a bonus tile")]
    NoBonusHistory { faction: String },
}

impl ExtractError {
    fn missing(faction: &str, key: &str) -> Self {
        ExtractError::MissingEventKey {
            faction: faction.to_string(),
            key: key.to_string(),
        }
    }
}

/// Game-wide facts shared by every seat.
#[derive(Debug, Clone)]
pub struct GameContext {
    pub map: MapVariant,
    pub period: Period,
    pub options: RuleOptions,
    pub score_tiles: BTreeMap<String, u32>,
    pub all_bonus_picks: [i64; BONUS_TILES + 1],
    pub average_score: f64,
    pub dropped_players: i64,
    pub multi_role: bool,
    pub missing_roles: i64,
}

impl GameContext {
    pub fn from_game(game: &GameRecord) -> Result<Self, ExtractError> {
        let map = MapVariant::from_hash(&game.base_map)
            .ok_or_else(|| ExtractError::MalformedMapReference(game.base_map.clone()))?;

        let period = Period::from_timestamp(&game.last_update)
            .ok_or_else(|| ExtractError::MalformedTimestamp(game.last_update.clone()))?;

        if game.player_count == 0 {
            return Err(ExtractError::InvalidPlayerCount(game.player_count));
        }

        let all = game
            .all_faction_events()
            .ok_or_else(|| ExtractError::missing("all", "vp"))?;
        let total_vp = all
            .get("vp")
            .and_then(EventEntry::total)
            .ok_or_else(|| ExtractError::missing("all", "vp"))?;
        let average_score =
            total_vp as f64 / game.player_count as f64 + SCORE_BASELINE as f64;

        let counted = game
            .global_event("faction-count")
            .and_then(EventEntry::total)
            .ok_or_else(|| ExtractError::missing(GLOBAL, "faction-count"))?;

        let dropped_players = game
            .global_event("drop-faction")
            .and_then(|e| e.all.or_else(|| e.total()))
            .unwrap_or(0);

        Ok(Self {
            map,
            period,
            options: parse_options(game),
            score_tiles: parse_score_tiles(&game.events.global),
            all_bonus_picks: parse_all_bonus_picks(all),
            average_score,
            dropped_players,
            multi_role: has_multi_role(game),
            missing_roles: game.player_count as i64 - counted,
        })
    }
}

/// Extract the outcome of one seat.
pub fn extract(game: &GameRecord, faction_name: &str) -> Result<NormalizedOutcome, ExtractError> {
    let context = GameContext::from_game(game)?;
    extract_with_context(game, &context, faction_name)
}

/// Extract the outcome of one seat with a precomputed game context.
pub fn extract_with_context(
    game: &GameRecord,
    context: &GameContext,
    faction_name: &str,
) -> Result<NormalizedOutcome, ExtractError> {
    let faction = match Role::parse(faction_name) {
        Role::Faction(f) => f,
        _ => return Err(ExtractError::UnknownFaction(faction_name.to_string())),
    };

    let events = game
        .faction_events(faction_name)
        .ok_or_else(|| ExtractError::missing(faction_name, "vp"))?;

    let vp = events
        .get("vp")
        .and_then(EventEntry::total)
        .ok_or_else(|| ExtractError::missing(faction_name, "vp"))?;
    let score = vp + SCORE_BASELINE;

    let seat = game.factions.iter().find(|p| p.faction == faction_name);
    let player = PlayerId::from_seat(seat.and_then(|p| p.player.as_deref()), faction_name);

    Ok(NormalizedOutcome {
        game_id: game.game.clone(),
        faction,
        player,
        player_count: game.player_count,
        score,
        margin: score as f64 - context.average_score,
        map: context.map,
        builds: parse_builds(events, faction)?,
        favor_rounds: parse_tile_rounds::<FAVOR_TILES>(events, "favor:FAV", FAVOR_NEVER),
        town_rounds: parse_tile_rounds::<TOWN_TILES>(events, "town:TW", TOWN_NEVER),
        bonus_by_round: parse_bonus(events, faction)?,
        all_bonus_picks: context.all_bonus_picks,
        turn_order: parse_turn_order(events),
        leech_buckets: parse_leech(events),
        options: context.options.clone(),
        score_tiles: context.score_tiles.clone(),
        dropped_players: context.dropped_players,
        multi_role: context.multi_role,
        missing_roles: context.missing_roles,
        rank: 1,
        period: context.period.clone(),
    })
}

fn by_round(events: &EventMap, key: &str) -> [i64; ROUND_COLUMNS] {
    events.get(key).map(EventEntry::by_round).unwrap_or_default()
}

fn parse_builds(events: &EventMap, faction: Faction) -> Result<BuildTrajectory, ExtractError> {
    let mut created = [[0; ROUND_COLUMNS]; 5];
    for tier in Building::ALL {
        created[tier.index()] = by_round(events, tier.event_key());
    }
    BuildTrajectory::from_created(&created).map_err(|(tier, round)| {
        ExtractError::NegativeHolding {
            faction: faction.to_string(),
            tier,
            round,
        }
    })
}

/// Round each numbered tile (`<prefix>1`..`<prefix>N`) was first taken.
fn parse_tile_rounds<const N: usize>(events: &EventMap, prefix: &str, never: u8) -> [u8; N] {
    let mut rounds = [never; N];
    for (i, slot) in rounds.iter_mut().enumerate() {
        if let Some(round) = events
            .get(&format!("{prefix}{}", i + 1))
            .and_then(EventEntry::first_round)
        {
            *slot = round;
        }
    }
    rounds
}

/// Per round, which bonus tile was picked: read the [tile][round] pick
/// matrix column by column.
fn parse_bonus(
    events: &EventMap,
    faction: Faction,
) -> Result<[Option<u8>; ROUND_COLUMNS], ExtractError> {
    let picks: Vec<[i64; ROUND_COLUMNS]> = (1..=BONUS_TILES)
        .map(|i| by_round(events, &format!("pass:BON{i}")))
        .collect();

    let mut held = [None; ROUND_COLUMNS];
    for (round, slot) in held.iter_mut().enumerate() {
        let mut picked = (0..BONUS_TILES).filter(|&tile| picks[tile][round] == 1);
        *slot = picked.next().map(|tile| tile as u8);
        if picked.next().is_some() {
            return Err(ExtractError::AmbiguousBonusPick {
                faction: faction.to_string(),
                round,
            });
        }
    }

    if held.iter().all(Option::is_none) {
        return Err(ExtractError::NoBonusHistory {
            faction: faction.to_string(),
        });
    }
    Ok(held)
}

fn parse_turn_order(events: &EventMap) -> BTreeMap<String, u8> {
    let mut order = BTreeMap::new();
    for position in TURN_POSITIONS {
        if let Some(entry) = events.get(&format!("order:{position}")) {
            for round in entry.rounds() {
                order.insert(round.to_string(), position);
            }
        }
    }
    order
}

fn parse_leech(events: &EventMap) -> [u8; ROUND_COLUMNS] {
    by_round(events, "leech:pw").map(leech_bucket)
}

/// Index 1..=10: most picks of that bonus tile in any single round.
fn parse_all_bonus_picks(all: &EventMap) -> [i64; BONUS_TILES + 1] {
    let mut picks = [0; BONUS_TILES + 1];
    for (tile, slot) in picks.iter_mut().enumerate().skip(1) {
        *slot = by_round(all, &format!("pass:BON{tile}"))
            .into_iter()
            .max()
            .unwrap_or(0);
    }
    picks
}

fn parse_score_tiles(global: &EventMap) -> BTreeMap<String, u32> {
    let mut tiles: Vec<(u32, &EventEntry)> = global
        .iter()
        .filter_map(|(key, entry)| {
            let caps = SCORE_TILE_KEY.captures(key)?;
            Some((caps[1].parse().ok()?, entry))
        })
        .collect();
    tiles.sort_by_key(|(id, _)| *id);

    let mut active = BTreeMap::new();
    for (id, entry) in tiles {
        for round in SCORING_ROUNDS {
            let round = round.to_string();
            if entry.round.contains_key(&round) {
                active.insert(round, id);
            }
        }
    }
    active
}

fn parse_options(game: &GameRecord) -> RuleOptions {
    let mut builder = RuleOptions::builder();
    for key in game.events.global.keys() {
        builder.global_key(key);
    }
    for seat in &game.factions {
        if let Role::Faction(faction) = Role::parse(&seat.faction) {
            builder.seated(faction);
        }
    }
    builder.build()
}

fn has_multi_role(game: &GameRecord) -> bool {
    let mut players: Vec<PlayerId> = game
        .factions
        .iter()
        .map(|p| PlayerId::from_seat(p.player.as_deref(), &p.faction))
        .collect();
    let seats = players.len();
    players.sort();
    players.dedup();
    players.len() != seats
}
