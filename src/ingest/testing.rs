//! Game record fixtures for tests.

use std::collections::HashMap;

use crate::models::{EventEntry, GameEvents, GameRecord, Participant, Role, ALL_ROUNDS};

pub const ORIGINAL_MAP: &str = "126fe960806d587c78546b30f1a90853b1ada468";

/// Builds minimal, valid game records. Seats without explicit bonus or
/// turn order events get one bonus pick in round 0 and a round-1 turn
/// position; games without score tiles get `SCORE1` in round 1.
pub struct GameBuilder {
    game: GameRecord,
    vps: Vec<i64>,
    table_vp: Option<i64>,
    faction_count: Option<i64>,
    no_bonus: Vec<String>,
}

impl GameBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            game: GameRecord {
                game: id.to_string(),
                base_map: ORIGINAL_MAP.to_string(),
                player_count: 0,
                events: GameEvents::default(),
                factions: Vec::new(),
                last_update: "2017-12-03 10:00:00".to_string(),
            },
            vps: Vec::new(),
            table_vp: None,
            faction_count: None,
            no_bonus: Vec::new(),
        }
    }

    /// witches (alice, 100 VP) vs nomads (bob, 80 VP).
    pub fn two_player(id: &str) -> Self {
        Self::new(id)
            .players(2)
            .seat("witches", Some("alice"), 100)
            .seat("nomads", Some("bob"), 80)
    }

    pub fn players(mut self, count: u32) -> Self {
        self.game.player_count = count;
        self
    }

    pub fn map(mut self, hash: &str) -> Self {
        self.game.base_map = hash.to_string();
        self
    }

    pub fn last_update(mut self, timestamp: &str) -> Self {
        self.game.last_update = timestamp.to_string();
        self
    }

    /// Override the table's total VP (defaults to the sum over seats).
    pub fn table_vp(mut self, vp: i64) -> Self {
        self.table_vp = Some(vp);
        self
    }

    /// Override the global faction counter (defaults to the seated factions).
    pub fn faction_count(mut self, count: i64) -> Self {
        self.faction_count = Some(count);
        self
    }

    pub fn seat(mut self, faction: &str, player: Option<&str>, vp: i64) -> Self {
        self.game.factions.push(Participant {
            faction: faction.to_string(),
            player: player.map(str::to_string),
        });
        self.vps.push(vp);
        self.game
            .events
            .faction
            .entry(faction.to_string())
            .or_default()
            .insert("vp".to_string(), entry(&[(ALL_ROUNDS, vp)]));
        self
    }

    /// A seat with no events at all (placeholders, `nofactionN`).
    pub fn empty_seat(mut self, name: &str) -> Self {
        self.game.factions.push(Participant {
            faction: name.to_string(),
            player: None,
        });
        self
    }

    /// Set a faction event (`faction` may be `all`).
    pub fn event(mut self, faction: &str, key: &str, rounds: &[(&str, i64)]) -> Self {
        self.game
            .events
            .faction
            .entry(faction.to_string())
            .or_default()
            .insert(key.to_string(), entry(rounds));
        self
    }

    pub fn global(mut self, key: &str, rounds: &[(&str, i64)]) -> Self {
        self.game
            .events
            .global
            .insert(key.to_string(), entry(rounds));
        self
    }

    pub fn without_bonus(mut self, faction: &str) -> Self {
        self.no_bonus.push(faction.to_string());
        self
    }

    pub fn build(mut self) -> GameRecord {
        let seated: Vec<String> = self
            .game
            .factions
            .iter()
            .filter(|p| matches!(Role::parse(&p.faction), Role::Faction(_)))
            .map(|p| p.faction.clone())
            .collect();

        for (i, faction) in seated.iter().enumerate() {
            let events = self.game.events.faction.entry(faction.clone()).or_default();
            if !has_prefix(events, "pass:BON") && !self.no_bonus.contains(faction) {
                events.insert(format!("pass:BON{}", i % 10 + 1), entry(&[("0", 1)]));
            }
            if !has_prefix(events, "order:") {
                events.insert(format!("order:{}", i + 1), entry(&[("1", 1)]));
            }
        }

        let table_vp = self.table_vp.unwrap_or_else(|| self.vps.iter().sum());
        self.game
            .events
            .faction
            .entry(ALL_ROUNDS.to_string())
            .or_default()
            .entry("vp".to_string())
            .or_insert_with(|| entry(&[(ALL_ROUNDS, table_vp)]));

        let count = self.faction_count.unwrap_or(seated.len() as i64);
        self.game
            .events
            .global
            .entry("faction-count".to_string())
            .or_insert_with(|| entry(&[(ALL_ROUNDS, count)]));

        if !has_prefix(&self.game.events.global, "SCORE") {
            self.game
                .events
                .global
                .insert("SCORE1".to_string(), entry(&[("1", 1)]));
        }

        self.game
    }
}

pub fn entry(rounds: &[(&str, i64)]) -> EventEntry {
    EventEntry {
        round: rounds.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        all: None,
    }
}

fn has_prefix(events: &HashMap<String, EventEntry>, prefix: &str) -> bool {
    events.keys().any(|k| k.starts_with(prefix))
}
