//! Factions and reserved seat tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest seat number the server uses for reserved tokens.
pub const MAX_SEATS: u8 = 7;

/// The 20 playable factions (base game + Fire & Ice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Acolytes,
    Alchemists,
    Auren,
    ChaosMagicians,
    Cultists,
    Darklings,
    Dragonlords,
    Dwarves,
    Engineers,
    Fakirs,
    Giants,
    Halflings,
    IceMaidens,
    Mermaids,
    Nomads,
    Riverwalkers,
    Shapeshifters,
    Swarmlings,
    Witches,
    Yetis,
}

impl Faction {
    pub const ALL: [Faction; 20] = [
        Faction::Acolytes,
        Faction::Alchemists,
        Faction::Auren,
        Faction::ChaosMagicians,
        Faction::Cultists,
        Faction::Darklings,
        Faction::Dragonlords,
        Faction::Dwarves,
        Faction::Engineers,
        Faction::Fakirs,
        Faction::Giants,
        Faction::Halflings,
        Faction::IceMaidens,
        Faction::Mermaids,
        Faction::Nomads,
        Faction::Riverwalkers,
        Faction::Shapeshifters,
        Faction::Swarmlings,
        Faction::Witches,
        Faction::Yetis,
    ];

    /// Name used by the game server.
    pub fn name(&self) -> &'static str {
        match self {
            Faction::Acolytes => "acolytes",
            Faction::Alchemists => "alchemists",
            Faction::Auren => "auren",
            Faction::ChaosMagicians => "chaosmagicians",
            Faction::Cultists => "cultists",
            Faction::Darklings => "darklings",
            Faction::Dragonlords => "dragonlords",
            Faction::Dwarves => "dwarves",
            Faction::Engineers => "engineers",
            Faction::Fakirs => "fakirs",
            Faction::Giants => "giants",
            Faction::Halflings => "halflings",
            Faction::IceMaidens => "icemaidens",
            Faction::Mermaids => "mermaids",
            Faction::Nomads => "nomads",
            Faction::Riverwalkers => "riverwalkers",
            Faction::Shapeshifters => "shapeshifters",
            Faction::Swarmlings => "swarmlings",
            Faction::Witches => "witches",
            Faction::Yetis => "yetis",
        }
    }

    /// Single-letter code used in bucket keys ('a'..'t', alphabetical).
    pub fn code(&self) -> char {
        let index = Faction::ALL
            .iter()
            .position(|f| f == self)
            .unwrap_or_default();
        (b'a' + index as u8) as char
    }

    /// Look up a faction by its server name.
    pub fn from_name(name: &str) -> Option<Self> {
        Faction::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Ice factions (Fire & Ice).
    pub fn is_ice(&self) -> bool {
        matches!(self, Faction::IceMaidens | Faction::Yetis)
    }

    /// Volcano factions (Fire & Ice).
    pub fn is_volcano(&self) -> bool {
        matches!(self, Faction::Dragonlords | Faction::Acolytes)
    }

    /// Variable-color factions (Fire & Ice).
    pub fn is_variable(&self) -> bool {
        matches!(self, Faction::Shapeshifters | Faction::Riverwalkers)
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a seat's role name stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A real faction
    Faction(Faction),

    /// `playerN`: seat never filled, the game is incomplete
    Placeholder(u8),

    /// `nofactionN`: seat with no faction attached
    NoFaction(u8),

    /// Anything else the server may invent later
    Unknown(String),
}

impl Role {
    /// Classify a role name against the closed set of reserved tokens.
    pub fn parse(name: &str) -> Self {
        if let Some(faction) = Faction::from_name(name) {
            return Role::Faction(faction);
        }
        if let Some(seat) = reserved_seat(name, "player") {
            return Role::Placeholder(seat);
        }
        if let Some(seat) = reserved_seat(name, "nofaction") {
            return Role::NoFaction(seat);
        }
        Role::Unknown(name.to_string())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Role::Placeholder(_))
    }
}

fn reserved_seat(name: &str, prefix: &str) -> Option<u8> {
    let seat: u8 = name.strip_prefix(prefix)?.parse().ok()?;
    (1..=MAX_SEATS).contains(&seat).then_some(seat)
}
