//! Rule options (game variants) of a game.
//!
//! Options are collected from every piece of evidence first (global event
//! keys and the factions seated) and turned into an immutable [`RuleOptions`]
//! in one step by [`RuleOptionsBuilder::build`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Faction;

/// Prefix of option keys in the global events.
pub const OPTION_PREFIX: &str = "option-";

/// Superseded by the explicit `scoring-*` keys; counting it too would double
/// count the final scoring tile.
const DEPRECATED_FINAL_SCORING: &str = "option-fire-and-ice-final-scoring";

const VARIABLE_VERSIONED: &str = "fire-and-ice-factions/variable_v";

pub const ICE_FACTIONS: &str = "fire-and-ice-factions/ice";
pub const VOLCANO_FACTIONS: &str = "fire-and-ice-factions/volcano";
pub const VARIABLE_FACTIONS: &str = "fire-and-ice-factions/variable";

/// Fire & Ice final scoring tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FinalScoringMode {
    /// Greatest distance between connected buildings
    ConnectedDistance = 1,
    /// Distance between stronghold and sanctuary
    StrongholdDistance = 2,
    /// Outposts: buildings on the map edge
    BuildingOnEdge = 3,
    /// Settlements: connected clusters
    ConnectedClusters = 4,
}

impl FinalScoringMode {
    /// Recognise the mode from a global event key.
    pub fn from_event_key(key: &str) -> Option<Self> {
        if key.contains("scoring-connected-sa-sh-distance") {
            Some(FinalScoringMode::StrongholdDistance)
        } else if key.contains("scoring-connected-distance") {
            Some(FinalScoringMode::ConnectedDistance)
        } else if key.contains("scoring-building-on-edge") {
            Some(FinalScoringMode::BuildingOnEdge)
        } else if key.contains("scoring-connected-clusters") {
            Some(FinalScoringMode::ConnectedClusters)
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Options that take part in bucket keys, in key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOption {
    ErrataCultistPower,
    MiniExpansion1,
    ShippingBonus,
    FinalScoring,
    IceFactions,
    VolcanoFactions,
    VariableFactions,
    VariableTurnOrder,
    TempleScoringTile,
}

impl KeyOption {
    pub const IN_KEY_ORDER: [KeyOption; 9] = [
        KeyOption::ErrataCultistPower,
        KeyOption::MiniExpansion1,
        KeyOption::ShippingBonus,
        KeyOption::FinalScoring,
        KeyOption::IceFactions,
        KeyOption::VolcanoFactions,
        KeyOption::VariableFactions,
        KeyOption::VariableTurnOrder,
        KeyOption::TempleScoringTile,
    ];
}

/// Immutable option set of one game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOptions {
    /// Plain on/off options, named without the `option-` prefix
    pub flags: BTreeSet<String>,

    /// Variable-faction rules version (1 when unversioned or inferred)
    pub variable_factions: Option<u8>,

    /// Fire & Ice final scoring tile
    pub final_scoring: Option<FinalScoringMode>,
}

impl RuleOptions {
    pub fn builder() -> RuleOptionsBuilder {
        RuleOptionsBuilder::default()
    }

    pub fn has(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Key digit for an option: 0 when absent, otherwise 1 or the option's
    /// numeric value.
    pub fn indicator(&self, option: KeyOption) -> u8 {
        let flag = |name: &str| u8::from(self.has(name));
        match option {
            KeyOption::ErrataCultistPower => flag("errata-cultist-power"),
            KeyOption::MiniExpansion1 => flag("mini-expansion-1"),
            KeyOption::ShippingBonus => flag("shipping-bonus"),
            KeyOption::FinalScoring => self.final_scoring.map_or(0, |m| m.value()),
            KeyOption::IceFactions => flag(ICE_FACTIONS),
            KeyOption::VolcanoFactions => flag(VOLCANO_FACTIONS),
            KeyOption::VariableFactions => self.variable_factions.unwrap_or(0),
            KeyOption::VariableTurnOrder => flag("variable-turn-order"),
            KeyOption::TempleScoringTile => flag("temple-scoring-tile"),
        }
    }
}

/// Collects option evidence; order of the calls does not matter.
#[derive(Debug, Default)]
pub struct RuleOptionsBuilder {
    flags: BTreeSet<String>,
    variable_versions: BTreeSet<u8>,
    final_scoring: BTreeSet<FinalScoringMode>,
    seated: BTreeSet<Faction>,
}

impl RuleOptionsBuilder {
    /// Record one global event key.
    pub fn global_key(&mut self, key: &str) -> &mut Self {
        if key.contains(DEPRECATED_FINAL_SCORING) {
            return self;
        }

        if let Some(pos) = key.find(OPTION_PREFIX) {
            let name = &key[pos + OPTION_PREFIX.len()..];
            match name.strip_prefix(VARIABLE_VERSIONED) {
                Some(version) => {
                    if let Ok(v) = version.parse() {
                        self.variable_versions.insert(v);
                    }
                }
                None => {
                    self.flags.insert(name.to_string());
                }
            }
        }

        if let Some(mode) = FinalScoringMode::from_event_key(key) {
            self.final_scoring.insert(mode);
        }
        self
    }

    /// Record a faction seated in the game.
    pub fn seated(&mut self, faction: Faction) -> &mut Self {
        self.seated.insert(faction);
        self
    }

    pub fn build(&self) -> RuleOptions {
        let mut flags = self.flags.clone();

        let variable_factions = match self.variable_versions.iter().next_back() {
            Some(&v) => Some(v),
            None if flags.contains(VARIABLE_FACTIONS)
                || self.seated.iter().any(Faction::is_variable) =>
            {
                Some(1)
            }
            None => None,
        };
        if variable_factions.is_some() {
            flags.insert(VARIABLE_FACTIONS.to_string());
        }

        if self.seated.iter().any(Faction::is_ice) {
            flags.insert(ICE_FACTIONS.to_string());
        }
        if self.seated.iter().any(Faction::is_volcano) {
            flags.insert(VOLCANO_FACTIONS.to_string());
        }

        RuleOptions {
            flags,
            variable_factions,
            final_scoring: self.final_scoring.iter().next_back().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: &[&str], seated: &[Faction]) -> RuleOptions {
        let mut builder = RuleOptions::builder();
        for key in keys {
            builder.global_key(key);
        }
        for faction in seated {
            builder.seated(*faction);
        }
        builder.build()
    }

    #[test]
    fn test_plain_options() {
        let opts = build(
            &["option-shipping-bonus", "option-email-notify", "SCORE3"],
            &[],
        );
        assert!(opts.has("shipping-bonus"));
        assert!(opts.has("email-notify"));
        assert_eq!(opts.flags.len(), 2);
        assert_eq!(opts.indicator(KeyOption::ShippingBonus), 1);
        assert_eq!(opts.indicator(KeyOption::TempleScoringTile), 0);
    }

    #[test]
    fn test_deprecated_final_scoring_ignored() {
        let opts = build(&["option-fire-and-ice-final-scoring"], &[]);
        assert!(opts.flags.is_empty());
        assert_eq!(opts.final_scoring, None);
        assert_eq!(opts.indicator(KeyOption::FinalScoring), 0);
    }

    #[test]
    fn test_final_scoring_modes() {
        let cases = [
            ("final-scoring-connected-distance", 1),
            ("final-scoring-connected-sa-sh-distance", 2),
            ("final-scoring-building-on-edge", 3),
            ("final-scoring-connected-clusters", 4),
        ];
        for (key, expected) in cases {
            let opts = build(&[key], &[]);
            assert_eq!(opts.indicator(KeyOption::FinalScoring), expected, "{key}");
        }
    }

    #[test]
    fn test_variable_versions_collapse() {
        let opts = build(&["option-fire-and-ice-factions/variable_v4"], &[]);
        assert_eq!(opts.variable_factions, Some(4));
        assert!(opts.has(VARIABLE_FACTIONS));
        assert!(!opts.has("fire-and-ice-factions/variable_v4"));
        assert_eq!(opts.indicator(KeyOption::VariableFactions), 4);
    }

    #[test]
    fn test_versioned_variable_beats_plain_and_inferred() {
        let opts = build(
            &[
                "option-fire-and-ice-factions/variable",
                "option-fire-and-ice-factions/variable_v3",
            ],
            &[Faction::Shapeshifters],
        );
        assert_eq!(opts.variable_factions, Some(3));
    }

    #[test]
    fn test_faction_presence_infers_pairs() {
        let opts = build(&[], &[Faction::Yetis, Faction::Acolytes, Faction::Riverwalkers]);
        assert_eq!(opts.indicator(KeyOption::IceFactions), 1);
        assert_eq!(opts.indicator(KeyOption::VolcanoFactions), 1);
        assert_eq!(opts.indicator(KeyOption::VariableFactions), 1);
    }

    #[test]
    fn test_no_evidence_no_options() {
        let opts = build(&[], &[Faction::Witches, Faction::Nomads]);
        assert_eq!(opts, RuleOptions::default());
    }

    #[test]
    fn test_build_is_order_independent() {
        let a = build(
            &["option-mini-expansion-1", "final-scoring-building-on-edge"],
            &[Faction::IceMaidens],
        );
        let b = build(
            &["final-scoring-building-on-edge", "option-mini-expansion-1"],
            &[Faction::IceMaidens],
        );
        assert_eq!(a, b);
    }
}
