//! Map variants, resolved from the map hash the server records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known maps: (hash, key code, description).
const MAPS: [(&str, char, &str); 10] = [
    ("126fe960806d587c78546b30f1a90853b1ada468", 'a', "Original"),
    ("95a66999127893f5925a5f591d54f8bcb9a670e6", 'b', "Fire & Ice, Side 1"),
    ("be8f6ebf549404d015547152d5f2a1906ae8dd90", 'c', "Fire & Ice, Side 2"),
    ("b109f78907d2cbd5699ced16572be46043558e41", 'd', "Test map (nan0002)"),
    ("735b073fd7161268bb2796c1275abda92acd8b1a", 'e', "Test map (gareth44, expm28)"),
    ("30b6ded823e53670624981abdb2c5b8568a44091", 'f', "Test map (gareth45)"),
    ("b8a54c8e8ea3f50867297da35be5c01b9a6791d2", 'g', "Loon Lakes v1.3"),
    ("c07f36f9e050992d2daf6d44af2bc51dca719c46", 'h', "Loon Lakes v1.5"),
    ("fdb13a13cd48b7a3c3525f27e4628ff6905aa5b1", 'i', "Loon Lakes v1.6"),
    ("224736500d20520f195970eb0fd4c41df040c08c", 'j', "Fjords v1.0"),
];

/// A map, identified by its single-character key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapVariant(char);

impl MapVariant {
    /// Resolve a map hash. Returns `None` for maps not in the table.
    pub fn from_hash(hash: &str) -> Option<Self> {
        MAPS.iter()
            .find(|(h, _, _)| *h == hash)
            .map(|(_, code, _)| MapVariant(*code))
    }

    pub fn code(&self) -> char {
        self.0
    }

    /// Human readable map name.
    pub fn description(&self) -> &'static str {
        MAPS.iter()
            .find(|(_, code, _)| *code == self.0)
            .map(|(_, _, desc)| *desc)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for MapVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hashes() {
        let original = MapVariant::from_hash("126fe960806d587c78546b30f1a90853b1ada468").unwrap();
        assert_eq!(original.code(), 'a');
        assert_eq!(original.description(), "Original");

        let fjords = MapVariant::from_hash("224736500d20520f195970eb0fd4c41df040c08c").unwrap();
        assert_eq!(fjords.to_string(), "j");
    }

    #[test]
    fn test_unknown_hash() {
        assert_eq!(MapVariant::from_hash("deadbeef"), None);
    }
}
