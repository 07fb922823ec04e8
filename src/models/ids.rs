//! Player identities and content fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::Faction;

const ANONYMOUS_PREFIX: &str = "anon-";

/// Account name of the player owning a seat.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Stand-in for a seat without an account. Unique per faction, so two
    /// anonymous seats never count as the same player.
    pub fn anonymous(faction_name: &str) -> Self {
        Self(format!("{ANONYMOUS_PREFIX}{faction_name}"))
    }

    /// Account name, or a synthesized anonymous id when absent.
    pub fn from_seat(player: Option<&str>, faction_name: &str) -> Self {
        match player {
            Some(name) => Self::new(name),
            None => Self::anonymous(faction_name),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with(ANONYMOUS_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl From<Faction> for PlayerId {
    fn from(faction: Faction) -> Self {
        Self::anonymous(faction.name())
    }
}

/// Deterministic fingerprint of a set of inputs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the given fields with SHA256, separated by `|`.
    pub fn generate(fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(field.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0[..self.0.len().min(16)])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_from_seat() {
        assert_eq!(PlayerId::from_seat(Some("bob"), "giants").as_str(), "bob");
        let anon = PlayerId::from_seat(None, "giants");
        assert_eq!(anon.as_str(), "anon-giants");
        assert!(anon.is_anonymous());
    }

    #[test]
    fn test_anonymous_ids_differ_per_faction() {
        assert_ne!(
            PlayerId::from(Faction::Witches),
            PlayerId::from(Faction::Nomads)
        );
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = Fingerprint::generate(&["2017-12.json", "1024"]);
        let b = Fingerprint::generate(&["2017-12.json", "1024"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let a = Fingerprint::generate(&["ab", "c"]);
        let b = Fingerprint::generate(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_display_truncated() {
        let fp = Fingerprint::generate(&["x"]);
        assert_eq!(fp.to_string().len(), 16);
    }
}
