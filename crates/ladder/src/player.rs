use std::fmt;

use serde::{Deserialize, Serialize};

/// Name a player is known by in the match logs.
///
/// The empty name marks an unfilled slot. It never gets a rating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An unfilled slot, which must not create or touch a rating.
    pub fn is_absent(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PlayerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Rating track. A player's leader and support ratings are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leader,
    Support,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Leader, Role::Support];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Leader => f.write_str("leader"),
            Role::Support => f.write_str("support"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_player() {
        assert!(PlayerId::default().is_absent());
        assert!(PlayerId::from("").is_absent());
        assert!(!PlayerId::from("Sev").is_absent());
    }

    #[test]
    fn player_id_is_a_plain_string_on_the_wire() {
        let id: PlayerId = serde_json::from_str(r#""M.S""#).unwrap();

        assert_eq!(id.as_str(), "M.S");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""M.S""#);
        assert_eq!(id.to_string(), "M.S");
    }

    #[test]
    fn roles() {
        assert_eq!(Role::Leader.to_string(), "leader");
        assert_eq!(serde_json::to_string(&Role::Support).unwrap(), r#""support""#);
        assert!(Role::Leader < Role::Support);
    }
}
