use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    player::{PlayerId, Role},
    store::MemoryStore,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write standings `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode standings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
    pub wins: u32,
    pub losses: u32,
}

/// Final ratings of a run, one table per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    pub leaders: BTreeMap<PlayerId, Standing>,
    pub supports: BTreeMap<PlayerId, Standing>,
}

impl Standings {
    pub fn from_store(store: &MemoryStore) -> Self {
        let mut standings = Self::default();
        for (player, role, record) in store.iter() {
            let standing = Standing {
                rating: record.rating.rating,
                deviation: record.rating.deviation,
                volatility: record.rating.volatility,
                wins: record.wins,
                losses: record.losses,
            };
            let table = match role {
                Role::Leader => &mut standings.leaders,
                Role::Support => &mut standings.supports,
            };
            table.insert(player.clone(), standing);
        }
        standings
    }

    /// Players of a role, best rating first.
    pub fn ranked(&self, role: Role) -> Vec<(&PlayerId, &Standing)> {
        let table = match role {
            Role::Leader => &self.leaders,
            Role::Support => &self.supports,
        };
        let mut ranked: Vec<_> = table.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| b.rating.total_cmp(&a.rating));
        ranked
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        fs::write(path, self.to_json()?).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(
            "wrote standings of {} leaders and {} supports to `{}`",
            self.leaders.len(),
            self.supports.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_eq_float::assert_eq_float;
    use skillratings::{Outcomes, glicko2::Glicko2Rating};

    use super::*;
    use crate::store::{RatingStore, RoleRecord};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put(
            &PlayerId::from("Sev"),
            Role::Leader,
            RoleRecord::new(Glicko2Rating::new())
                .after(Glicko2Rating::from((1662.3, 290.3, 0.06)), Outcomes::WIN),
        );
        store.put(
            &PlayerId::from("F9bomber"),
            Role::Leader,
            RoleRecord::new(Glicko2Rating::from((1710.0, 120.0, 0.059))),
        );
        store.put(
            &PlayerId::from("Sev"),
            Role::Support,
            RoleRecord::new(Glicko2Rating::from((1337.7, 290.3, 0.06))),
        );
        store
    }

    #[test]
    fn grouped_by_role() {
        let standings = Standings::from_store(&store());

        assert_eq!(standings.leaders.len(), 2);
        assert_eq!(standings.supports.len(), 1);

        let sev = standings.leaders[&PlayerId::from("Sev")];
        assert_eq_float!(sev.rating, 1662.3);
        assert_eq!((sev.wins, sev.losses), (1, 0));
    }

    #[test]
    fn ranked_best_first() {
        let standings = Standings::from_store(&store());
        let names: Vec<_> = standings
            .ranked(Role::Leader)
            .into_iter()
            .map(|(player, _)| player.as_str())
            .collect();

        assert_eq!(names, vec!["F9bomber", "Sev"]);
        assert!(standings.ranked(Role::Support).len() == 1);
    }

    #[test]
    fn json_layout() {
        let json = Standings::from_store(&store()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["leaders"]["F9bomber"]["rating"], 1710.0);
        assert_eq!(value["supports"]["Sev"]["losses"], 0);
        assert_eq!(value["leaders"]["Sev"]["wins"], 1);
    }
}
