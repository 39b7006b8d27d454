use std::{collections::BTreeMap, fs, io, path::Path};

use serde::{Deserialize, Serialize};
use skillratings::{Outcomes, glicko2::Glicko2Rating};
use tracing::debug;

use crate::player::{PlayerId, Role};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access snapshot `{path}`: {source}")]
    Io { path: String, source: io::Error },
    #[error("failed to encode or decode snapshot: {0}")]
    Bitcode(#[from] bitcode::Error),
}

/// What the ladder keeps per player and role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub rating: Glicko2Rating,
    pub wins: u32,
    pub losses: u32,
}

impl RoleRecord {
    pub const fn new(rating: Glicko2Rating) -> Self {
        Self {
            rating,
            wins: 0,
            losses: 0,
        }
    }

    /// Record with the posterior of a match and the match counted.
    pub const fn after(self, rating: Glicko2Rating, outcome: Outcomes) -> Self {
        match outcome {
            Outcomes::WIN => Self {
                rating,
                wins: self.wins + 1,
                ..self
            },
            Outcomes::LOSS => Self {
                rating,
                losses: self.losses + 1,
                ..self
            },
        }
    }

    pub const fn matches(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Keyed ratings, one record per (player, role).
///
/// The ladder reads priors through `get` and writes posteriors through `put`.
/// A missing record means the player has not played that role yet.
pub trait RatingStore {
    fn get(&self, player: &PlayerId, role: Role) -> Option<RoleRecord>;
    fn put(&mut self, player: &PlayerId, role: Role, record: RoleRecord);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    records: BTreeMap<(Role, PlayerId), RoleRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, grouped by role, players in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, Role, &RoleRecord)> {
        self.records
            .iter()
            .map(|((role, player), record)| (player, *role, record))
    }
}

impl RatingStore for MemoryStore {
    fn get(&self, player: &PlayerId, role: Role) -> Option<RoleRecord> {
        self.records.get(&(role, player.clone())).copied()
    }

    fn put(&mut self, player: &PlayerId, role: Role, record: RoleRecord) {
        self.records.insert((role, player.clone()), record);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnapshotEntry {
    player: PlayerId,
    role: Role,
    record: RoleRecord,
}

/// A [`MemoryStore`] frozen after `processed` matches of a feed.
///
/// The store is the source of truth for the next priors, `processed` tells
/// a resumed run where in the feed to pick up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub processed: usize,
    records: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn capture(store: &MemoryStore, processed: usize) -> Self {
        let records = store
            .iter()
            .map(|(player, role, record)| SnapshotEntry {
                player: player.clone(),
                role,
                record: *record,
            })
            .collect();
        Self { processed, records }
    }

    pub fn restore(&self) -> MemoryStore {
        let mut store = MemoryStore::new();
        for entry in &self.records {
            store.put(&entry.player, entry.role, entry.record);
        }
        store
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(bitcode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(bitcode::deserialize(bytes)?)
    }

    /// Loads a snapshot, `None` if there is none at `path` yet.
    pub fn load(path: &Path) -> Result<Option<Self>, Error> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no snapshot at `{}`, starting fresh", path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Self::from_bytes(&bytes).map(Some)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        fs::write(path, self.to_bytes()?).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(
            "saved snapshot of {} records after {} matches to `{}`",
            self.records.len(),
            self.processed,
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_eq_float::assert_eq_float;

    fn sample_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let sev = PlayerId::from("Sev");
        store.put(
            &sev,
            Role::Leader,
            RoleRecord::new(Glicko2Rating::from((1612.5, 210.0, 0.0601))),
        );
        store.put(
            &sev,
            Role::Support,
            RoleRecord::new(Glicko2Rating::new()).after(
                Glicko2Rating::from((1420.0, 290.0, 0.06)),
                Outcomes::LOSS,
            ),
        );
        store.put(
            &PlayerId::from("DD"),
            Role::Support,
            RoleRecord::new(Glicko2Rating::new()),
        );
        store
    }

    #[test]
    fn roles_are_independent() {
        let store = sample_store();
        let sev = PlayerId::from("Sev");

        let leader = store.get(&sev, Role::Leader).unwrap();
        let support = store.get(&sev, Role::Support).unwrap();

        assert_eq_float!(leader.rating.rating, 1612.5);
        assert_eq_float!(support.rating.rating, 1420.0);
        assert!(store.get(&PlayerId::from("DD"), Role::Leader).is_none());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn records_count_results() {
        let record = RoleRecord::new(Glicko2Rating::new())
            .after(Glicko2Rating::from((1600.0, 300.0, 0.06)), Outcomes::WIN)
            .after(Glicko2Rating::from((1550.0, 280.0, 0.06)), Outcomes::WIN)
            .after(Glicko2Rating::from((1500.0, 260.0, 0.06)), Outcomes::LOSS);

        assert_eq!(record.wins, 2);
        assert_eq!(record.losses, 1);
        assert_eq!(record.matches(), 3);
        assert_eq!(record.rating, Glicko2Rating::from((1500.0, 260.0, 0.06)));
    }

    #[test]
    fn iter_groups_by_role() {
        let store = sample_store();
        let keys: Vec<_> = store
            .iter()
            .map(|(player, role, _)| (role, player.as_str().to_owned()))
            .collect();

        assert_eq!(
            keys,
            vec![
                (Role::Leader, "Sev".to_owned()),
                (Role::Support, "DD".to_owned()),
                (Role::Support, "Sev".to_owned()),
            ]
        );
    }

    #[test]
    fn snapshot_bytes_round_trip() {
        let store = sample_store();
        let snapshot = Snapshot::capture(&store, 42);

        let decoded = Snapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.processed, 42);
        assert_eq!(decoded.restore(), store);
    }

    #[test]
    fn snapshot_files() {
        let path = std::env::temp_dir().join(format!("ladder-snapshot-{}.bin", std::process::id()));
        assert_eq!(Snapshot::load(&path).unwrap(), None);

        let snapshot = Snapshot::capture(&sample_store(), 7);
        snapshot.save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, Some(snapshot));
    }

    #[test]
    fn corrupt_snapshot() {
        assert!(matches!(
            Snapshot::from_bytes(&[1, 2, 3]),
            Err(Error::Bitcode(_))
        ));
    }
}
