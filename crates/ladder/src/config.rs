use std::{fs, path::{Path, PathBuf}, str::FromStr};

use skillratings::{
    ConfigError,
    glicko2::{Glicko2Config, Glicko2Rating},
    probability::CategoryTable,
    team::LeaderInfluence,
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`{0}` must be set")]
    MissingVar(&'static str),
    #[error("`{var}` has an invalid value `{value}`")]
    InvalidVar { var: &'static str, value: String },
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid category table: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to load .env: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Tunables of a ladder. Fixed once the ladder is built.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderConfig {
    pub leader_influence: LeaderInfluence,
    pub glicko2: Glicko2Config,
    /// Rating a player starts with in each role.
    pub default_rating: Glicko2Rating,
    pub categories: CategoryTable,
}

impl LadderConfig {
    pub fn new() -> Self {
        Self {
            leader_influence: LeaderInfluence::default(),
            glicko2: Glicko2Config::new(),
            default_rating: Glicko2Rating::new(),
            categories: CategoryTable::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.glicko2.validate()?;
        self.default_rating.validate()?;
        self.categories.validate()
    }
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the `ladder` binary needs for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub feed: PathBuf,
    pub snapshot: Option<PathBuf>,
    pub standings: Option<PathBuf>,
    pub config: LadderConfig,
}

impl RunSettings {
    /// Reads the settings from the environment, honoring a `.env` file if there is one.
    pub fn try_from_env() -> Result<Self, Error> {
        if !load_dotenv()? {
            debug!(".env not found. Using the process environment.");
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let feed = lookup("LADDER_FEED")
            .map(PathBuf::from)
            .ok_or(Error::MissingVar("LADDER_FEED"))?;

        let mut config = LadderConfig::new();
        match parse_var::<f64>(&lookup, "LADDER_LEADER_INFLUENCE")? {
            Some(influence) => config.leader_influence = LeaderInfluence::new(influence)?,
            None => debug!(".env `LADDER_LEADER_INFLUENCE` not found. Using default."),
        }
        match parse_var::<f64>(&lookup, "LADDER_TAU")? {
            Some(tau) => config.glicko2 = Glicko2Config::with_tau(tau)?,
            None => debug!(".env `LADDER_TAU` not found. Using default."),
        }
        match lookup("LADDER_CATEGORIES") {
            Some(path) => config.categories = read_categories(Path::new(&path))?,
            None => debug!(".env `LADDER_CATEGORIES` not found. Every matchup is neutral."),
        }
        config.validate()?;

        Ok(Self {
            feed,
            snapshot: lookup("LADDER_SNAPSHOT").map(PathBuf::from),
            standings: lookup("LADDER_STANDINGS").map(PathBuf::from),
            config,
        })
    }
}

/// Loads `.env` into the process environment. `false` if there is no `.env`.
///
/// Variables already set in the process are kept.
pub fn load_dotenv() -> Result<bool, Error> {
    match dotenv::dotenv() {
        Ok(_) => Ok(true),
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// `LOG_LEVEL`, case insensitive, `DEBUG` when unset or unknown.
pub fn log_level(lookup: impl Fn(&str) -> Option<String>) -> tracing::Level {
    lookup("LOG_LEVEL")
        .and_then(|level| tracing::Level::from_str(&level.to_uppercase()).ok())
        .unwrap_or(tracing::Level::DEBUG)
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, Error> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| Error::InvalidVar { var, value })
        })
        .transpose()
}

/// Reads and validates a category table, `{"A": {"B": p}}` meaning A beats B with probability `p`.
pub fn read_categories(path: &Path) -> Result<CategoryTable, Error> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let table: CategoryTable = serde_json::from_str(&text)?;
    table.validate()?;
    debug!("loaded {} category matchups from `{}`", table.len(), path.display());
    Ok(table)
}
