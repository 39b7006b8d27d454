//! The chronological ladder: one match at a time, priors in, posteriors out.

use std::collections::BTreeSet;

use serde::Serialize;
use skillratings::{
    ConfigError, Outcomes,
    glicko2::{Glicko2Rating, glicko2_rating_period},
    probability::{NEUTRAL, category_bonus, category_win_probability, combine},
    team::{TeamStrength, expected_team_score, team_strength},
};
use tracing::{debug, warn};

use crate::{
    config::LadderConfig,
    feed::{MatchOutcome, TeamSheet, Winner},
    player::{PlayerId, Role},
    store::{RatingStore, RoleRecord},
};

/// What the ladder expected of a match before rating it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Position of the match in the feed.
    pub index: usize,
    /// Win probability of team one, skill and category combined.
    pub team_one_probability: f64,
    /// Win probability of team one from ratings alone.
    pub skill_probability: f64,
    /// Win probability of team one's category against team two's.
    pub category_probability: f64,
    /// The actual result.
    pub team_one_won: bool,
}

impl Prediction {
    /// A coin flip prediction is never correct.
    pub const fn is_correct(&self) -> bool {
        if self.team_one_won {
            self.team_one_probability > NEUTRAL
        } else {
            self.team_one_probability < NEUTRAL
        }
    }
}

/// Priors of everyone on one side of a match.
struct Lineup<'a> {
    /// `None` for an unfilled leader slot, which plays at the default rating.
    leader: Option<(&'a PlayerId, RoleRecord)>,
    supports: Vec<(&'a PlayerId, RoleRecord)>,
}

impl<'a> Lineup<'a> {
    fn strength(&self, ladder: &Ladder) -> TeamStrength {
        let leader = self
            .leader
            .map_or(ladder.config.default_rating, |(_, record)| record.rating);
        let supports: Vec<Glicko2Rating> = self.supports.iter().map(|(_, r)| r.rating).collect();
        team_strength(&leader, &supports, ladder.config.leader_influence)
    }

    /// Posteriors of every present member against the rival team.
    fn rate(&self, ladder: &Ladder, rival: &Glicko2Rating, outcome: Outcomes) -> Vec<(&'a PlayerId, Role, RoleRecord)> {
        let results = [(*rival, outcome)];
        let rate = |record: RoleRecord| {
            let posterior = glicko2_rating_period(&record.rating, &results, &ladder.config.glicko2);
            record.after(posterior, outcome)
        };

        self.leader
            .iter()
            .map(|(player, record)| (*player, Role::Leader, rate(*record)))
            .chain(
                self.supports
                    .iter()
                    .map(|(player, record)| (*player, Role::Support, rate(*record))),
            )
            .collect()
    }
}

/// Rates matches in feed order against a [`RatingStore`].
#[derive(Debug, Clone)]
pub struct Ladder {
    config: LadderConfig,
}

impl Ladder {
    pub fn new(config: LadderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &LadderConfig {
        &self.config
    }

    /// Current strength of a team, from the store as it is now.
    pub fn team_strength<S: RatingStore>(&self, store: &S, sheet: &TeamSheet) -> TeamStrength {
        self.lineup(store, sheet).strength(self)
    }

    /// Predicts a match without touching the store.
    pub fn predict<S: RatingStore>(&self, store: &S, index: usize, outcome: &MatchOutcome) -> Prediction {
        let one = self.team_strength(store, &outcome.team_one);
        let two = self.team_strength(store, &outcome.team_two);
        self.prediction(index, outcome, &one, &two)
    }

    /// Predicts and then rates a single match.
    ///
    /// Every prior is read before the first posterior is written,
    /// so teammates and opponents never see each other's update.
    pub fn process<S: RatingStore>(&self, store: &mut S, index: usize, outcome: &MatchOutcome) -> Prediction {
        let one = self.lineup(store, &outcome.team_one);
        let two = self.lineup(store, &outcome.team_two);
        let (one_strength, two_strength) = (one.strength(self), two.strength(self));

        let prediction = self.prediction(index, outcome, &one_strength, &two_strength);

        let categories = &self.config.categories;
        let (one_category, two_category) = (&outcome.team_one.category, &outcome.team_two.category);
        let one_bonus = category_bonus(category_win_probability(one_category, two_category, categories));
        let two_bonus = category_bonus(category_win_probability(two_category, one_category, categories));

        let one_outcome = outcome.team_one_outcome();
        let mut posteriors = one.rate(self, &two_strength.as_opponent(-one_bonus), one_outcome);
        posteriors.extend(two.rate(self, &one_strength.as_opponent(-two_bonus), one_outcome.reversed()));

        debug!(
            "match {index}: {} ({one_category}) vs {} ({two_category}), p = {:.3}, {} won, {} ratings updated",
            outcome.team_one.leader,
            outcome.team_two.leader,
            prediction.team_one_probability,
            match outcome.winner {
                Winner::TeamOne => "team one",
                Winner::TeamTwo => "team two",
            },
            posteriors.len()
        );

        for (player, role, record) in posteriors {
            store.put(player, role, record);
        }
        prediction
    }

    /// Processes `feed[offset..]` in order.
    ///
    /// Resuming a feed at `offset` against the store left by `feed[..offset]`
    /// gives the same ratings as a single pass.
    pub fn run<S: RatingStore>(&self, store: &mut S, feed: &[MatchOutcome], offset: usize) -> Vec<Prediction> {
        let mut last_played = None;
        let mut unknown_categories = BTreeSet::new();
        let mut predictions = Vec::with_capacity(feed.len().saturating_sub(offset));

        for (index, outcome) in feed.iter().enumerate().skip(offset) {
            if let Some(played_at) = outcome.played_at {
                if last_played.is_some_and(|last| played_at < last) {
                    warn!("match {index} was played at {played_at}, before the match preceding it");
                }
                last_played = Some(played_at);
            }
            if !self.config.categories.is_empty() {
                for category in [&outcome.team_one.category, &outcome.team_two.category] {
                    if !self.config.categories.contains_category(category)
                        && unknown_categories.insert(category.clone())
                    {
                        warn!("category `{category}` has no matchup data, treating it as neutral");
                    }
                }
            }
            predictions.push(self.process(store, index, outcome));
        }
        predictions
    }

    fn lineup<'a, S: RatingStore>(&self, store: &S, sheet: &'a TeamSheet) -> Lineup<'a> {
        let record = |player: &PlayerId, role| {
            store
                .get(player, role)
                .unwrap_or_else(|| RoleRecord::new(self.config.default_rating))
        };
        Lineup {
            leader: (!sheet.leader.is_absent())
                .then(|| (&sheet.leader, record(&sheet.leader, Role::Leader))),
            supports: sheet
                .present_supports()
                .map(|player| (player, record(player, Role::Support)))
                .collect(),
        }
    }

    fn prediction(
        &self,
        index: usize,
        outcome: &MatchOutcome,
        one: &TeamStrength,
        two: &TeamStrength,
    ) -> Prediction {
        let (skill_probability, _) = expected_team_score(one, two);
        let category_probability = category_win_probability(
            &outcome.team_one.category,
            &outcome.team_two.category,
            &self.config.categories,
        );
        Prediction {
            index,
            team_one_probability: combine(skill_probability, category_probability),
            skill_probability,
            category_probability,
            team_one_won: outcome.winner == Winner::TeamOne,
        }
    }
}

#[cfg(test)]
mod tests {
    use skillratings::{probability::CategoryTable, team::LeaderInfluence};

    use super::*;
    use crate::{
        feed::parse_feed,
        store::{MemoryStore, Snapshot},
    };

    fn sheet(leader: &str, supports: &[&str], category: &str) -> TeamSheet {
        TeamSheet {
            leader: PlayerId::from(leader),
            supports: supports.iter().copied().map(PlayerId::from).collect(),
            category: category.to_owned(),
        }
    }

    fn outcome(team_one: TeamSheet, team_two: TeamSheet, winner: Winner) -> MatchOutcome {
        MatchOutcome {
            team_one,
            team_two,
            winner,
            played_at: None,
        }
    }

    fn factions() -> CategoryTable {
        let mut table = CategoryTable::new();
        table.insert("ISDF", "Scion", 0.55).unwrap();
        table.insert("Hadean", "ISDF", 0.5689).unwrap();
        table
    }

    fn ladder() -> Ladder {
        Ladder::new(LadderConfig {
            categories: factions(),
            ..LadderConfig::new()
        })
        .unwrap()
    }

    fn rating(store: &MemoryStore, player: &str, role: Role) -> Glicko2Rating {
        store.get(&PlayerId::from(player), role).unwrap().rating
    }

    #[test]
    fn favoured_category_wins_a_duel() {
        let ladder = ladder();
        let mut store = MemoryStore::new();
        let duel = outcome(sheet("A", &[], "ISDF"), sheet("B", &[], "Scion"), Winner::TeamOne);

        let prediction = ladder.process(&mut store, 0, &duel);

        assert!(prediction.team_one_probability > 0.5);
        assert!((prediction.skill_probability - 0.5).abs() < 1e-12);
        assert!((prediction.category_probability - 0.55).abs() < 1e-12);
        assert!(prediction.is_correct());

        let a = rating(&store, "A", Role::Leader);
        let b = rating(&store, "B", Role::Leader);
        assert!(a.rating > 1500.0);
        assert!(b.rating < 1500.0);
        assert!(a.deviation < 350.0);
        assert!(b.deviation < 350.0);
    }

    #[test]
    fn category_bonus_shrinks_the_favourite_gain() {
        let neutral = Ladder::new(LadderConfig::new()).unwrap();
        let favoured = ladder();
        let duel = outcome(sheet("A", &[], "ISDF"), sheet("B", &[], "Scion"), Winner::TeamOne);

        let mut neutral_store = MemoryStore::new();
        neutral.process(&mut neutral_store, 0, &duel);
        let mut favoured_store = MemoryStore::new();
        favoured.process(&mut favoured_store, 0, &duel);

        let neutral_gain = rating(&neutral_store, "A", Role::Leader).rating - 1500.0;
        let favoured_gain = rating(&favoured_store, "A", Role::Leader).rating - 1500.0;
        assert!(favoured_gain < neutral_gain);
        assert!(rating(&favoured_store, "B", Role::Leader).rating > rating(&neutral_store, "B", Role::Leader).rating);
    }

    #[test]
    fn teammates_are_rated_from_priors() {
        let ladder = ladder();
        let mut store = MemoryStore::new();
        let game = outcome(
            sheet("Sev", &["DD", "Sly"], "ISDF"),
            sheet("F9bomber", &["M.S", "Herp"], "ISDF"),
            Winner::TeamTwo,
        );

        ladder.process(&mut store, 0, &game);

        // Identical priors and the same rival, so identical posteriors.
        let dd = rating(&store, "DD", Role::Support);
        assert_eq!(dd, rating(&store, "Sly", Role::Support));
        assert_eq!(dd, rating(&store, "Sev", Role::Leader));
        assert!(dd.rating < 1500.0);
        assert_eq!(
            rating(&store, "M.S", Role::Support),
            rating(&store, "F9bomber", Role::Leader)
        );
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn absent_players_are_never_stored() {
        let ladder = ladder();
        let mut store = MemoryStore::new();
        let game = outcome(
            sheet("", &["DD", ""], "ISDF"),
            sheet("F9bomber", &[""], "Scion"),
            Winner::TeamOne,
        );

        let before = ladder.team_strength(&store, &game.team_one);
        ladder.process(&mut store, 0, &game);

        assert_eq!(store.len(), 2);
        assert!(store.get(&PlayerId::default(), Role::Leader).is_none());
        assert!(store.get(&PlayerId::default(), Role::Support).is_none());
        assert!(rating(&store, "DD", Role::Support).rating > 1500.0);
        // An empty leader slot plays at the default rating.
        assert!((before.rating - 1500.0).abs() < 1e-12);
    }

    #[test]
    fn roles_are_rated_separately() {
        let ladder = ladder();
        let mut store = MemoryStore::new();
        let feed = [
            outcome(sheet("Sev", &[], "ISDF"), sheet("DD", &[], "ISDF"), Winner::TeamOne),
            outcome(sheet("DD", &["Sev"], "ISDF"), sheet("Sly", &[], "ISDF"), Winner::TeamTwo),
        ];

        ladder.run(&mut store, &feed, 0);

        let sev = PlayerId::from("Sev");
        let leader = store.get(&sev, Role::Leader).unwrap();
        let support = store.get(&sev, Role::Support).unwrap();
        assert_eq!((leader.wins, leader.losses), (1, 0));
        assert_eq!((support.wins, support.losses), (0, 1));
        let dd = store.get(&PlayerId::from("DD"), Role::Leader).unwrap();
        assert_eq!((dd.wins, dd.losses), (0, 2));
    }

    #[test]
    fn influence_changes_team_strength() {
        let mut store = MemoryStore::new();
        store.put(
            &PlayerId::from("Sev"),
            Role::Leader,
            RoleRecord::new(Glicko2Rating::from((1800.0, 100.0, 0.06))),
        );
        let team = sheet("Sev", &["DD"], "ISDF");

        let leader_only = Ladder::new(LadderConfig {
            leader_influence: LeaderInfluence::new(1.0).unwrap(),
            ..LadderConfig::new()
        })
        .unwrap();

        assert!((leader_only.team_strength(&store, &team).rating - 1800.0).abs() < 1e-9);
        assert!((ladder().team_strength(&store, &team).rating - 1650.0).abs() < 1e-9);
    }

    #[test]
    fn predict_leaves_the_store_alone() {
        let ladder = ladder();
        let mut store = MemoryStore::new();
        let game = outcome(sheet("A", &["C"], "Hadean"), sheet("B", &[], "ISDF"), Winner::TeamTwo);

        let predicted = ladder.predict(&store, 3, &game);
        assert!(store.is_empty());

        let processed = ladder.process(&mut store, 3, &game);
        assert_eq!(predicted, processed);
        assert!(!processed.is_correct());
    }

    #[test]
    fn coin_flips_are_never_correct() {
        let mut prediction = Prediction {
            index: 0,
            team_one_probability: 0.5,
            skill_probability: 0.5,
            category_probability: 0.5,
            team_one_won: true,
        };
        assert!(!prediction.is_correct());
        prediction.team_one_won = false;
        assert!(!prediction.is_correct());
    }

    fn sample_feed() -> Vec<MatchOutcome> {
        parse_feed(
            r#"[
  {"team1command": "Sev", "team2command": "F9bomber", "team1faction": "ISDF", "team2faction": "Hadean",
   "teamOneThugs": ["DD", "Sly"], "teamTwoThugs": ["M.S", "Herp"], "winningTeamId": 2},
  {"team1command": "M.S", "team2command": "Sev", "team1faction": "Scion", "team2faction": "ISDF",
   "teamOneThugs": ["F9bomber"], "teamTwoThugs": ["DD", ""], "winningTeamId": 1},
  {"team1command": "DD", "team2command": "Herp", "team1faction": "Hadean", "team2faction": "Hadean",
   "teamOneThugs": ["Sev", "M.S"], "teamTwoThugs": ["Sly", "F9bomber"], "winningTeamId": 1},
  {"team1command": "F9bomber", "team2command": "Sly", "team1faction": "ISDF", "team2faction": "Scion",
   "teamOneThugs": [], "teamTwoThugs": ["DD"], "winningTeamId": 2},
  {"team1command": "Sev", "team2command": "DD", "team1faction": "Scion", "team2faction": "Hadean",
   "teamOneThugs": ["Herp", "F9bomber"], "teamTwoThugs": ["M.S"], "winningTeamId": 1},
  {"team1command": "Herp", "team2command": "M.S", "team1faction": "Hadean", "team2faction": "ISDF",
   "teamOneThugs": ["Sev"], "teamTwoThugs": ["Sly", "DD"], "winningTeamId": 2}
]"#,
        )
        .unwrap()
    }

    #[test]
    fn resuming_matches_a_single_pass() {
        let ladder = ladder();
        let feed = sample_feed();

        let mut single_pass = MemoryStore::new();
        let all_predictions = ladder.run(&mut single_pass, &feed, 0);
        assert_eq!(all_predictions.len(), feed.len());

        for split in 0..=feed.len() {
            let mut first_half = MemoryStore::new();
            let mut predictions = ladder.run(&mut first_half, &feed[..split], 0);

            let bytes = Snapshot::capture(&first_half, split).to_bytes().unwrap();
            let snapshot = Snapshot::from_bytes(&bytes).unwrap();
            let mut store = snapshot.restore();
            predictions.extend(ladder.run(&mut store, &feed, snapshot.processed));

            assert_eq!(store, single_pass, "split at {split}");
            assert_eq!(predictions, all_predictions, "split at {split}");
        }
    }

    #[test]
    fn order_matters() {
        let ladder = ladder();
        let feed = sample_feed();
        let reversed: Vec<_> = feed.iter().rev().cloned().collect();

        let mut forward = MemoryStore::new();
        ladder.run(&mut forward, &feed, 0);
        let mut backward = MemoryStore::new();
        ladder.run(&mut backward, &reversed, 0);

        assert_ne!(forward, backward);
    }

    #[test]
    fn run_counts_results() {
        let ladder = ladder();
        let feed = sample_feed();
        let mut store = MemoryStore::new();

        let predictions = ladder.run(&mut store, &feed, 0);

        let indices: Vec<_> = predictions.iter().map(|p| p.index).collect();
        assert_eq!(indices, (0..feed.len()).collect::<Vec<_>>());

        let dd_support = store.get(&PlayerId::from("DD"), Role::Support).unwrap();
        assert_eq!((dd_support.wins, dd_support.losses), (2, 2));
        let dd_leader = store.get(&PlayerId::from("DD"), Role::Leader).unwrap();
        assert_eq!((dd_leader.wins, dd_leader.losses), (1, 1));

        // Every filled slot of every match counted once.
        let total: u32 = store.iter().map(|(_, _, record)| record.matches()).sum();
        assert_eq!(total, 6 + 4 + 6 + 3 + 5 + 5);
    }

    #[test]
    fn run_past_the_end_does_nothing() {
        let ladder = ladder();
        let feed = sample_feed();
        let mut store = MemoryStore::new();

        assert!(ladder.run(&mut store, &feed, feed.len() + 3).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = LadderConfig {
            glicko2: skillratings::glicko2::Glicko2Config {
                tau: -1.0,
                ..Default::default()
            },
            ..LadderConfig::new()
        };
        assert!(matches!(Ladder::new(config), Err(ConfigError::Tau(_))));
    }
}
