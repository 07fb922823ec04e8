//! Ingestion: game records in, normalized outcomes out.
//!
//! A game goes through admission (placeholders, exclusion list, dropped
//! players), then every real seat is extracted on its own. A seat that
//! fails extraction is dropped; the rest of the game still counts. Once all
//! seats are in, the game is discarded as a whole if its participant set is
//! inconsistent. Ranks are assigned among the surviving seats.

pub mod admission;
pub mod extract;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use admission::{admit, ExclusionList, GameRejection, Inconsistency};
pub use extract::{extract, extract_with_context, ExtractError, GameContext};

use crate::models::{GameRecord, NormalizedOutcome, Role};

/// Shared flag to stop ingestion early. Work done so far is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcomes of one admitted game.
#[derive(Debug, Clone, Default)]
pub struct GameOutcomes {
    pub outcomes: Vec<NormalizedOutcome>,

    /// Seats that failed extraction
    pub dropped: Vec<(String, ExtractError)>,
}

/// Extract every real seat of a game.
pub fn ingest_game(
    game: &GameRecord,
    exclusions: &ExclusionList,
) -> Result<GameOutcomes, GameRejection> {
    admit(game, exclusions)?;
    let context = GameContext::from_game(game)?;

    let mut result = GameOutcomes::default();
    for seat in &game.factions {
        if let Role::NoFaction(_) = Role::parse(&seat.faction) {
            continue;
        }
        match extract_with_context(game, &context, &seat.faction) {
            Ok(outcome) => result.outcomes.push(outcome),
            Err(e) => result.dropped.push((seat.faction.clone(), e)),
        }
    }

    if context.multi_role {
        return Err(GameRejection::InconsistentParticipantSet(
            Inconsistency::MultiRole,
        ));
    }
    if context.missing_roles != 0 {
        return Err(GameRejection::InconsistentParticipantSet(
            Inconsistency::RoleCountMismatch {
                declared: game.player_count,
                counted: game.player_count as i64 - context.missing_roles,
            },
        ));
    }

    result.outcomes = assign_ranks(result.outcomes);
    Ok(result)
}

/// Rank = 1 + number of opponents with a strictly higher score; tied seats
/// share a rank.
pub fn assign_ranks(outcomes: Vec<NormalizedOutcome>) -> Vec<NormalizedOutcome> {
    let scores: Vec<i64> = outcomes.iter().map(|o| o.score).collect();
    outcomes
        .into_iter()
        .map(|o| {
            let better = scores.iter().filter(|&&s| s > o.score).count();
            o.with_rank(1 + better as u32)
        })
        .collect()
}

/// Counters for an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub games_seen: usize,
    pub games_admitted: usize,
    pub rejections: BTreeMap<String, usize>,
    pub participants_dropped: usize,
    pub outcomes: usize,
    pub cancelled: bool,
}

impl IngestReport {
    pub fn games_rejected(&self) -> usize {
        self.rejections.values().sum()
    }

    /// Combine counters of two runs.
    pub fn absorb(&mut self, other: IngestReport) {
        self.games_seen += other.games_seen;
        self.games_admitted += other.games_admitted;
        for (label, n) in other.rejections {
            *self.rejections.entry(label).or_default() += n;
        }
        self.participants_dropped += other.participants_dropped;
        self.outcomes += other.outcomes;
        self.cancelled |= other.cancelled;
    }
}

/// Runs games through [`ingest_game`], logging and counting what is skipped.
pub struct Ingestor {
    exclusions: ExclusionList,
    cancel: CancelToken,
    report: IngestReport,
}

impl Ingestor {
    pub fn new(exclusions: ExclusionList, cancel: CancelToken) -> Self {
        Self {
            exclusions,
            cancel,
            report: IngestReport::default(),
        }
    }

    /// Outcomes of one game, empty when the game is rejected.
    pub fn ingest(&mut self, game: &GameRecord) -> Vec<NormalizedOutcome> {
        self.report.games_seen += 1;

        match ingest_game(game, &self.exclusions) {
            Ok(result) => {
                for (faction, e) in &result.dropped {
                    warn!(game = %game.game, faction = %faction, "Dropping participant: {}", e);
                }
                self.report.games_admitted += 1;
                self.report.participants_dropped += result.dropped.len();
                self.report.outcomes += result.outcomes.len();
                result.outcomes
            }
            Err(rejection) => {
                match &rejection {
                    GameRejection::Excluded | GameRejection::UnfilledSeat(_) => {
                        debug!(game = %game.game, "Skipping game: {}", rejection)
                    }
                    _ => warn!(game = %game.game, "Skipping game: {}", rejection),
                }
                *self
                    .report
                    .rejections
                    .entry(rejection.label().to_string())
                    .or_default() += 1;
                Vec::new()
            }
        }
    }

    /// Ingest games until the input ends or the run is cancelled.
    pub fn ingest_all<I>(&mut self, games: I) -> Vec<NormalizedOutcome>
    where
        I: IntoIterator<Item = GameRecord>,
    {
        let mut outcomes = Vec::new();
        for game in games {
            if self.cancel.is_cancelled() {
                info!("Ingestion cancelled; keeping {} outcomes", outcomes.len());
                self.report.cancelled = true;
                break;
            }
            outcomes.extend(self.ingest(&game));
        }
        outcomes
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self) -> &IngestReport {
        &self.report
    }

    pub fn into_report(self) -> IngestReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Faction;
    use testing::GameBuilder;

    fn exclusions() -> ExclusionList {
        ExclusionList::builtin()
    }

    #[test]
    fn test_ingest_two_player_game() {
        let game = GameBuilder::two_player("g1").build();
        let result = ingest_game(&game, &exclusions()).unwrap();

        assert_eq!(result.outcomes.len(), 2);
        assert!(result.dropped.is_empty());
        let witches = &result.outcomes[0];
        assert_eq!(witches.faction, Faction::Witches);
        assert_eq!(witches.rank, 1);
        assert_eq!(result.outcomes[1].rank, 2);
    }

    #[test]
    fn test_ties_share_rank() {
        let game = GameBuilder::new("g1")
            .players(3)
            .seat("witches", Some("a"), 100)
            .seat("nomads", Some("b"), 100)
            .seat("giants", Some("c"), 90)
            .build();
        let outcomes = ingest_game(&game, &exclusions()).unwrap().outcomes;
        let ranks: Vec<u32> = outcomes.iter().map(|o| o.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);
    }

    #[test]
    fn test_placeholder_game_yields_nothing() {
        let game = GameBuilder::two_player("g1").empty_seat("player3").build();
        assert_eq!(
            ingest_game(&game, &exclusions()).unwrap_err(),
            GameRejection::UnfilledSeat(3)
        );

        let mut ingestor = Ingestor::new(exclusions(), CancelToken::new());
        assert!(ingestor.ingest(&game).is_empty());
        assert_eq!(ingestor.report().rejections["unfilled_seat"], 1);
    }

    #[test]
    fn test_nofaction_seat_skipped() {
        let game = GameBuilder::two_player("g1").empty_seat("nofaction1").build();
        let result = ingest_game(&game, &exclusions()).unwrap();
        assert_eq!(result.outcomes.len(), 2);
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn test_failing_participant_dropped_rest_kept() {
        let game = GameBuilder::two_player("g1").without_bonus("nomads").build();
        let result = ingest_game(&game, &exclusions()).unwrap();

        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].faction, Faction::Witches);
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].0, "nomads");
    }

    #[test]
    fn test_multi_role_aborts_game() {
        let game = GameBuilder::new("g1")
            .players(2)
            .seat("witches", Some("alice"), 100)
            .seat("nomads", Some("alice"), 90)
            .build();
        assert_eq!(
            ingest_game(&game, &exclusions()).unwrap_err(),
            GameRejection::InconsistentParticipantSet(Inconsistency::MultiRole)
        );
    }

    #[test]
    fn test_role_count_mismatch_aborts_game() {
        let game = GameBuilder::two_player("g1").faction_count(1).build();
        assert_eq!(
            ingest_game(&game, &exclusions()).unwrap_err(),
            GameRejection::InconsistentParticipantSet(Inconsistency::RoleCountMismatch {
                declared: 2,
                counted: 1,
            })
        );
    }

    #[test]
    fn test_unknown_map_rejects_game() {
        let game = GameBuilder::two_player("g1").map("0000").build();
        assert!(matches!(
            ingest_game(&game, &exclusions()),
            Err(GameRejection::Malformed(ExtractError::MalformedMapReference(_)))
        ));
    }

    #[test]
    fn test_ingestor_report() {
        let games = vec![
            GameBuilder::two_player("g1").build(),
            GameBuilder::two_player("wayne").build(),
            GameBuilder::two_player("g3").without_bonus("witches").build(),
        ];

        let mut ingestor = Ingestor::new(exclusions(), CancelToken::new());
        let outcomes = ingestor.ingest_all(games);

        assert_eq!(outcomes.len(), 3);
        let report = ingestor.into_report();
        assert_eq!(report.games_seen, 3);
        assert_eq!(report.games_admitted, 2);
        assert_eq!(report.games_rejected(), 1);
        assert_eq!(report.participants_dropped, 1);
        assert_eq!(report.outcomes, 3);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_cancel_stops_and_keeps_progress() {
        let cancel = CancelToken::new();
        let mut ingestor = Ingestor::new(exclusions(), cancel.clone());

        let first = ingestor.ingest_all(vec![GameBuilder::two_player("g1").build()]);
        cancel.cancel();
        let rest = ingestor.ingest_all(vec![GameBuilder::two_player("g2").build()]);

        assert_eq!(first.len(), 2);
        assert!(rest.is_empty());
        assert!(ingestor.report().cancelled);
        assert_eq!(ingestor.report().games_seen, 1);
    }

    #[test]
    fn test_report_absorb() {
        let mut a = IngestReport {
            games_seen: 2,
            outcomes: 4,
            ..Default::default()
        };
        a.rejections.insert("excluded".into(), 1);
        let mut b = IngestReport {
            games_seen: 1,
            cancelled: true,
            ..Default::default()
        };
        b.rejections.insert("excluded".into(), 2);

        a.absorb(b);
        assert_eq!(a.games_seen, 3);
        assert_eq!(a.rejections["excluded"], 3);
        assert!(a.cancelled);
    }
}
