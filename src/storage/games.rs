//! Downloaded game files.
//!
//! Each file is a JSON array of game records, usually one file per month
//! (`2017-12.json`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::StorageError;
use crate::models::GameRecord;

static MONTHLY_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}(\d{2})-(\d{2})$").expect("monthly file pattern"));

/// Game files in a directory, sorted by name.
pub fn list_game_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    if !dir.is_dir() {
        return Err(StorageError::PathNotFound(dir.to_path_buf()));
    }

    let pattern = dir.join("*.json");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| StorageError::InvalidPath(format!("{:?}", dir)))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Cannot read game file entry: {}", e),
        }
    }
    files.sort();

    debug!("Found {} game files in {:?}", files.len(), dir);
    Ok(files)
}

/// Read every game record of a file. Records that do not fit the expected
/// shape are logged and skipped.
pub fn read_games(path: &Path) -> Result<Vec<GameRecord>, StorageError> {
    let contents = fs::read_to_string(path)?;
    let raw: Vec<serde_json::Value> = serde_json::from_str(&contents)?;

    let mut games = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<GameRecord>(value) {
            Ok(game) => games.push(game),
            Err(e) => warn!("Skipping record {} of {:?}: {}", index, path, e),
        }
    }

    info!("Parsed {} games from {:?}", games.len(), path);
    Ok(games)
}

/// Monthly table name for a game file: `2017-12.json` gives
/// `stats1712.json`. `None` for files not named after a month.
pub fn monthly_table_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let caps = MONTHLY_FILE.captures(stem)?;
    Some(format!("stats{}{}.json", &caps[1], &caps[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::GameBuilder;
    use tempfile::TempDir;

    #[test]
    fn test_monthly_table_name() {
        assert_eq!(
            monthly_table_name(Path::new("games/2017-12.json")).as_deref(),
            Some("stats1712.json")
        );
        assert_eq!(
            monthly_table_name(Path::new("2020-01.json")).as_deref(),
            Some("stats2001.json")
        );
        assert_eq!(monthly_table_name(Path::new("games/all.json")), None);
        assert_eq!(monthly_table_name(Path::new("2017-1.json")), None);
    }

    #[test]
    fn test_list_game_files_sorted_json_only() {
        let dir = TempDir::new().unwrap();
        for name in ["2018-01.json", "2017-12.json", "notes.txt", "2017-11.json.gz"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::create_dir(dir.path().join("old.json")).unwrap();

        let files = list_game_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["2017-12.json", "2018-01.json"]);
    }

    #[test]
    fn test_list_missing_dir() {
        assert!(matches!(
            list_game_files(Path::new("/nonexistent/games")),
            Err(StorageError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_read_games_skips_bad_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2017-12.json");

        let good = serde_json::to_value(GameBuilder::two_player("g1").build()).unwrap();
        let bad = serde_json::json!({"game": "broken", "base_map": null});
        fs::write(&path, serde_json::to_string(&vec![good, bad]).unwrap()).unwrap();

        let games = read_games(&path).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game, "g1");
        assert_eq!(games[0].factions.len(), 2);
    }

    #[test]
    fn test_read_games_not_an_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(read_games(&path), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_read_server_shaped_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2017-12.json");
        fs::write(
            &path,
            r#"[{
                "game": "Game1",
                "base_map": "126fe960806d587c78546b30f1a90853b1ada468",
                "player_count": 2,
                "last_update": "2017-12-03 10:00:00",
                "player_count_hint": "ignored",
                "factions": [
                    {"faction": "witches", "player": "alice", "id_hash": "x"},
                    {"faction": "nomads", "player": null}
                ],
                "events": {
                    "global": {"drop-faction": {"all": 1}},
                    "faction": {
                        "witches": {"vp": {"round": {"all": 100, "6": 12}}}
                    }
                }
            }]"#,
        )
        .unwrap();

        let games = read_games(&path).unwrap();
        assert_eq!(games.len(), 1);
        let game = &games[0];
        assert_eq!(game.factions[1].player, None);
        assert_eq!(game.global_event("drop-faction").unwrap().all, Some(1));
        assert_eq!(
            game.faction_events("witches").unwrap()["vp"].total(),
            Some(100)
        );
    }
}
