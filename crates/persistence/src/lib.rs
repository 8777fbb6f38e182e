#![deny(warnings)]

//! Persistence layer: the versioned save envelope and SQLite save slots.
//!
//! A save is a [`SaveData`] envelope around a [`GameState`] snapshot. It is
//! encoded as JSON for interchange and as bincode inside the database (see
//! [`db`]). Decoding runs [`validate_save`] first so a hand-edited or truncated
//! file is rejected with a readable list of problems instead of a serde error.

pub mod db;

pub use db::{create_save, default_sqlite_url, init_db, list_saves, load_latest, SaveSlot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sim_core::GameState;
use thiserror::Error;
use tracing::warn;

/// Envelope version written by this build.
pub const SAVE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub version: u32,
    pub state: GameState,
    /// Turn summaries shown to the player so far, oldest first.
    pub event_log: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("malformed save json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed save bytes: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("invalid save: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("save version {found} is newer than supported version {supported}")]
    NewerVersion { found: u32, supported: u32 },
}

impl SaveData {
    /// Wrap `state` stamped with the current time.
    pub fn new(state: GameState, event_log: Vec<String>) -> Self {
        Self {
            version: SAVE_VERSION,
            state,
            event_log,
            saved_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SaveError> {
        let value: Value = serde_json::from_str(text)?;
        let report = validate_save(&value);
        if !report.valid {
            return Err(SaveError::Invalid(report.errors));
        }
        let save: SaveData = serde_json::from_value(value)?;
        save.check_version()?;
        Ok(save)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        let save: SaveData = bincode::deserialize(bytes)?;
        save.check_version()?;
        Ok(save)
    }

    fn check_version(&self) -> Result<(), SaveError> {
        if self.version > SAVE_VERSION {
            return Err(SaveError::NewerVersion {
                found: self.version,
                supported: SAVE_VERSION,
            });
        }
        Ok(())
    }
}

/// Outcome of the structural check on a save document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check that the fields every loader relies on are present with the right
/// JSON type. This is not a schema of the full state.
pub fn validate_save(doc: &Value) -> SaveValidation {
    let checks: [(&str, fn(&Value) -> bool, &str); 6] = [
        ("/version", Value::is_number, "a number"),
        ("/state/turn", Value::is_number, "a number"),
        ("/state/player/balance", Value::is_number, "a number"),
        ("/state/player/location", Value::is_string, "a string"),
        ("/state/player/inventory", Value::is_object, "an object"),
        ("/state/markets", Value::is_object, "an object"),
    ];

    let mut errors = Vec::new();
    for (pointer, ok, expected) in checks {
        let field = pointer.trim_start_matches('/').replace('/', ".");
        match doc.pointer(pointer) {
            None => errors.push(format!("missing field {field}")),
            Some(v) if !ok(v) => errors.push(format!("{field} must be {expected}")),
            Some(_) => {}
        }
    }
    if !errors.is_empty() {
        warn!(errors = ?errors, "save validation failed");
    }
    SaveValidation {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use sim_core::{GoodId, MarketId, Tunables};

    fn sample() -> SaveData {
        let mut state = GameState::new(&Tunables::default());
        state.turn = 7;
        state.player.balance = 8_765;
        state.player.debt = 1_200;
        state.player.location = MarketId::from("singapore");
        state.player.add_goods(&GoodId::from("h100"), 3, 36_000);
        SaveData::new(state, vec!["Arrived in Singapore.".into()])
    }

    #[test]
    fn json_round_trip_validates_and_preserves_fields() {
        let save = sample();
        let text = save.to_json().unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(validate_save(&doc), SaveValidation { valid: true, errors: vec![] });
        assert!(doc.get("eventLog").is_some());
        assert!(doc.get("savedAt").is_some());

        let back = SaveData::from_json(&text).unwrap();
        assert_eq!(back, save);
        assert_eq!(back.state.player.balance, 8_765);
        assert_eq!(back.state.player.cost_basis[&GoodId::from("h100")], 36_000);
    }

    #[test]
    fn bytes_round_trip() {
        let save = sample();
        let back = SaveData::from_bytes(&save.to_bytes().unwrap()).unwrap();
        assert_eq!(back, save);
    }

    #[test]
    fn validator_reports_each_problem() {
        let doc = json!({
            "version": "one",
            "state": {
                "turn": 3,
                "player": { "balance": "lots", "inventory": [] },
                "markets": {}
            }
        });
        let report = validate_save(&doc);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "version must be a number".to_string(),
                "state.player.balance must be a number".to_string(),
                "missing field state.player.location".to_string(),
                "state.player.inventory must be an object".to_string(),
            ]
        );
        assert!(matches!(
            SaveData::from_json(&doc.to_string()),
            Err(SaveError::Invalid(errs)) if errs.len() == 4
        ));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let mut save = sample();
        save.version = SAVE_VERSION + 1;
        let err = SaveData::from_json(&save.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, SaveError::NewerVersion { found, .. } if found == SAVE_VERSION + 1));
        assert!(SaveData::from_bytes(&save.to_bytes().unwrap()).is_err());
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(matches!(SaveData::from_json("{not json"), Err(SaveError::Json(_))));
        assert!(SaveData::from_bytes(&[1, 2, 3]).is_err());
    }

    proptest! {
        #[test]
        fn numeric_fields_survive_json(balance in -1_000_000i64..10_000_000, turn in 1u32..10_000, debt in 0i64..1_000_000) {
            let mut save = sample();
            save.state.player.balance = balance;
            save.state.player.debt = debt;
            save.state.turn = turn;
            let back = SaveData::from_json(&save.to_json().unwrap()).unwrap();
            prop_assert_eq!(back.state.player.balance, balance);
            prop_assert_eq!(back.state.player.debt, debt);
            prop_assert_eq!(back.state.turn, turn);
        }
    }
}
