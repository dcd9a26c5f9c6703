//! Divisions, gates and the mood beam
//!
//! A division is a life-area bucket (`fieldOps`, `mindRhythm`, ...). Each
//! one is linked to two gates, and each keeps free-form notes whose `mood`
//! field colors the beam.

use crate::error::Result;
use crate::storage::{keys, ClientStorage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Division used when a reflection names none
pub const CORE_DIVISION: &str = "core";

/// Beam color when no mood matches
pub const NEUTRAL_BEAM: &str = "#999";

/// Gates linked to each division, by friendly name
pub const DIVISION_GATES: [(&str, [&str; 2]); 8] = [
    ("fieldOps", ["FarmOS", "SovereignField"]),
    ("selfSustain", ["PurchaseTracker", "MaintenanceManager"]),
    ("mindRhythm", ["MindSetFree", "MindIron"]),
    ("educationFlow", ["LearnLume", "TeachEasy"]),
    ("creativeOps", ["BrandBull", "PlanMore"]),
    ("socialResonance", ["CoachBuddy", "BusinessPortal"]),
    ("ecoSystems", ["FarmOS", "RealStates"]),
    ("businessLine", ["BusinessPortal", "SingleSolutions"]),
];

const GATE_KEYS: [(&str, &str); 13] = [
    ("MindSetFree", "mindset"),
    ("PlanMore", "planmore"),
    ("DietDiary", "diet"),
    ("LearnLume", "learn"),
    ("CoachBuddy", "coachbuddy"),
    ("BusinessPortal", "business"),
    ("TeachEasy", "teacheasy"),
    ("PurchaseTracker", "purchase"),
    ("MaintenanceManager", "maintenance"),
    ("RealStates", "realstates"),
    ("FarmOS", "farmos"),
    ("MindIron", "mindiron"),
    ("SovereignField", "sovereign"),
];

/// Mood keywords and the beam color they select; first match wins
const MOOD_COLORS: [(&[&str], &str); 6] = [
    (&["calm", "peace", "balance"], "#5aa7ff"),
    (&["focus", "clarity", "discipline"], "#50fa7b"),
    (&["inspired", "creative", "gold"], "#ffc857"),
    (&["tired", "low", "drained"], "#9b9b9b"),
    (&["energy", "alive", "vibrant"], "#ff6f61"),
    (&["reflect", "memory", "depth"], "#6a5acd"),
];

/// Gate key for a friendly gate name
pub fn gate_key(name: &str) -> Option<&'static str> {
    GATE_KEYS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, key)| *key)
}

/// Keys of the gates linked to `division`; gates without a key are skipped
pub fn gate_keys_for_division(division: &str) -> Vec<&'static str> {
    DIVISION_GATES
        .iter()
        .find(|(d, _)| *d == division)
        .map(|(_, gates)| gates.iter().filter_map(|g| gate_key(g)).collect())
        .unwrap_or_default()
}

/// Names of all divisions
pub fn division_names() -> impl Iterator<Item = &'static str> {
    DIVISION_GATES.iter().map(|(d, _)| *d)
}

/// A gate as listed by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientGate {
    pub name: &'static str,
    pub key: &'static str,
    pub url: &'static str,
}

/// Gates the dashboard links to
pub fn client_gates() -> Vec<ClientGate> {
    vec![
        ClientGate {
            name: "MindSetFree",
            key: "mindset",
            url: "https://placeholder.local/mindsetfree",
        },
        ClientGate {
            name: "PlanMore",
            key: "planmore",
            url: "https://placeholder.local/planmore",
        },
        ClientGate {
            name: "DietDiary",
            key: "diet",
            url: "https://placeholder.local/dietdiary",
        },
        ClientGate {
            name: "LearnLume",
            key: "learn",
            url: "https://placeholder.local/learnlume",
        },
    ]
}

/// Notes kept for one division
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DivisionNotes {
    pub focus_hours: String,
    pub wins: String,
    pub blockers: String,
    pub mood: String,
}

/// Notes of every division, keyed by division name
pub type Divisions = BTreeMap<String, DivisionNotes>;

/// One empty record per division
pub fn default_divisions() -> Divisions {
    division_names()
        .map(|d| (d.to_string(), DivisionNotes::default()))
        .collect()
}

/// Saved division notes, or empty ones
pub async fn load_divisions(storage: &ClientStorage) -> Divisions {
    storage
        .read_json(keys::DIVISIONS)
        .await
        .unwrap_or_else(default_divisions)
}

pub async fn save_divisions(storage: &ClientStorage, divisions: &Divisions) -> Result<()> {
    storage.write_json(keys::DIVISIONS, divisions).await
}

/// Beam color for the divisions' moods
pub fn beam_color(divisions: &Divisions) -> &'static str {
    let moods: Vec<String> = divisions
        .values()
        .map(|notes| notes.mood.trim().to_lowercase())
        .filter(|mood| !mood.is_empty())
        .collect();
    if moods.is_empty() {
        return NEUTRAL_BEAM;
    }

    let text = moods.join(" ");
    MOOD_COLORS
        .iter()
        .find(|(words, _)| words.iter().any(|w| text.contains(w)))
        .map(|(_, color)| *color)
        .unwrap_or(NEUTRAL_BEAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_moods(moods: &[(&str, &str)]) -> Divisions {
        let mut divisions = default_divisions();
        for (division, mood) in moods {
            divisions.insert(
                division.to_string(),
                DivisionNotes {
                    mood: mood.to_string(),
                    ..Default::default()
                },
            );
        }
        divisions
    }

    #[test]
    fn test_gate_keys_for_division() {
        assert_eq!(gate_keys_for_division("educationFlow"), vec!["learn", "teacheasy"]);
        assert_eq!(gate_keys_for_division("creativeOps"), vec!["planmore"]);
        assert_eq!(gate_keys_for_division("businessLine"), vec!["business"]);
        assert!(gate_keys_for_division("core").is_empty());
    }

    #[test]
    fn test_client_gates_have_keys() {
        for gate in client_gates() {
            assert_eq!(gate_key(gate.name), Some(gate.key));
        }
    }

    #[test]
    fn test_every_division_listed() {
        let divisions = default_divisions();
        assert_eq!(divisions.len(), 8);
        assert!(divisions.contains_key("socialResonance"));
    }

    #[test]
    fn test_beam_color() {
        assert_eq!(beam_color(&default_divisions()), NEUTRAL_BEAM);
        assert_eq!(beam_color(&with_moods(&[("fieldOps", "Calm")])), "#5aa7ff");
        assert_eq!(beam_color(&with_moods(&[("mindRhythm", "drained")])), "#9b9b9b");
        assert_eq!(beam_color(&with_moods(&[("mindRhythm", "meh")])), NEUTRAL_BEAM);
        // earlier rule wins across divisions
        assert_eq!(
            beam_color(&with_moods(&[("fieldOps", "vibrant"), ("mindRhythm", "focused")])),
            "#50fa7b"
        );
    }

    #[tokio::test]
    async fn test_divisions_persistence() {
        let storage = ClientStorage::in_memory();
        assert_eq!(load_divisions(&storage).await, default_divisions());

        let divisions = with_moods(&[("ecoSystems", "alive")]);
        save_divisions(&storage, &divisions).await.unwrap();
        assert_eq!(load_divisions(&storage).await, divisions);

        storage
            .set_string(keys::DIVISIONS, r#"{"fieldOps":{"mood":"calm"},"selfSustain":{}}"#)
            .await
            .unwrap();
        let loaded = load_divisions(&storage).await;
        assert_eq!(loaded["fieldOps"].mood, "calm");
        assert_eq!(loaded["selfSustain"], DivisionNotes::default());
    }
}
