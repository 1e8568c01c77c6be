//! Best-distance records. A small JSON map on disk keyed by "best" plus a
//! per-day stamp; load and save failures are logged and otherwise ignored so
//! a bad disk never blocks a run.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const STORE_FILE: &str = "distance_records.json";

pub struct PersistencePlugin;

impl Plugin for PersistencePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SessionBest>()
            .add_systems(Startup, load_distance_store);
    }
}

/// Best distance of this process lifetime, never persisted.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SessionBest {
    pub distance_m: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreEntries {
    #[serde(flatten)]
    by_key: HashMap<String, f32>,
}

#[derive(Resource, Debug)]
pub struct DistanceStore {
    path: PathBuf,
    entries: StoreEntries,
}

impl DistanceStore {
    pub fn load(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn get(&self, key: &str) -> f32 {
        self.entries.by_key.get(key).copied().unwrap_or(0.0)
    }

    /// Stores `distance_m` under `key` if it beats the recorded value, and
    /// flushes to disk when the record changed.
    pub fn record_max(&mut self, key: &str, distance_m: f32) {
        if distance_m <= self.get(key) {
            return;
        }
        self.entries.by_key.insert(key.to_string(), distance_m);
        self.flush();
    }

    fn flush(&self) {
        let serialized = match serde_json::to_string_pretty(&self.entries) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("could not serialize distance records: {err}");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, serialized) {
            warn!("could not write {}: {err}", self.path.display());
        }
    }
}

fn load_distance_store(mut commands: Commands) {
    let store = DistanceStore::load(PathBuf::from(STORE_FILE));
    info!(
        "distance records loaded: best {:.0} m, today {:.0} m",
        store.get("best"),
        store.get(&day_stamp())
    );
    commands.insert_resource(store);
}

/// Key for today's record, derived from days since the epoch.
pub fn day_stamp() -> String {
    let days = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() / 86_400)
        .unwrap_or(0);
    format!("day-{days}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> DistanceStore {
        let path = std::env::temp_dir().join(format!("wheelie-cart-test-{name}.json"));
        let _ = fs::remove_file(&path);
        DistanceStore::load(path)
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = temp_store("missing");
        assert_eq!(store.get("best"), 0.0);
    }

    #[test]
    fn record_max_keeps_the_larger_value() {
        let mut store = temp_store("max");
        store.record_max("best", 120.0);
        store.record_max("best", 80.0);
        assert_eq!(store.get("best"), 120.0);
        store.record_max("best", 200.0);
        assert_eq!(store.get("best"), 200.0);
        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn records_survive_a_reload() {
        let mut store = temp_store("reload");
        store.record_max("best", 321.0);
        store.record_max(&day_stamp(), 321.0);
        let reloaded = DistanceStore::load(store.path.clone());
        assert_eq!(reloaded.get("best"), 321.0);
        assert_eq!(reloaded.get(&day_stamp()), 321.0);
        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn day_stamp_is_stable_within_a_run() {
        assert_eq!(day_stamp(), day_stamp());
        assert!(day_stamp().starts_with("day-"));
    }
}
