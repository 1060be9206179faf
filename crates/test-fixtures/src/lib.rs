//! Test fixture loader for Engram integration scenarios.
//!
//! Provides typed deserialization of fixture JSON files from the shared
//! `fixtures/` directory, usable from any crate in the workspace.

use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Root directory of the fixtures folder.
fn fixtures_root() -> PathBuf {
    // Works from any crate in the workspace: walk up to find fixtures/.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);

    while !path.join("fixtures").exists() {
        if !path.pop() {
            panic!(
                "Could not find fixtures directory from CARGO_MANIFEST_DIR={}",
                manifest_dir
            );
        }
    }
    path.join("fixtures")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Check that a fixture file exists.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// A seed memory used by the end-to-end scenarios.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SeedMemory {
    pub text: String,
    pub kind: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Load the standard seed-memory set.
pub fn seed_memories() -> Vec<SeedMemory> {
    load_fixture("seed_memories.json")
}
