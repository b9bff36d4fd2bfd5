use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use playground_types::models::Playground;

use crate::store::sort_by_name;
use crate::validation::{check_duplicates, is_valid_postal_code};

/// Author recorded on every seeded playground.
pub const SEED_AUTHOR: &str = "Admin";

/// Reads a JSON array of playgrounds. An empty file is an empty list.
pub fn load_fixture(path: &Path) -> Result<Vec<Playground>> {
    let raw = std::fs::read(path).with_context(|| format!("Couldn't read {}", path.display()))?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&raw)
        .with_context(|| format!("Couldn't parse {} as a playground list", path.display()))
}

/// Turns fixtures into published records: sorted by name, ids from 1,
/// authored by [`SEED_AUTHOR`]. Entries with a bad postal code or a name or
/// address already taken are skipped with a warning.
pub fn prepare(mut fixtures: Vec<Playground>) -> Vec<Playground> {
    sort_by_name(&mut fixtures);
    let now = Utc::now();

    let mut accepted: Vec<Playground> = Vec::with_capacity(fixtures.len());
    for mut playground in fixtures {
        playground.name = playground.name.trim().to_string();
        playground.address = playground.address.trim().to_string();
        playground.postal_code = playground.postal_code.trim().to_string();

        if playground.name.is_empty() || !is_valid_postal_code(&playground.postal_code) {
            warn!(
                "Skipping fixture '{}': missing name or bad postal code '{}'",
                playground.name, playground.postal_code
            );
            continue;
        }

        // Distinct facilities may share a point; only name and address must be unique
        let taken = check_duplicates(&playground.name, &playground.address, None, &accepted, None);
        if let Err(e) = taken {
            warn!("Skipping fixture '{}': {}", playground.name, e);
            continue;
        }

        playground.id = accepted.len() as i64 + 1;
        playground.author = SEED_AUTHOR.to_string();
        playground.time_of_submission = now;
        playground.draft = false;
        for comment in &mut playground.comments {
            comment.playground_id = playground.id;
        }
        accepted.push(playground);
    }
    accepted
}
