//! Local high-score table stored as `name:score` lines

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Entries kept in a table
pub const DEFAULT_CAPACITY: usize = 10;

const SEED: &[(&str, u32)] = &[
    ("Garnet", 1200),
    ("Basalt", 1000),
    ("Opal", 320),
    ("Flint", 300),
    ("Quartz", 200),
    ("Jasper", 190),
    ("Mica", 120),
    ("Slate", 120),
    ("Onyx", 120),
    ("Talc", 100),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

impl ScoreEntry {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        ScoreEntry {
            name: name.into(),
            score,
        }
    }
}

impl std::fmt::Display for ScoreEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.score)
    }
}

impl FromStr for ScoreEntry {
    type Err = GameError;

    /// `name:score`; the name may itself contain colons
    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        line.rsplit_once(':')
            .filter(|(name, _)| !name.is_empty())
            .and_then(|(name, score)| Some(ScoreEntry::new(name, score.trim().parse().ok()?)))
            .ok_or_else(|| GameError::InvalidMessage(format!("bad score entry '{}'", line)))
    }
}

/// Best scores, highest first, bounded by a capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTable {
    entries: Vec<ScoreEntry>,
    capacity: usize,
}

impl Default for ScoreTable {
    fn default() -> Self {
        ScoreTable::from_entries(
            SEED.iter().map(|(name, score)| ScoreEntry::new(*name, *score)),
            DEFAULT_CAPACITY,
        )
    }
}

impl ScoreTable {
    pub fn empty(capacity: usize) -> Self {
        ScoreTable {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Table holding the best of `entries`
    pub fn from_entries(entries: impl IntoIterator<Item = ScoreEntry>, capacity: usize) -> Self {
        let mut table = ScoreTable::empty(capacity);
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Parse `name:score` lines; malformed lines are skipped
    pub fn parse(text: &str, capacity: usize) -> Self {
        let mut table = ScoreTable::empty(capacity);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match line.parse::<ScoreEntry>() {
                Ok(entry) => {
                    table.insert(entry);
                }
                Err(_) => tracing::warn!("Skipping malformed score line '{}'", line),
            }
        }
        table
    }

    pub fn to_text(&self) -> String {
        self.entries.iter().map(|e| format!("{}\n", e)).collect()
    }

    /// Whether a score would enter the table
    pub fn qualifies(&self, score: u32) -> bool {
        self.entries.len() < self.capacity
            || self.entries.last().is_some_and(|lowest| score > lowest.score)
    }

    /// Insert keeping descending order; returns the rank, or `None` if the score did not make it
    ///
    /// Equal scores rank below the ones already in the table.
    pub fn insert(&mut self, entry: ScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }
        let rank = self.entries.partition_point(|e| e.score >= entry.score);
        self.entries.insert(rank, entry);
        self.entries.truncate(self.capacity);
        Some(rank)
    }

    pub fn best(&self) -> Option<&ScoreEntry> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a table from disk, falling back to the default table when the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Ok(ScoreTable::parse(&text, DEFAULT_CAPACITY)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No score file at {}, using defaults", path.as_ref().display());
                Ok(ScoreTable::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}
