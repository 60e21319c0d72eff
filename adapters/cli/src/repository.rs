use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use lucky_draw_core::Participant;
use lucky_draw_pool::{query, Pool};

/// Participant repository backed by a JSON array of participant records.
#[derive(Clone, Debug)]
pub(crate) struct JsonPoolRepository {
    path: PathBuf,
}

impl JsonPoolRepository {
    /// Creates a repository reading and writing the file at `path`.
    #[must_use]
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the pool stored in the backing file.
    pub(crate) fn load(&self) -> Result<Pool> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read pool at {}", self.path.display()))?;
        let records: Vec<Participant> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse pool at {}", self.path.display()))?;
        Pool::new(records)
            .with_context(|| format!("pool at {} is inconsistent", self.path.display()))
    }

    /// Persists the pool, replacing the backing file only once the new contents are written.
    pub(crate) fn save(&self, pool: &Pool) -> Result<()> {
        let json = serde_json::to_string_pretty(query::participants(pool))
            .context("failed to serialize pool")?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)
            .with_context(|| format!("failed to write pool to {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace pool at {}", self.path.display()))
    }
}
