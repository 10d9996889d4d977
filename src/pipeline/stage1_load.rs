use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::input::artifact::{Fingerprint, read_artifact, write_artifact};
use crate::input::persons::{HistogramBucket, PersonAbility, load_histogram, load_persons};
use crate::input::{InputError, SourcePaths, load_sources};
use crate::pipeline::stage2_enrich::{EnrichOutput, PIPELINE_VERSION, run_enrichment};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub paths: SourcePaths,
    pub pipeline_version: u32,
}

impl CacheKey {
    pub fn new(paths: &SourcePaths) -> Self {
        Self {
            paths: paths.clone(),
            pipeline_version: PIPELINE_VERSION,
        }
    }
}

/// Process-lifetime memo of loaded and enriched tables.
///
/// Source files are treated as immutable while the process runs; the only
/// invalidation is [`DataContext::clear`].
#[derive(Debug, Default)]
pub struct DataContext {
    enriched: HashMap<CacheKey, Arc<EnrichOutput>>,
    persons: HashMap<PathBuf, Arc<Vec<PersonAbility>>>,
    histograms: HashMap<PathBuf, Arc<Vec<HistogramBucket>>>,
    builds: usize,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enriched table for `paths`, joining the sources at most once per key.
    pub fn enriched(&mut self, paths: &SourcePaths) -> Result<Arc<EnrichOutput>, InputError> {
        let key = CacheKey::new(paths);
        if let Some(hit) = self.enriched.get(&key) {
            tracing::debug!("enriched table served from memory");
            return Ok(Arc::clone(hit));
        }
        let sources = load_sources(paths)?;
        let output = Arc::new(run_enrichment(&sources)?);
        self.builds += 1;
        self.enriched.insert(key, Arc::clone(&output));
        Ok(output)
    }

    /// Like [`DataContext::enriched`], but backed by the persisted artifact in
    /// `artifact_dir`: a matching artifact is reused, otherwise the table is
    /// rebuilt and written back.
    pub fn enriched_persisted(
        &mut self,
        paths: &SourcePaths,
        artifact_dir: &Path,
        rebuild: bool,
    ) -> Result<Arc<EnrichOutput>, InputError> {
        let key = CacheKey::new(paths);
        if !rebuild {
            if let Some(hit) = self.enriched.get(&key) {
                return Ok(Arc::clone(hit));
            }
        }

        let fingerprint = Fingerprint::compute(paths)?;
        if !rebuild {
            if let Some(output) = read_artifact(artifact_dir, &fingerprint)? {
                let output = Arc::new(output);
                self.enriched.insert(key, Arc::clone(&output));
                return Ok(output);
            }
        }

        self.enriched.remove(&key);
        let output = self.enriched(paths)?;
        write_artifact(artifact_dir, &output, &fingerprint)?;
        Ok(output)
    }

    pub fn persons(&mut self, path: &Path) -> Result<Arc<Vec<PersonAbility>>, InputError> {
        if let Some(hit) = self.persons.get(path) {
            return Ok(Arc::clone(hit));
        }
        let rows = Arc::new(load_persons(path)?);
        self.persons.insert(path.to_path_buf(), Arc::clone(&rows));
        Ok(rows)
    }

    pub fn histogram(&mut self, path: &Path) -> Result<Arc<Vec<HistogramBucket>>, InputError> {
        if let Some(hit) = self.histograms.get(path) {
            return Ok(Arc::clone(hit));
        }
        let rows = Arc::new(load_histogram(path)?);
        self.histograms.insert(path.to_path_buf(), Arc::clone(&rows));
        Ok(rows)
    }

    /// Number of times the join pipeline actually ran.
    pub fn builds(&self) -> usize {
        self.builds
    }

    pub fn clear(&mut self) {
        self.enriched.clear();
        self.persons.clear();
        self.histograms.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_load.rs"]
mod tests;
