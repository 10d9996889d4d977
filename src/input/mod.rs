use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod artifact;
pub mod cache;
pub mod dictionary;
pub mod facts;
pub mod persons;
pub mod table;

use dictionary::{Item, RubricLevel, parse_items, parse_rubric};
use facts::{CountFact, IrtFact, MeanFact, PropScale, parse_counts, parse_irt, parse_means};
use table::read_table;

/// The source tables the tool knows how to read, plus the analytic artifact it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Dictionary,
    Rubric,
    Counts,
    Means,
    Irt,
    Persons,
    PersonHistogram,
    Analytic,
}

impl TableKind {
    pub fn stem(self) -> &'static str {
        match self {
            TableKind::Dictionary => "diccionario",
            TableKind::Rubric => "diccionario_rubrica",
            TableKind::Counts => "item_conteo_grado",
            TableKind::Means => "item_medias",
            TableKind::Irt => "item_irt_eia",
            TableKind::Persons => "personas_uni",
            TableKind::PersonHistogram => "personas_dist",
            TableKind::Analytic => "analytic",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TableKind::Dictionary => "item dictionary",
            TableKind::Rubric => "rubric dictionary",
            TableKind::Counts => "count table",
            TableKind::Means => "mean-score table",
            TableKind::Irt => "IRT difficulty table",
            TableKind::Persons => "person ability table",
            TableKind::PersonHistogram => "person histogram table",
            TableKind::Analytic => "analytic table",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.stem())
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("{table}: missing expected column `{column}`")]
    MissingColumn { table: TableKind, column: String },
    #[error("{table}: line {line}: column `{column}` has invalid value {value:?}: {reason}")]
    InvalidValue {
        table: TableKind,
        line: usize,
        column: String,
        value: String,
        reason: String,
    },
    #[error(
        "{table}: line {line}: response level {value:?} in column `resp` is not one of N0, N1, N2, N3"
    )]
    InvalidLevel {
        table: TableKind,
        line: usize,
        value: String,
    },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Resolved locations of the seven source tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePaths {
    pub dictionary: PathBuf,
    pub rubric: PathBuf,
    pub counts: PathBuf,
    pub means: PathBuf,
    pub irt: PathBuf,
    pub persons: PathBuf,
    pub histogram: PathBuf,
}

impl SourcePaths {
    pub fn resolve(data_dir: &Path) -> Result<Self, InputError> {
        if !data_dir.is_dir() {
            return Err(InputError::MissingInput(format!(
                "data directory {} does not exist",
                data_dir.display()
            )));
        }
        Ok(Self {
            dictionary: find_table_path(data_dir, TableKind::Dictionary)?,
            rubric: find_table_path(data_dir, TableKind::Rubric)?,
            counts: find_table_path(data_dir, TableKind::Counts)?,
            means: find_table_path(data_dir, TableKind::Means)?,
            irt: find_table_path(data_dir, TableKind::Irt)?,
            persons: find_table_path(data_dir, TableKind::Persons)?,
            histogram: find_table_path(data_dir, TableKind::PersonHistogram)?,
        })
    }

    /// Tables read by the enrichment pipeline, in join order.
    pub fn enrichment_inputs(&self) -> [(TableKind, &Path); 5] {
        [
            (TableKind::Dictionary, self.dictionary.as_path()),
            (TableKind::Rubric, self.rubric.as_path()),
            (TableKind::Counts, self.counts.as_path()),
            (TableKind::Means, self.means.as_path()),
            (TableKind::Irt, self.irt.as_path()),
        ]
    }
}

pub fn find_table_path(data_dir: &Path, kind: TableKind) -> Result<PathBuf, InputError> {
    let stem = kind.stem();
    for name in [format!("{stem}.tsv"), format!("{stem}.tsv.gz")] {
        let path = data_dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(InputError::MissingInput(format!(
        "missing {stem}.tsv or {stem}.tsv.gz in {}",
        data_dir.display()
    )))
}

/// Typed contents of the tables consumed by the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub items: Vec<Item>,
    pub rubric: Vec<RubricLevel>,
    pub counts: Vec<CountFact>,
    pub count_scale: PropScale,
    pub means: Vec<MeanFact>,
    pub irt: Vec<IrtFact>,
}

pub fn load_sources(paths: &SourcePaths) -> Result<SourceTables, InputError> {
    tracing::info!(
        dictionary = %paths.dictionary.display(),
        rubric = %paths.rubric.display(),
        counts = %paths.counts.display(),
        means = %paths.means.display(),
        irt = %paths.irt.display(),
        "loading source tables"
    );

    let items = parse_items(&read_table(&paths.dictionary, TableKind::Dictionary)?)?;
    let rubric = parse_rubric(&read_table(&paths.rubric, TableKind::Rubric)?)?;
    let (counts, count_scale) = parse_counts(&read_table(&paths.counts, TableKind::Counts)?)?;
    let means = parse_means(&read_table(&paths.means, TableKind::Means)?)?;
    let irt = parse_irt(&read_table(&paths.irt, TableKind::Irt)?)?;

    tracing::info!(
        items = items.len(),
        rubric_levels = rubric.len(),
        counts = counts.len(),
        means = means.len(),
        irt = irt.len(),
        scale = ?count_scale,
        "source tables loaded"
    );

    Ok(SourceTables {
        items,
        rubric,
        counts,
        count_scale,
        means,
        irt,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
