use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::analytic::{AnalyticRow, AnalyticTable};
use crate::model::facets::FacetSelection;
use crate::model::order::{cmp_field, cmp_nullable, cmp_process};

/// Named row orderings offered to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Process, statement number, sub-part, item id.
    Natural,
    /// Process, item id.
    Process,
    /// Formative field, item id.
    Field,
    /// Lowest-level proportion ascending, item id.
    Lowest,
    /// Highest-level proportion ascending, item id.
    Highest,
    /// IRT difficulty ascending, item id.
    Difficulty,
    /// Process, IRT difficulty ascending, item id.
    #[value(name = "process_difficulty")]
    ProcessDifficulty,
    /// Item mean score ascending, item id.
    Mean,
}

impl SortMode {
    pub fn name(self) -> &'static str {
        match self {
            SortMode::Natural => "natural",
            SortMode::Process => "process",
            SortMode::Field => "field",
            SortMode::Lowest => "lowest",
            SortMode::Highest => "highest",
            SortMode::Difficulty => "difficulty",
            SortMode::ProcessDifficulty => "process_difficulty",
            SortMode::Mean => "mean",
        }
    }

    pub fn compare(self, a: &AnalyticRow, b: &AnalyticRow) -> Ordering {
        let by_item = || a.item.cmp(&b.item);
        match self {
            SortMode::Natural => cmp_process(&a.proceso, &b.proceso)
                .then_with(|| a.consigna.cmp(&b.consigna))
                .then_with(|| a.inciso.cmp(&b.inciso))
                .then_with(by_item),
            SortMode::Process => cmp_process(&a.proceso, &b.proceso).then_with(by_item),
            SortMode::Field => cmp_field(&a.campo, &b.campo).then_with(by_item),
            SortMode::Lowest => cmp_nullable(a.nivel_0, b.nivel_0).then_with(by_item),
            SortMode::Highest => cmp_nullable(a.nivel_3, b.nivel_3).then_with(by_item),
            SortMode::Difficulty => cmp_nullable(a.dificultad, b.dificultad).then_with(by_item),
            SortMode::ProcessDifficulty => cmp_process(&a.proceso, &b.proceso)
                .then_with(|| cmp_nullable(a.dificultad, b.dificultad))
                .then_with(by_item),
            SortMode::Mean => cmp_nullable(a.media, b.media).then_with(by_item),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rows passing every facet constraint, in `sort` order; the input is untouched.
pub fn run_query(
    table: &AnalyticTable,
    selection: &FacetSelection,
    sort: SortMode,
) -> AnalyticTable {
    let mut rows = filter_rows(table, selection);
    sort_rows(&mut rows, sort);
    if rows.is_empty() {
        tracing::warn!(sort = %sort, "no rows match the facet selection");
    } else {
        tracing::info!(rows = rows.len(), of = table.len(), sort = %sort, "query finished");
    }
    AnalyticTable::new(rows)
}

pub fn filter_rows(table: &AnalyticTable, selection: &FacetSelection) -> Vec<AnalyticRow> {
    table
        .rows
        .iter()
        .filter(|row| selection.matches(row))
        .cloned()
        .collect()
}

/// Stable, so rows with equal keys keep the pipeline's output order.
pub fn sort_rows(rows: &mut [AnalyticRow], sort: SortMode) {
    rows.sort_by(|a, b| sort.compare(a, b));
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_query.rs"]
mod tests;
