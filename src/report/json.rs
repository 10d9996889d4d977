use serde::Serialize;

use crate::model::facets::FacetSelection;
use crate::pipeline::stage3_query::SortMode;
use crate::pipeline::stage4_cutscore::CutScoreReport;
use crate::report::SummaryData;

pub fn render_summary_json(data: &SummaryData) -> serde_json::Result<String> {
    serde_json::to_string_pretty(data)
}

#[derive(Debug, Serialize)]
struct FacetsDocument<'a> {
    sort: SortMode,
    rows: usize,
    #[serde(flatten)]
    selection: &'a FacetSelection,
}

/// Available and chosen values per facet, for populating selection widgets.
pub fn render_facets_json(
    selection: &FacetSelection,
    sort: SortMode,
    rows: usize,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&FacetsDocument {
        sort,
        rows,
        selection,
    })
}

pub fn render_cutscore_json(report: &CutScoreReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
