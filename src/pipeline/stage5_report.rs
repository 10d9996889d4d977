use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::input::artifact::write_analytic_rows;
use crate::model::analytic::AnalyticTable;
use crate::model::facets::FacetSelection;
use crate::pipeline::PipelineError;
use crate::pipeline::stage2_enrich::EnrichOutput;
use crate::pipeline::stage3_query::SortMode;
use crate::pipeline::stage4_cutscore::CutScoreReport;
use crate::report::build_summary;
use crate::report::json::{render_cutscore_json, render_facets_json, render_summary_json};
use crate::report::text::render_report_text;

pub const SUMMARY_FILE: &str = "summary.json";
pub const REPORT_FILE: &str = "report.txt";
pub const QUERY_FILE: &str = "query.tsv";
pub const FACETS_FILE: &str = "facets.json";
pub const CUTSCORE_FILE: &str = "cutscore.json";

pub fn write_enrich_reports(out_dir: &Path, output: &EnrichOutput) -> Result<(), PipelineError> {
    fs::create_dir_all(out_dir)?;

    let summary = build_summary(output);
    write_text(&out_dir.join(SUMMARY_FILE), &render_summary_json(&summary)?)?;
    write_text(&out_dir.join(REPORT_FILE), &render_report_text(&summary))?;

    tracing::info!(out = %out_dir.display(), rows = output.table.len(), "enrichment reports written");
    Ok(())
}

pub fn write_query_outputs(
    out_dir: &Path,
    result: &AnalyticTable,
    selection: &FacetSelection,
    sort: SortMode,
) -> Result<(), PipelineError> {
    fs::create_dir_all(out_dir)?;

    let mut w = BufWriter::new(File::create(out_dir.join(QUERY_FILE))?);
    write_analytic_rows(&mut w, &result.rows)?;
    w.flush()?;

    let facets = render_facets_json(selection, sort, result.len())?;
    write_text(&out_dir.join(FACETS_FILE), &facets)?;
    Ok(())
}

pub fn write_cutscore(out_dir: &Path, report: &CutScoreReport) -> Result<(), PipelineError> {
    fs::create_dir_all(out_dir)?;
    write_text(&out_dir.join(CUTSCORE_FILE), &render_cutscore_json(report)?)?;
    Ok(())
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_report.rs"]
mod tests;
