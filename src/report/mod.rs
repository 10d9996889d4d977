pub mod json;
pub mod text;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::input::facts::PropScale;
use crate::model::analytic::AnalyticRow;
use crate::model::level::ResponseLevel;
use crate::pipeline::stage2_enrich::{EnrichOutput, JoinAudit, PIPELINE_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceStat {
    pub nivel: String,
    pub grado: u32,
    pub rows: usize,
    pub items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStat {
    pub resp: ResponseLevel,
    pub label: &'static str,
    pub rows: usize,
    pub mean_prop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryData {
    pub tool: String,
    pub tool_version: String,
    pub pipeline_version: u32,
    pub prop_scale: PropScale,
    pub audit: JoinAudit,
    pub items: usize,
    pub slices: Vec<SliceStat>,
    pub levels: Vec<LevelStat>,
    pub nivel_0_median: f64,
    pub nivel_3_median: f64,
    pub media_median: f64,
    pub dificultad_min: Option<f64>,
    pub dificultad_max: Option<f64>,
}

pub fn build_summary(output: &EnrichOutput) -> SummaryData {
    let rows = &output.table.rows;

    let items: BTreeSet<&str> = rows.iter().map(|r| r.item.as_str()).collect();

    let mut slice_map: BTreeMap<(&str, u32), (usize, BTreeSet<&str>)> = BTreeMap::new();
    for row in rows {
        let entry = slice_map.entry((row.nivel.as_str(), row.grado)).or_default();
        entry.0 += 1;
        entry.1.insert(row.item.as_str());
    }
    let slices = slice_map
        .into_iter()
        .map(|((nivel, grado), (n, items))| SliceStat {
            nivel: nivel.to_string(),
            grado,
            rows: n,
            items: items.len(),
        })
        .collect();

    let levels = ResponseLevel::ALL
        .iter()
        .map(|&level| {
            let props: Vec<f64> = rows
                .iter()
                .filter(|r| r.resp == level)
                .map(|r| r.prop)
                .collect();
            LevelStat {
                resp: level,
                label: level.label(),
                rows: props.len(),
                mean_prop: mean(&props),
            }
        })
        .collect();

    // Group-level columns repeat on every level row; read them once per
    // (item, grade[, stratum]) from the group's first row.
    let mut seen_groups = HashSet::new();
    let group_rows: Vec<&AnalyticRow> = rows
        .iter()
        .filter(|&r| seen_groups.insert((r.item.as_str(), r.grado, r.servicio.as_deref())))
        .collect();
    let nivel_0: Vec<f64> = group_rows.iter().filter_map(|r| r.nivel_0).collect();
    let nivel_3: Vec<f64> = group_rows.iter().filter_map(|r| r.nivel_3).collect();
    let media: Vec<f64> = group_rows.iter().filter_map(|r| r.media).collect();

    let difficulties: Vec<f64> = rows.iter().filter_map(|r| r.dificultad).collect();

    SummaryData {
        tool: env!("CARGO_PKG_NAME").to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        pipeline_version: PIPELINE_VERSION,
        prop_scale: output.scale,
        audit: output.audit.clone(),
        items: items.len(),
        slices,
        levels,
        nivel_0_median: median(&nivel_0),
        nivel_3_median: median(&nivel_3),
        media_median: median(&media),
        dificultad_min: difficulties.iter().copied().reduce(f64::min),
        dificultad_max: difficulties.iter().copied().reduce(f64::max),
    }
}

pub fn format_f64_2(v: f64) -> String {
    format!("{:.2}", v)
}

pub fn quantile_indexed(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let idx = ((n - 1) as f64 * p).ceil() as usize;
    sorted[idx]
}

pub fn median(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.5)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
