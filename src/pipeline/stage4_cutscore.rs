use std::collections::HashSet;

use serde::Serialize;

use crate::input::persons::{HistogramBucket, PersonAbility};
use crate::model::analytic::AnalyticRow;
use crate::model::level::ResponseLevel;

/// Population slice a person-ability table is read for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonSlice {
    pub nivel: String,
    pub grado: u32,
    /// `None` leaves the unit unrestricted.
    pub eia_clave: Option<String>,
}

impl PersonSlice {
    fn contains(&self, nivel: &str, grado: u32, eia_clave: Option<&str>) -> bool {
        self.nivel == nivel
            && self.grado == grado
            && match self.eia_clave.as_deref() {
                Some(unit) => eia_clave == Some(unit),
                None => true,
            }
    }
}

/// Empirical-CDF lookup result for a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CutScore {
    /// Greatest quantile among persons scoring at or below the threshold.
    Resolved { quantile: f64, score: f64 },
    /// Threshold lies below every observed ability.
    BelowRange,
}

impl CutScore {
    pub fn quantile_or_zero(&self) -> f64 {
        match self {
            CutScore::Resolved { quantile, .. } => *quantile,
            CutScore::BelowRange => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Above,
    Below,
}

/// One IRT estimate in the above/below table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionedItem {
    pub item: String,
    /// Level the estimate belongs to; `None` for an item-level estimate.
    pub resp: Option<ResponseLevel>,
    pub dificultad: f64,
    pub posicion: Position,
    pub criterio: String,
    pub proceso: String,
    pub campo: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DifficultyPartition {
    pub above: Vec<PartitionedItem>,
    pub below: Vec<PartitionedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutScoreReport {
    pub slice: PersonSlice,
    pub threshold: f64,
    pub threshold_options: Vec<f64>,
    pub persons_in_slice: usize,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub cut: CutScore,
    pub quantile: f64,
    pub partition: DifficultyPartition,
    pub histogram: Vec<HistogramBucket>,
}

/// Persons of `slice`, ascending by score.
pub fn select_persons(persons: &[PersonAbility], slice: &PersonSlice) -> Vec<PersonAbility> {
    let mut out: Vec<PersonAbility> = persons
        .iter()
        .filter(|p| slice.contains(&p.nivel, p.grado, p.eia_clave.as_deref()))
        .cloned()
        .collect();
    out.sort_by(|a, b| a.puntaje.total_cmp(&b.puntaje));
    out
}

pub fn resolve_quantile(persons: &[PersonAbility], threshold: f64) -> CutScore {
    let mut best: Option<&PersonAbility> = None;
    for person in persons.iter().filter(|p| p.puntaje <= threshold) {
        best = match best {
            Some(current) if current.cuantil >= person.cuantil => Some(current),
            _ => Some(person),
        };
    }
    match best {
        Some(person) => CutScore::Resolved {
            quantile: person.cuantil,
            score: person.puntaje,
        },
        None => CutScore::BelowRange,
    }
}

/// Difficulty at or above the threshold counts as above.
///
/// Analytic rows repeat an estimate once per stratum, and an item-level
/// estimate once per response level; each estimate is listed once.
pub fn partition_difficulties(rows: &[AnalyticRow], threshold: f64) -> DifficultyPartition {
    let mut seen = HashSet::new();
    let mut ranked: Vec<(&AnalyticRow, f64)> = rows
        .iter()
        .filter_map(|row| row.dificultad.map(|d| (row, d)))
        .filter(|&(row, d)| {
            seen.insert((row.item.as_str(), row.grado, row.dificultad_resp, d.to_bits()))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut out = DifficultyPartition::default();
    for (row, dificultad) in ranked {
        let posicion = if dificultad >= threshold {
            Position::Above
        } else {
            Position::Below
        };
        let entry = PartitionedItem {
            item: row.item.clone(),
            resp: row.dificultad_resp,
            dificultad,
            posicion,
            criterio: row.criterio.clone(),
            proceso: row.proceso.clone(),
            campo: row.campo.clone(),
            descriptor: row.descriptor.clone(),
        };
        match posicion {
            Position::Above => out.above.push(entry),
            Position::Below => out.below.push(entry),
        }
    }
    out
}

/// Distinct observed difficulties rounded to two decimals, ascending.
pub fn threshold_options(rows: &[AnalyticRow]) -> Vec<f64> {
    let mut options: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.dificultad)
        .map(round2)
        .collect();
    options.sort_by(f64::total_cmp);
    options.dedup();
    options
}

/// Buckets of `slice` strictly inside the open score range `(min, max)`.
pub fn histogram_window(
    buckets: &[HistogramBucket],
    slice: &PersonSlice,
    min_score: f64,
    max_score: f64,
) -> Vec<HistogramBucket> {
    buckets
        .iter()
        .filter(|b| slice.contains(&b.nivel, b.grado, b.eia_clave.as_deref()))
        .filter(|b| b.dificultad > min_score && b.dificultad < max_score)
        .cloned()
        .collect()
}

pub fn run_cutscore(
    rows: &[AnalyticRow],
    persons: &[PersonAbility],
    buckets: &[HistogramBucket],
    slice: PersonSlice,
    threshold: f64,
) -> CutScoreReport {
    let slice_persons = select_persons(persons, &slice);
    let min_score = slice_persons.first().map(|p| p.puntaje);
    let max_score = slice_persons.last().map(|p| p.puntaje);

    let slice_rows: Vec<AnalyticRow> = rows
        .iter()
        .filter(|row| slice.contains(&row.nivel, row.grado, row.eia_clave.as_deref()))
        .cloned()
        .collect();
    let options = threshold_options(&slice_rows);
    if !options.is_empty() && !options.contains(&round2(threshold)) {
        tracing::warn!(threshold, "threshold is not one of the observed item difficulties");
    }

    let cut = resolve_quantile(&slice_persons, threshold);
    match cut {
        CutScore::Resolved { quantile, score } => {
            tracing::info!(threshold, quantile, score, "cut score resolved");
        }
        CutScore::BelowRange => {
            tracing::warn!(threshold, min_score = ?min_score, "threshold lies below every observed ability");
        }
    }

    let histogram = match (min_score, max_score) {
        (Some(min), Some(max)) => histogram_window(buckets, &slice, min, max),
        _ => Vec::new(),
    };

    CutScoreReport {
        threshold,
        threshold_options: options,
        persons_in_slice: slice_persons.len(),
        min_score,
        max_score,
        quantile: cut.quantile_or_zero(),
        cut,
        partition: partition_difficulties(&slice_rows, threshold),
        histogram,
        slice,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_cutscore.rs"]
mod tests;
