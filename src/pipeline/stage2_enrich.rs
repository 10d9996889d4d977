use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::input::dictionary::{Item, RubricLevel};
use crate::input::facts::{CountFact, IrtFact, PropScale};
use crate::input::{InputError, SourceTables, TableKind};
use crate::model::analytic::{AnalyticRow, AnalyticTable};
use crate::model::level::ResponseLevel;

/// Bumped whenever the shape or meaning of the analytic table changes.
pub const PIPELINE_VERSION: u32 = 2;

/// Allowed distance of a complete level distribution from 100 percent.
pub const COVERAGE_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinAudit {
    pub count_rows: usize,
    pub dropped_by_dictionary: usize,
    pub dropped_by_rubric: usize,
    pub output_rows: usize,
    pub null_media: usize,
    pub null_dificultad: usize,
    pub complete_groups: usize,
    pub coverage_violations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichOutput {
    pub table: AnalyticTable,
    pub audit: JoinAudit,
    pub scale: PropScale,
}

type GroupKey<'a> = (&'a str, u32, Option<&'a str>);

struct Joined<'a> {
    count: &'a CountFact,
    item: &'a Item,
    rubric: &'a RubricLevel,
    level: ResponseLevel,
}

pub fn run_enrichment(sources: &SourceTables) -> Result<EnrichOutput, InputError> {
    let mut audit = JoinAudit {
        count_rows: sources.counts.len(),
        ..JoinAudit::default()
    };

    let items = index_first(&sources.items, TableKind::Dictionary, |i| i.item.as_str());
    let rubric = index_first(&sources.rubric, TableKind::Rubric, |r| {
        (r.item.as_str(), r.resp.as_str())
    });

    let mut joined = Vec::with_capacity(sources.counts.len());
    for count in &sources.counts {
        let Some(&item) = items.get(count.item.as_str()) else {
            audit.dropped_by_dictionary += 1;
            continue;
        };
        let Some(&rubric_level) = rubric.get(&(count.item.as_str(), count.resp.as_str())) else {
            audit.dropped_by_rubric += 1;
            continue;
        };
        let level = ResponseLevel::parse(&count.resp).ok_or_else(|| InputError::InvalidLevel {
            table: TableKind::Counts,
            line: count.line,
            value: count.resp.clone(),
        })?;
        joined.push(Joined {
            count,
            item,
            rubric: rubric_level,
            level,
        });
    }

    if audit.dropped_by_dictionary > 0 || audit.dropped_by_rubric > 0 {
        tracing::info!(
            dropped_by_dictionary = audit.dropped_by_dictionary,
            dropped_by_rubric = audit.dropped_by_rubric,
            "count rows without dictionary or rubric entries were dropped"
        );
    }

    let extremes = extreme_levels(&joined);
    let (complete, violations) = coverage_audit(&joined);
    audit.complete_groups = complete;
    audit.coverage_violations = violations;

    let means = index_first(&sources.means, TableKind::Means, |m| {
        (m.item.as_str(), m.grado)
    });
    let irt = index_first(&sources.irt, TableKind::Irt, |f| {
        (f.item.as_str(), f.grado, f.resp.as_deref())
    });

    let mut rows = Vec::with_capacity(joined.len());
    for j in &joined {
        let count = j.count;
        let key: GroupKey<'_> = (
            count.item.as_str(),
            count.grado,
            count.servicio.as_deref(),
        );
        let (nivel_0, nivel_3) = extremes.get(&key).copied().unwrap_or((None, None));
        let media = means.get(&(count.item.as_str(), count.grado)).map(|m| m.media);
        let irt_fact = lookup_irt(&irt, &count.item, count.grado, j.level);
        if media.is_none() {
            audit.null_media += 1;
        }
        if irt_fact.is_none() {
            audit.null_dificultad += 1;
        }

        rows.push(AnalyticRow {
            item: count.item.clone(),
            nivel: count.nivel.clone(),
            grado: count.grado,
            servicio: count.servicio.clone(),
            resp: j.level,
            prop: count.prop,
            eia: j.item.eia.clone(),
            eia_clave: j.item.eia_clave.clone(),
            campo: j.item.campo.clone(),
            proceso: j.item.proceso.clone(),
            contenido: j.item.contenido.clone(),
            pda: j.item.pda.clone(),
            descriptor: j.item.descriptor.clone(),
            criterio: j.item.criterio.clone(),
            consigna: j.item.consigna,
            inciso: j.item.inciso.clone(),
            criterio_num: j.item.criterio_num,
            resp_nivel: j.rubric.resp_nivel.clone(),
            resp_rubrica: j.rubric.resp_rubrica.clone(),
            nivel_0,
            nivel_3,
            media,
            dificultad: irt_fact.map(|f| f.dificultad),
            dificultad_se: irt_fact.and_then(|f| f.dificultad_se),
            dificultad_resp: irt_fact.and_then(|f| f.resp.as_ref()).map(|_| j.level),
        });
    }
    audit.output_rows = rows.len();

    tracing::info!(
        count_rows = audit.count_rows,
        output_rows = audit.output_rows,
        null_media = audit.null_media,
        null_dificultad = audit.null_dificultad,
        "enrichment finished"
    );

    Ok(EnrichOutput {
        table: AnalyticTable::new(rows),
        audit,
        scale: sources.count_scale,
    })
}

/// Builds a lookup keeping the first row per key.
fn index_first<'a, T, K, F>(rows: &'a [T], kind: TableKind, key: F) -> HashMap<K, &'a T>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
    F: Fn(&'a T) -> K,
{
    let mut map = HashMap::with_capacity(rows.len());
    let mut duplicates = 0usize;
    for row in rows {
        match map.entry(key(row)) {
            Entry::Occupied(entry) => {
                duplicates += 1;
                tracing::debug!(table = %kind, key = ?entry.key(), "duplicate key; keeping first");
            }
            Entry::Vacant(entry) => {
                entry.insert(row);
            }
        }
    }
    if duplicates > 0 {
        tracing::warn!(table = %kind, duplicates, "duplicate join keys; keeping first occurrence");
    }
    map
}

/// Proportion at the lowest and highest level for every (item, grade[, stratum]).
fn extreme_levels<'a>(joined: &[Joined<'a>]) -> HashMap<GroupKey<'a>, (Option<f64>, Option<f64>)> {
    let mut out: HashMap<GroupKey<'a>, (Option<f64>, Option<f64>)> = HashMap::new();
    for j in joined {
        let key = (
            j.count.item.as_str(),
            j.count.grado,
            j.count.servicio.as_deref(),
        );
        if j.level == ResponseLevel::LOWEST {
            let slot = &mut out.entry(key).or_default().0;
            slot.get_or_insert(j.count.prop);
        } else if j.level == ResponseLevel::HIGHEST {
            let slot = &mut out.entry(key).or_default().1;
            slot.get_or_insert(j.count.prop);
        }
    }
    out
}

/// Counts groups holding all four levels and those whose proportions do not sum to 100.
fn coverage_audit(joined: &[Joined<'_>]) -> (usize, usize) {
    let mut groups: HashMap<GroupKey<'_>, (u8, f64)> = HashMap::new();
    for j in joined {
        let key = (
            j.count.item.as_str(),
            j.count.grado,
            j.count.servicio.as_deref(),
        );
        let entry = groups.entry(key).or_insert((0, 0.0));
        entry.0 |= 1 << j.level.index();
        entry.1 += j.count.prop;
    }

    let mut complete = 0usize;
    let mut violations = 0usize;
    for ((item, grado, servicio), (mask, sum)) in &groups {
        if *mask != 0b1111 {
            continue;
        }
        complete += 1;
        if (sum - 100.0).abs() > COVERAGE_TOLERANCE {
            violations += 1;
            tracing::warn!(
                item = *item,
                grado = *grado,
                servicio = servicio.unwrap_or(""),
                sum = *sum,
                "response level proportions do not sum to 100"
            );
        }
    }
    (complete, violations)
}

/// A level-specific estimate wins over an item-level one.
fn lookup_irt<'k, 'a>(
    irt: &HashMap<(&'k str, u32, Option<&'k str>), &'a IrtFact>,
    item: &'k str,
    grado: u32,
    level: ResponseLevel,
) -> Option<&'a IrtFact> {
    irt.get(&(item, grado, Some(level.code())))
        .or_else(|| irt.get(&(item, grado, None)))
        .copied()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_enrich.rs"]
mod tests;
