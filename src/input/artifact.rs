use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::input::cache::{format_hash, hash_file};
use crate::input::facts::PropScale;
use crate::input::table::{RawRow, RawTable, read_table};
use crate::input::{InputError, SourcePaths, TableKind};
use crate::model::analytic::{ANALYTIC_COLUMNS, AnalyticRow, AnalyticTable};
use crate::model::level::ResponseLevel;
use crate::pipeline::stage2_enrich::{EnrichOutput, JoinAudit, PIPELINE_VERSION};

pub const ANALYTIC_FILE: &str = "analytic.tsv";
pub const ANALYTIC_META_FILE: &str = "analytic.meta.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHash {
    pub table: String,
    pub path: String,
    pub fnv64: String,
}

/// Identifies the inputs an analytic artifact was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub pipeline_version: u32,
    pub sources: Vec<SourceHash>,
}

impl Fingerprint {
    pub fn compute(paths: &SourcePaths) -> Result<Self, InputError> {
        let mut sources = Vec::new();
        for (kind, path) in paths.enrichment_inputs() {
            sources.push(SourceHash {
                table: kind.stem().to_string(),
                path: path.display().to_string(),
                fnv64: format_hash(hash_file(path)?),
            });
        }
        Ok(Self {
            pipeline_version: PIPELINE_VERSION,
            sources,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub tool: String,
    pub tool_version: String,
    pub fingerprint: Fingerprint,
    pub scale: PropScale,
    pub audit: JoinAudit,
}

pub fn analytic_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(ANALYTIC_FILE), dir.join(ANALYTIC_META_FILE))
}

pub fn write_artifact(
    dir: &Path,
    output: &EnrichOutput,
    fingerprint: &Fingerprint,
) -> Result<(), InputError> {
    fs::create_dir_all(dir)?;
    let (table_path, meta_path) = analytic_paths(dir);

    let mut w = BufWriter::new(File::create(&table_path)?);
    write_analytic_rows(&mut w, &output.table.rows)?;
    w.flush()?;

    let meta = ArtifactMeta {
        tool: env!("CARGO_PKG_NAME").to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        fingerprint: fingerprint.clone(),
        scale: output.scale,
        audit: output.audit.clone(),
    };
    fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;

    tracing::info!(path = %table_path.display(), rows = output.table.len(), "analytic table written");
    Ok(())
}

/// Reads a previously written artifact if its fingerprint matches; `None` means rebuild.
pub fn read_artifact(
    dir: &Path,
    fingerprint: &Fingerprint,
) -> Result<Option<EnrichOutput>, InputError> {
    let (table_path, meta_path) = analytic_paths(dir);
    if !table_path.exists() || !meta_path.exists() {
        return Ok(None);
    }
    let meta: ArtifactMeta = match serde_json::from_str(&fs::read_to_string(&meta_path)?) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::warn!(path = %meta_path.display(), error = %err, "unreadable artifact metadata; rebuilding");
            return Ok(None);
        }
    };
    if &meta.fingerprint != fingerprint {
        tracing::info!(path = %meta_path.display(), "source tables changed since the artifact was built");
        return Ok(None);
    }

    let table = read_analytic_table(&table_path)?;
    tracing::info!(path = %table_path.display(), rows = table.len(), "reusing analytic table");
    Ok(Some(EnrichOutput {
        table,
        audit: meta.audit,
        scale: meta.scale,
    }))
}

pub fn write_analytic_rows<W: Write>(w: &mut W, rows: &[AnalyticRow]) -> std::io::Result<()> {
    writeln!(w, "{}", ANALYTIC_COLUMNS.join("\t"))?;
    for row in rows {
        let fields = [
            clean(&row.item),
            clean(&row.nivel),
            row.grado.to_string(),
            opt_text(&row.servicio),
            row.resp.code().to_string(),
            row.resp.label().to_string(),
            row.prop.to_string(),
            clean(&row.eia),
            opt_text(&row.eia_clave),
            clean(&row.campo),
            clean(&row.proceso),
            opt_text(&row.contenido),
            opt_text(&row.pda),
            clean(&row.descriptor),
            clean(&row.criterio),
            row.consigna.to_string(),
            clean(&row.inciso),
            row.criterio_num.to_string(),
            clean(&row.resp_nivel),
            clean(&row.resp_rubrica),
            opt_num(row.nivel_0),
            opt_num(row.nivel_3),
            opt_num(row.media),
            opt_num(row.dificultad),
            opt_num(row.dificultad_se),
            row.dificultad_resp
                .map(|level| level.code().to_string())
                .unwrap_or_default(),
        ];
        writeln!(w, "{}", fields.join("\t"))?;
    }
    Ok(())
}

pub fn read_analytic_table(path: &Path) -> Result<AnalyticTable, InputError> {
    let table = read_table(path, TableKind::Analytic)?;
    let mut idx = [0usize; 26];
    for (slot, name) in idx.iter_mut().zip(ANALYTIC_COLUMNS) {
        *slot = table.require(name)?;
    }
    let mut rows = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        rows.push(parse_analytic_row(&table, row, &idx)?);
    }
    Ok(AnalyticTable::new(rows))
}

fn parse_analytic_row(
    table: &RawTable,
    row: &RawRow,
    idx: &[usize; 26],
) -> Result<AnalyticRow, InputError> {
    let level = |raw: &str| {
        ResponseLevel::parse(raw).ok_or_else(|| InputError::InvalidLevel {
            table: TableKind::Analytic,
            line: row.line,
            value: raw.to_string(),
        })
    };
    let resp = level(table.text(row, idx[4]))?;
    let dificultad_resp = table
        .opt_string(row, Some(idx[25]))
        .map(|raw| level(&raw))
        .transpose()?;
    Ok(AnalyticRow {
        item: table.key(row, idx[0])?,
        nivel: table.string(row, idx[1]),
        grado: table.u32(row, idx[2])?,
        servicio: table.opt_string(row, Some(idx[3])),
        resp,
        prop: table.f64(row, idx[6])?,
        eia: table.string(row, idx[7]),
        eia_clave: table.opt_string(row, Some(idx[8])),
        campo: table.string(row, idx[9]),
        proceso: table.string(row, idx[10]),
        contenido: table.opt_string(row, Some(idx[11])),
        pda: table.opt_string(row, Some(idx[12])),
        descriptor: table.string(row, idx[13]),
        criterio: table.string(row, idx[14]),
        consigna: table.u32(row, idx[15])?,
        inciso: table.string(row, idx[16]),
        criterio_num: table.u32(row, idx[17])?,
        resp_nivel: table.string(row, idx[18]),
        resp_rubrica: table.string(row, idx[19]),
        nivel_0: table.opt_f64(row, Some(idx[20]))?,
        nivel_3: table.opt_f64(row, Some(idx[21]))?,
        media: table.opt_f64(row, Some(idx[22]))?,
        dificultad: table.opt_f64(row, Some(idx[23]))?,
        dificultad_se: table.opt_f64(row, Some(idx[24]))?,
        dificultad_resp,
    })
}

/// Tabs and line breaks inside free text would break the row layout.
fn clean(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn opt_text(value: &Option<String>) -> String {
    value.as_deref().map(clean).unwrap_or_default()
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/artifact.rs"]
mod tests;
