use std::path::Path;

use serde::Serialize;

use crate::input::table::read_table;
use crate::input::{InputError, TableKind};

/// One quantile of the ability distribution for a level/grade[/unit] slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonAbility {
    pub nivel: String,
    pub grado: u32,
    pub eia_clave: Option<String>,
    pub cuantil: f64,
    pub puntaje: f64,
}

/// Count of persons in one ability bucket; display-only density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub nivel: String,
    pub grado: u32,
    pub eia_clave: Option<String>,
    pub dificultad: f64,
    pub conteo: u64,
}

pub fn load_persons(path: &Path) -> Result<Vec<PersonAbility>, InputError> {
    let table = read_table(path, TableKind::Persons)?;
    let nivel = table.require("nivel")?;
    let grado = table.require("grado")?;
    let cuantil = table.require("cuantil")?;
    let puntaje = table.require("puntaje")?;
    let eia_clave = table.optional("eia_clave");

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        out.push(PersonAbility {
            nivel: table.key(row, nivel)?,
            grado: table.u32(row, grado)?,
            eia_clave: table.opt_string(row, eia_clave),
            cuantil: table.f64(row, cuantil)?,
            puntaje: table.f64(row, puntaje)?,
        });
    }
    tracing::info!(path = %path.display(), rows = out.len(), "person ability table loaded");
    Ok(out)
}

pub fn load_histogram(path: &Path) -> Result<Vec<HistogramBucket>, InputError> {
    let table = read_table(path, TableKind::PersonHistogram)?;
    let nivel = table.require("nivel")?;
    let grado = table.require("grado")?;
    let dificultad = table.require("dificultad")?;
    let conteo = table.require("conteo")?;
    let eia_clave = table.optional("eia_clave");

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        out.push(HistogramBucket {
            nivel: table.key(row, nivel)?,
            grado: table.u32(row, grado)?,
            eia_clave: table.opt_string(row, eia_clave),
            dificultad: table.f64(row, dificultad)?,
            conteo: table.u64(row, conteo)?,
        });
    }
    tracing::info!(path = %path.display(), rows = out.len(), "person histogram loaded");
    Ok(out)
}
