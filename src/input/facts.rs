use serde::{Deserialize, Serialize};

use crate::input::InputError;
use crate::input::table::RawTable;
use crate::model::level::ResponseLevel;

#[derive(Debug, Clone, PartialEq)]
pub struct CountFact {
    pub line: usize,
    pub item: String,
    pub nivel: String,
    pub grado: u32,
    pub resp: String,
    /// Always on the percent scale once parsed.
    pub prop: f64,
    pub servicio: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeanFact {
    pub item: String,
    pub grado: u32,
    pub media: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrtFact {
    pub item: String,
    pub grado: u32,
    /// `None` for item-level estimates that apply to every response level.
    pub resp: Option<String>,
    pub dificultad: f64,
    pub dificultad_se: Option<f64>,
}

/// Scale the count table stores proportions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropScale {
    Percent,
    Fraction,
}

impl PropScale {
    pub fn detect(values: impl IntoIterator<Item = f64>) -> Self {
        let mut any = false;
        for v in values {
            any = true;
            if v > 1.0 {
                return PropScale::Percent;
            }
        }
        if any {
            PropScale::Fraction
        } else {
            PropScale::Percent
        }
    }

    pub fn to_percent(self, v: f64) -> f64 {
        match self {
            PropScale::Percent => v,
            PropScale::Fraction => v * 100.0,
        }
    }
}

pub fn parse_counts(table: &RawTable) -> Result<(Vec<CountFact>, PropScale), InputError> {
    let item = table.require("item")?;
    let nivel = table.require("nivel")?;
    let grado = table.require("grado")?;
    let resp = table.require("resp")?;
    let prop = table.require("prop")?;
    let servicio = table.optional("servicio");

    let mut raw_props = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let value = table.f64(row, prop)?;
        if !(0.0..=100.0).contains(&value) {
            return Err(table.invalid(row, prop, "proportion must lie in [0, 100]"));
        }
        raw_props.push(value);
    }
    let scale = PropScale::detect(raw_props.iter().copied());
    if scale == PropScale::Fraction {
        tracing::warn!(
            table = %table.kind,
            path = %table.path.display(),
            rows = raw_props.len(),
            "every proportion is <= 1; reading the count table as fractions and scaling by 100"
        );
    }

    let mut out = Vec::with_capacity(table.rows.len());
    for (row, raw) in table.rows.iter().zip(raw_props) {
        out.push(CountFact {
            line: row.line,
            item: table.key(row, item)?,
            nivel: table.key(row, nivel)?,
            grado: table.u32(row, grado)?,
            resp: table.key(row, resp)?,
            prop: scale.to_percent(raw),
            servicio: table.opt_string(row, servicio),
        });
    }
    Ok((out, scale))
}

pub fn parse_means(table: &RawTable) -> Result<Vec<MeanFact>, InputError> {
    let item = table.require("item")?;
    let grado = table.require("grado")?;
    let media = table.require("media")?;
    let max_mean = ResponseLevel::HIGHEST.index() as f64;

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let value = table.f64(row, media)?;
        if !(0.0..=max_mean).contains(&value) {
            return Err(table.invalid(row, media, "mean must lie between N0 and N3 (0 to 3)"));
        }
        out.push(MeanFact {
            item: table.key(row, item)?,
            grado: table.u32(row, grado)?,
            media: value,
        });
    }
    Ok(out)
}

pub fn parse_irt(table: &RawTable) -> Result<Vec<IrtFact>, InputError> {
    let item = table.require("item")?;
    let grado = table.require("grado")?;
    let dificultad = table.require("dificultad")?;
    let resp = table.optional("resp");
    let dificultad_se = table.optional("dificultad_se");

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        out.push(IrtFact {
            item: table.key(row, item)?,
            grado: table.u32(row, grado)?,
            resp: table.opt_string(row, resp),
            dificultad: table.f64(row, dificultad)?,
            dificultad_se: table.opt_f64(row, dificultad_se)?,
        });
    }
    Ok(out)
}
