use serde::Serialize;

use crate::model::level::ResponseLevel;

/// Column order of the persisted analytic table.
pub const ANALYTIC_COLUMNS: &[&str] = &[
    "item",
    "nivel",
    "grado",
    "servicio",
    "resp",
    "resp_label",
    "prop",
    "eia",
    "eia_clave",
    "campo",
    "proceso",
    "contenido",
    "pda",
    "descriptor",
    "criterio",
    "consigna",
    "inciso",
    "criterio_num",
    "resp_nivel",
    "resp_rubrica",
    "nivel_0",
    "nivel_3",
    "media",
    "dificultad",
    "dificultad_se",
    "dificultad_resp",
];

/// One (item, grade, response level[, stratum]) row of the denormalized table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticRow {
    pub item: String,
    pub nivel: String,
    pub grado: u32,
    pub servicio: Option<String>,
    pub resp: ResponseLevel,
    pub prop: f64,
    pub eia: String,
    pub eia_clave: Option<String>,
    pub campo: String,
    pub proceso: String,
    pub contenido: Option<String>,
    pub pda: Option<String>,
    pub descriptor: String,
    pub criterio: String,
    pub consigna: u32,
    pub inciso: String,
    pub criterio_num: u32,
    pub resp_nivel: String,
    pub resp_rubrica: String,
    pub nivel_0: Option<f64>,
    pub nivel_3: Option<f64>,
    pub media: Option<f64>,
    pub dificultad: Option<f64>,
    pub dificultad_se: Option<f64>,
    /// Level the difficulty was estimated for; `None` for an item-level estimate.
    pub dificultad_resp: Option<ResponseLevel>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticTable {
    pub rows: Vec<AnalyticRow>,
}

impl AnalyticTable {
    pub fn new(rows: Vec<AnalyticRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
