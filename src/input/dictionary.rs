use crate::input::InputError;
use crate::input::table::RawTable;

/// Dictionary columns that would collide with the fact tables' own level/grade;
/// the fact table's value is authoritative.
pub const DROPPED_DICTIONARY_COLUMNS: &[&str] = &["fase", "nivel", "grado"];

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub item: String,
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct RubricLevel {
    pub item: String,
    /// Raw level code; cast to the ordered level type only after the joins.
    pub resp: String,
    pub resp_nivel: String,
    pub resp_rubrica: String,
}

pub fn parse_items(table: &RawTable) -> Result<Vec<Item>, InputError> {
    let item = table.require("item")?;
    let eia = table.require("eia")?;
    let campo = table.require("campo")?;
    let proceso = table.require("proceso")?;
    let descriptor = table.require("descriptor")?;
    let criterio = table.require("criterio")?;
    let consigna = table.require("consigna")?;
    let inciso = table.require("inciso")?;
    let criterio_num = table.require("criterio_num")?;
    let eia_clave = table.optional("eia_clave");
    let contenido = table.optional("contenido");
    let pda = table.optional("pda");

    let dropped: Vec<&str> = DROPPED_DICTIONARY_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.optional(c).is_some())
        .collect();
    if !dropped.is_empty() {
        tracing::debug!(columns = ?dropped, "dropping dictionary columns owned by the fact tables");
    }

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        out.push(Item {
            item: table.key(row, item)?,
            eia: table.string(row, eia),
            eia_clave: table.opt_string(row, eia_clave),
            campo: table.string(row, campo),
            proceso: table.string(row, proceso),
            contenido: table.opt_string(row, contenido),
            pda: table.opt_string(row, pda),
            descriptor: table.string(row, descriptor),
            criterio: table.string(row, criterio),
            consigna: table.u32(row, consigna)?,
            inciso: table.string(row, inciso),
            criterio_num: table.u32(row, criterio_num)?,
        });
    }
    Ok(out)
}

pub fn parse_rubric(table: &RawTable) -> Result<Vec<RubricLevel>, InputError> {
    let item = table.require("item")?;
    let resp = table.require("resp")?;
    let resp_nivel = table.require("resp_nivel")?;
    let resp_rubrica = table.require("resp_rubrica")?;

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        out.push(RubricLevel {
            item: table.key(row, item)?,
            resp: table.key(row, resp)?,
            resp_nivel: table.string(row, resp_nivel),
            resp_rubrica: table.string(row, resp_rubrica),
        });
    }
    Ok(out)
}
