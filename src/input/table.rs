use std::path::{Path, PathBuf};

use crate::input::cache::open_maybe_gz;
use crate::input::{InputError, TableKind};

const NULL_TOKENS: &[&str] = &["", "NA", "NaN", "nan", "null", "None"];

#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source file, header included.
    pub line: usize,
    pub fields: Vec<String>,
}

/// A tab-separated table held as text, with the header used for column lookup.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub kind: TableKind,
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub fn read_table(path: &Path, kind: TableKind) -> Result<RawTable, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();

    let read = reader.read_line(&mut buf)?;
    if read == 0 {
        return Err(InputError::Parse(format!(
            "{kind}: {} is empty",
            path.display()
        )));
    }
    let header = buf.trim_end_matches(['\r', '\n']).trim_start_matches('\u{feff}');
    let columns: Vec<String> = header.split('\t').map(|s| s.trim().to_string()).collect();

    let mut rows = Vec::new();
    let mut line_no = 1usize;
    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split('\t').map(|s| s.trim().to_string()).collect();
        if fields.len() > columns.len() {
            tracing::warn!(
                table = %kind,
                line = line_no,
                fields = fields.len(),
                columns = columns.len(),
                "row has more fields than the header; extra fields ignored"
            );
        }
        rows.push(RawRow {
            line: line_no,
            fields,
        });
    }

    tracing::debug!(table = %kind, path = %path.display(), rows = rows.len(), "read table");

    Ok(RawTable {
        kind,
        path: path.to_path_buf(),
        columns,
        rows,
    })
}

impl RawTable {
    pub fn require(&self, name: &str) -> Result<usize, InputError> {
        self.optional(name).ok_or_else(|| InputError::MissingColumn {
            table: self.kind,
            column: name.to_string(),
        })
    }

    pub fn optional(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn text<'a>(&self, row: &'a RawRow, idx: usize) -> &'a str {
        row.fields.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn string(&self, row: &RawRow, idx: usize) -> String {
        self.text(row, idx).to_string()
    }

    pub fn opt_string(&self, row: &RawRow, idx: Option<usize>) -> Option<String> {
        let value = self.text(row, idx?);
        if is_null(value) {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Like `string`, but a null token is a schema error.
    pub fn key(&self, row: &RawRow, idx: usize) -> Result<String, InputError> {
        let value = self.text(row, idx);
        if is_null(value) {
            return Err(self.invalid(row, idx, "key column must not be empty"));
        }
        Ok(value.to_string())
    }

    pub fn f64(&self, row: &RawRow, idx: usize) -> Result<f64, InputError> {
        self.opt_f64(row, Some(idx))?
            .ok_or_else(|| self.invalid(row, idx, "expected a number"))
    }

    pub fn opt_f64(&self, row: &RawRow, idx: Option<usize>) -> Result<Option<f64>, InputError> {
        let Some(idx) = idx else {
            return Ok(None);
        };
        let value = self.text(row, idx);
        if is_null(value) {
            return Ok(None);
        }
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            Ok(_) => Err(self.invalid(row, idx, "expected a finite number")),
            Err(_) => Err(self.invalid(row, idx, "expected a number")),
        }
    }

    /// Whole numbers are accepted in integer (`3`) or float (`3.0`) spelling.
    pub fn u32(&self, row: &RawRow, idx: usize) -> Result<u32, InputError> {
        let value = self.text(row, idx);
        if let Ok(v) = value.parse::<u32>() {
            return Ok(v);
        }
        match value.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
            _ => Err(self.invalid(row, idx, "expected a non-negative whole number")),
        }
    }

    pub fn u64(&self, row: &RawRow, idx: usize) -> Result<u64, InputError> {
        let value = self.text(row, idx);
        if let Ok(v) = value.parse::<u64>() {
            return Ok(v);
        }
        match value.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
            _ => Err(self.invalid(row, idx, "expected a non-negative whole number")),
        }
    }

    pub fn invalid(&self, row: &RawRow, idx: usize, reason: &str) -> InputError {
        InputError::InvalidValue {
            table: self.kind,
            line: row.line,
            column: self.columns.get(idx).cloned().unwrap_or_default(),
            value: self.text(row, idx).to_string(),
            reason: reason.to_string(),
        }
    }
}

pub fn is_null(value: &str) -> bool {
    NULL_TOKENS.contains(&value)
}
