//! Reporting order for the categorical item attributes.
//!
//! Values missing from a list are still accepted; they sort after every
//! known value, alphabetically among themselves.

use std::cmp::Ordering;

pub const PROCESS_ORDER: &[&str] = &[
    "No definido",
    "Recuperación de información",
    "Comprensión",
    "Análisis",
    "Utilización del conocimiento",
    "Propuesta de solución",
    "Juicio crítico",
];

pub const FIELD_ORDER: &[&str] = &[
    "Lenguajes",
    "Saberes y pensamiento científico",
    "De lo humano y lo comunitario",
    "Ética, naturaleza y sociedades",
];

fn rank(order: &[&str], value: &str) -> usize {
    order.iter().position(|&v| v == value).unwrap_or(order.len())
}

fn cmp_ranked(order: &[&str], a: &str, b: &str) -> Ordering {
    rank(order, a)
        .cmp(&rank(order, b))
        .then_with(|| a.cmp(b))
}

pub fn cmp_process(a: &str, b: &str) -> Ordering {
    cmp_ranked(PROCESS_ORDER, a, b)
}

pub fn cmp_field(a: &str, b: &str) -> Ordering {
    cmp_ranked(FIELD_ORDER, a, b)
}

/// Numeric-aware comparison for grade-like strings ("2" < "10").
pub fn cmp_numeric_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Nulls sort after every value.
pub fn cmp_nullable(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
