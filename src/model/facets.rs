use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::analytic::{AnalyticRow, AnalyticTable};
use crate::model::order::{cmp_field, cmp_numeric_text, cmp_process};

/// Dimensions a user can narrow the analytic table by, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Nivel,
    Grado,
    Servicio,
    Eia,
    Proceso,
    Campo,
    Criterio,
}

impl Facet {
    pub const ALL: [Facet; 7] = [
        Facet::Nivel,
        Facet::Grado,
        Facet::Servicio,
        Facet::Eia,
        Facet::Proceso,
        Facet::Campo,
        Facet::Criterio,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Facet::Nivel => "nivel",
            Facet::Grado => "grado",
            Facet::Servicio => "servicio",
            Facet::Eia => "eia",
            Facet::Proceso => "proceso",
            Facet::Campo => "campo",
            Facet::Criterio => "criterio",
        }
    }

    /// `None` when the row has no value for this facet; such rows never match a choice.
    pub fn value_of(self, row: &AnalyticRow) -> Option<Cow<'_, str>> {
        let value = match self {
            Facet::Nivel => Cow::Borrowed(row.nivel.as_str()),
            Facet::Grado => Cow::Owned(row.grado.to_string()),
            Facet::Servicio => Cow::Borrowed(row.servicio.as_deref()?),
            Facet::Eia => Cow::Borrowed(row.eia.as_str()),
            Facet::Proceso => Cow::Borrowed(row.proceso.as_str()),
            Facet::Campo => Cow::Borrowed(row.campo.as_str()),
            Facet::Criterio => Cow::Borrowed(row.criterio.as_str()),
        };
        Some(value)
    }

    fn cmp_values(self, a: &str, b: &str) -> Ordering {
        match self {
            Facet::Grado => cmp_numeric_text(a, b),
            Facet::Proceso => cmp_process(a, b),
            Facet::Campo => cmp_field(a, b),
            Facet::Nivel | Facet::Servicio | Facet::Eia | Facet::Criterio => a.cmp(b),
        }
    }
}

/// Options offered for one facet and the subset currently chosen.
///
/// `chosen == None` leaves the facet unrestricted; `Some(empty)` matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetChoice {
    #[serde(default)]
    pub available: Vec<String>,
    #[serde(default)]
    pub chosen: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetSelection {
    #[serde(default)]
    pub facets: BTreeMap<Facet, FacetChoice>,
}

impl FacetSelection {
    pub fn choose<I, S>(&mut self, facet: Facet, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chosen = values.into_iter().map(Into::into).collect();
        self.facets.entry(facet).or_default().chosen = Some(chosen);
    }

    pub fn clear(&mut self, facet: Facet) {
        if let Some(choice) = self.facets.get_mut(&facet) {
            choice.chosen = None;
        }
    }

    pub fn constraint(&self, facet: Facet) -> Option<&BTreeSet<String>> {
        self.facets.get(&facet).and_then(|c| c.chosen.as_ref())
    }

    pub fn available(&self, facet: Facet) -> &[String] {
        self.facets
            .get(&facet)
            .map(|c| c.available.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_unrestricted(&self) -> bool {
        Facet::ALL.iter().all(|&f| self.constraint(f).is_none())
    }

    pub fn matches(&self, row: &AnalyticRow) -> bool {
        Facet::ALL.iter().all(|&f| self.matches_facet(f, row))
    }

    fn matches_facet(&self, facet: Facet, row: &AnalyticRow) -> bool {
        match self.constraint(facet) {
            Some(allowed) => facet
                .value_of(row)
                .is_some_and(|value| allowed.contains(value.as_ref())),
            None => true,
        }
    }

    /// Recomputes every facet's available values from `table`.
    ///
    /// Each facet's options come from the rows that pass the constraints of
    /// the facets before it in cascade order, so choosing a level narrows the
    /// grades offered, and level plus grade narrow the strata and units.
    pub fn refresh_available(&mut self, table: &AnalyticTable) {
        for (pos, &facet) in Facet::ALL.iter().enumerate() {
            let upstream = &Facet::ALL[..pos];
            let mut values: Vec<String> = table
                .rows
                .iter()
                .filter(|row| upstream.iter().all(|&f| self.matches_facet(f, row)))
                .filter_map(|row| facet.value_of(row).map(Cow::into_owned))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            values.sort_by(|a, b| facet.cmp_values(a, b));
            self.facets.entry(facet).or_default().available = values;
        }
    }

    pub fn from_table(table: &AnalyticTable) -> Self {
        let mut selection = Self::default();
        selection.refresh_available(table);
        selection
    }
}
