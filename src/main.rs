mod input;
mod logging;
mod model;
mod pipeline;
mod report;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::input::SourcePaths;
use crate::model::facets::{Facet, FacetSelection};
use crate::pipeline::PipelineError;
use crate::pipeline::stage1_load::DataContext;
use crate::pipeline::stage3_query::{SortMode, filter_rows, run_query};
use crate::pipeline::stage4_cutscore::{PersonSlice, run_cutscore};
use crate::pipeline::stage5_report::{write_cutscore, write_enrich_reports, write_query_outputs};

#[derive(Debug, Parser)]
#[command(
    name = "diagnostica-rollup",
    version,
    about = "Join diagnostic-assessment tables into one analytic table and query it"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build (or reuse) the analytic table and write summary reports.
    Enrich {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Filter and sort the analytic table.
    Query {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        facets: FacetArgs,
        #[arg(long, value_enum, default_value_t = SortMode::Natural)]
        sort: SortMode,
    },
    /// Resolve the person quantile for a difficulty threshold.
    Cut {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        nivel: String,
        #[arg(long)]
        grado: u32,
        #[arg(long)]
        eia_clave: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        threshold: f64,
        #[arg(long)]
        proceso: Vec<String>,
        #[arg(long)]
        campo: Vec<String>,
        #[arg(long)]
        criterio: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Directory holding the source tables.
    #[arg(long, env = "DIAGNOSTICA_DATA_DIR")]
    data_dir: PathBuf,
    /// Output directory; also holds the persisted analytic table.
    #[arg(long)]
    out: PathBuf,
    /// Ignore a persisted analytic table even if its fingerprint matches.
    #[arg(long)]
    rebuild: bool,
}

#[derive(Debug, Default, Args)]
struct FacetArgs {
    #[arg(long)]
    nivel: Vec<String>,
    #[arg(long)]
    grado: Vec<String>,
    /// School-service stratum; rows without one never match.
    #[arg(long)]
    servicio: Vec<String>,
    #[arg(long)]
    eia: Vec<String>,
    #[arg(long)]
    proceso: Vec<String>,
    #[arg(long)]
    campo: Vec<String>,
    #[arg(long)]
    criterio: Vec<String>,
    /// JSON facet selection; repeatable flags override its facets.
    #[arg(long)]
    selection: Option<PathBuf>,
}

impl FacetArgs {
    fn to_selection(&self) -> Result<FacetSelection, PipelineError> {
        let mut selection = match &self.selection {
            Some(path) => load_selection(path)?,
            None => FacetSelection::default(),
        };
        for (facet, values) in [
            (Facet::Nivel, &self.nivel),
            (Facet::Grado, &self.grado),
            (Facet::Servicio, &self.servicio),
            (Facet::Eia, &self.eia),
            (Facet::Proceso, &self.proceso),
            (Facet::Campo, &self.campo),
            (Facet::Criterio, &self.criterio),
        ] {
            if !values.is_empty() {
                selection.choose(facet, values.iter().cloned());
            }
        }
        Ok(selection)
    }
}

fn load_selection(path: &Path) -> Result<FacetSelection, PipelineError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| PipelineError::Selection(format!("{}: {e}", path.display())))
}

fn main() {
    logging::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let mut ctx = DataContext::new();
    match cli.command {
        Command::Enrich { common } => {
            let paths = SourcePaths::resolve(&common.data_dir)?;
            let output = ctx.enriched_persisted(&paths, &common.out, common.rebuild)?;
            write_enrich_reports(&common.out, &output)?;
        }
        Command::Query {
            common,
            facets,
            sort,
        } => {
            let mut selection = facets.to_selection()?;
            let paths = SourcePaths::resolve(&common.data_dir)?;
            let output = ctx.enriched_persisted(&paths, &common.out, common.rebuild)?;
            selection.refresh_available(&output.table);
            let result = run_query(&output.table, &selection, sort);
            write_query_outputs(&common.out, &result, &selection, sort)?;
        }
        Command::Cut {
            common,
            nivel,
            grado,
            eia_clave,
            threshold,
            proceso,
            campo,
            criterio,
        } => {
            let paths = SourcePaths::resolve(&common.data_dir)?;
            let output = ctx.enriched_persisted(&paths, &common.out, common.rebuild)?;

            let mut selection = FacetSelection::default();
            for (facet, values) in [
                (Facet::Proceso, proceso),
                (Facet::Campo, campo),
                (Facet::Criterio, criterio),
            ] {
                if !values.is_empty() {
                    selection.choose(facet, values);
                }
            }
            let rows = filter_rows(&output.table, &selection);

            let persons = ctx.persons(&paths.persons)?;
            let histogram = ctx.histogram(&paths.histogram)?;
            let slice = PersonSlice {
                nivel,
                grado,
                eia_clave,
            };
            let report = run_cutscore(&rows, &persons, &histogram, slice, threshold);
            write_cutscore(&common.out, &report)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
