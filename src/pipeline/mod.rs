pub mod stage1_load;
pub mod stage2_enrich;
pub mod stage3_query;
pub mod stage4_cutscore;
pub mod stage5_report;

use thiserror::Error;

use crate::input::InputError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid selection: {0}")]
    Selection(String),
}
