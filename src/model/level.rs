use std::fmt;

use serde::{Deserialize, Serialize};

/// Rubric response level, ordered from no evidence (`N0`) to developed (`N3`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResponseLevel {
    N0,
    N1,
    N2,
    N3,
}

impl ResponseLevel {
    pub const ALL: [ResponseLevel; 4] = [
        ResponseLevel::N0,
        ResponseLevel::N1,
        ResponseLevel::N2,
        ResponseLevel::N3,
    ];
    pub const LOWEST: ResponseLevel = ResponseLevel::N0;
    pub const HIGHEST: ResponseLevel = ResponseLevel::N3;

    /// Exact match on the level code; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "N0" => Some(ResponseLevel::N0),
            "N1" => Some(ResponseLevel::N1),
            "N2" => Some(ResponseLevel::N2),
            "N3" => Some(ResponseLevel::N3),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ResponseLevel::N0 => "N0",
            ResponseLevel::N1 => "N1",
            ResponseLevel::N2 => "N2",
            ResponseLevel::N3 => "N3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResponseLevel::N0 => "Sin evidencias de desarrollo del aprendizaje",
            ResponseLevel::N1 => "Requiere apoyo para desarrollar el aprendizaje",
            ResponseLevel::N2 => "En proceso de desarrollo",
            ResponseLevel::N3 => "Aprendizaje desarrollado",
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ResponseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
