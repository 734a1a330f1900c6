use serde::{Deserialize, Serialize};
use std::fmt;

/// The four ensemble members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Bagged regression trees
    Rf,
    /// Gradient-boosted regression trees
    Gb,
    /// Second-order boosted trees (optional capability)
    Xgb,
    /// Two-layer recurrent sequence network
    Lstm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [ModelKind::Rf, ModelKind::Gb, ModelKind::Xgb, ModelKind::Lstm];

    pub fn key(&self) -> &'static str {
        match self {
            ModelKind::Rf => "rf",
            ModelKind::Gb => "gb",
            ModelKind::Xgb => "xgb",
            ModelKind::Lstm => "lstm",
        }
    }

    /// Tabular models see one feature row; the sequence model sees a window.
    pub fn is_tabular(&self) -> bool {
        !matches!(self, ModelKind::Lstm)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Which models contributed to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelFlags {
    pub rf: bool,
    pub gb: bool,
    pub xgb: bool,
    pub lstm: bool,
}

impl ModelFlags {
    pub fn from_kinds(kinds: impl IntoIterator<Item = ModelKind>) -> Self {
        let mut flags = Self::default();
        for kind in kinds {
            match kind {
                ModelKind::Rf => flags.rf = true,
                ModelKind::Gb => flags.gb = true,
                ModelKind::Xgb => flags.xgb = true,
                ModelKind::Lstm => flags.lstm = true,
            }
        }
        flags
    }

    pub fn count(&self) -> usize {
        [self.rf, self.gb, self.xgb, self.lstm]
            .iter()
            .filter(|f| **f)
            .count()
    }
}
