use serde::{Deserialize, Serialize};
use std::fmt;

/// Content category assigned to a sentence or a phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Informational content; also the safe default
    #[default]
    Info,
    /// Promotional content
    Promo,
    /// Risk warning
    Risk,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Info, Label::Promo, Label::Risk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Info => "info",
            Label::Promo => "promo",
            Label::Risk => "risk",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
