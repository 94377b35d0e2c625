use std::fmt;

use super::RepositoryStatus;

const LABEL: &str = "DevFlow";

/// Status line text derived from a known `RepositoryStatus`
///
/// `DevFlow ↓<behind> ↑<ahead> ✎<changed>`; zero counts are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub text: String,
    pub tooltip: &'static str,
}

impl StatusSummary {
    pub fn from_status(status: &RepositoryStatus) -> Self {
        let mut text = LABEL.to_string();
        if status.behind > 0 {
            text.push_str(&format!(" ↓{}", status.behind));
        }
        if status.ahead > 0 {
            text.push_str(&format!(" ↑{}", status.ahead));
        }
        if !status.changed_files.is_empty() {
            text.push_str(&format!(" ✎{}", status.changed_files.len()));
        }

        Self {
            text,
            tooltip: "Ask DevFlow about this repository",
        }
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
