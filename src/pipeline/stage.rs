//! Pipeline stages.

use std::fmt;

/// Position of a run in the fragment pipeline.
///
/// ```text
/// Extract → Filter → CheckConflicts → Compose → Write → UpdateRegistry → Done
///                          │
///                          └─ conflicts without override → abort
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Filter,
    CheckConflicts,
    Compose,
    Write,
    UpdateRegistry,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Filter => "filter",
            Stage::CheckConflicts => "check_conflicts",
            Stage::Compose => "compose",
            Stage::Write => "write",
            Stage::UpdateRegistry => "update_registry",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
