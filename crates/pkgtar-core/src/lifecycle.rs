use crate::CoreError;
use std::fmt;

/// Pipeline stages, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Load,
    Collect,
    Archive,
    WriteDepfile,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Collect => "collect",
            Stage::Archive => "archive",
            Stage::WriteDepfile => "write-depfile",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Load => Some(Stage::Collect),
            Stage::Collect => Some(Stage::Archive),
            Stage::Archive => Some(Stage::WriteDepfile),
            Stage::WriteDepfile => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

/// Only single forward steps are allowed: no skipping, no retries.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), CoreError> {
    if from.next() == Some(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
