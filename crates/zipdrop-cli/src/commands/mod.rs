//! Command implementations.

pub mod bundle;
pub mod completion;

use std::process::ExitCode;

/// How a finished command should end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Everything requested was done.
    Complete,
    /// The archive exists but at least one copy failed.
    Partial,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Complete => ExitCode::SUCCESS,
            Self::Partial => ExitCode::from(2),
        }
    }
}
