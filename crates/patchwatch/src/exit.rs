//! Process exit codes

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Failure,
    InvalidConfig,
}

impl ExitCode {
    pub const fn as_u8(self) -> u8 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Failure => 1,
            ExitCode::InvalidConfig => 2,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

/// An error tagged with the exit code it should produce
#[derive(Debug)]
pub struct ExitError {
    pub code: ExitCode,
    pub err: eyre::Report,
}

impl ExitError {
    pub fn new(code: ExitCode, err: eyre::Report) -> Self {
        Self { code, err }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.err.as_ref())
    }
}

/// Exit code for a failed run; untagged errors map to 1
pub fn exit_code(err: &eyre::Report) -> ExitCode {
    err.downcast_ref::<ExitError>()
        .map_or(ExitCode::Failure, |exit| exit.code)
}

/// Tag an error as a configuration problem
pub fn invalid_config(err: impl Into<eyre::Report>) -> eyre::Report {
    ExitError::new(ExitCode::InvalidConfig, err.into()).into()
}
