use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::sequencer::RunState;

/// Every way a deploy run can fail.
///
/// Remote messages are carried verbatim; the sequencer adds the step context.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{0}")]
    Remote(String),

    #[error("stack {stack_name} finished in status {status}: {reason}")]
    StackFailed {
        stack_name: String,
        status: String,
        reason: String,
    },

    #[error("stack {stack_name} is in state {status} and cannot be updated; delete it manually and re-run")]
    StackStateConflict { stack_name: String, status: String },

    #[error("timed out after {waited_secs}s waiting for {target}")]
    Timeout { target: String, waited_secs: u64 },

    #[error("compute unit {function_name} does not exist (has the stack been deployed?)")]
    UnitNotFound { function_name: String },

    #[error("service reported {reported} bytes for {function_name} but {expected} bytes were uploaded")]
    SizeMismatch {
        function_name: String,
        expected: u64,
        reported: u64,
    },

    #[error("function {function_name} update failed: {reason}")]
    UnitUpdateFailed {
        function_name: String,
        reason: String,
    },

    #[error("declared source file is missing: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("dependency manifest is missing: {}", path.display())]
    MissingManifest { path: PathBuf },

    #[error("dependency installation failed for {unit}: {message}")]
    DependencyInstall { unit: String, message: String },

    #[error("archive for {unit} is {size} bytes, above the {limit} byte upload limit")]
    ArchiveTooLarge { unit: String, size: u64, limit: u64 },

    #[error("template {} is {size} bytes, above the {limit} byte inline limit; configure a template bucket", path.display())]
    TemplateTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to read operator input: {0}")]
    Input(#[source] std::io::Error),

    #[error("invalid deploy manifest: {0}")]
    InvalidManifest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    ResourceState,
    Local,
}

impl DeployError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(_) | Self::Timeout { .. } => ErrorKind::Connectivity,
            Self::StackFailed { .. }
            | Self::StackStateConflict { .. }
            | Self::UnitNotFound { .. }
            | Self::SizeMismatch { .. }
            | Self::UnitUpdateFailed { .. } => ErrorKind::ResourceState,
            Self::MissingSource { .. }
            | Self::MissingManifest { .. }
            | Self::DependencyInstall { .. }
            | Self::ArchiveTooLarge { .. }
            | Self::TemplateTooLarge { .. }
            | Self::Io { .. }
            | Self::Archive(_)
            | Self::Input(_)
            | Self::InvalidManifest(_) => ErrorKind::Local,
        }
    }
}

/// A fatal error tagged with the state the run was in when it happened.
#[derive(Debug)]
pub struct RunFailure {
    pub state: RunState,
    pub error: DeployError,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.state.step_label(), self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
