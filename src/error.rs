/// Error classes raised across the sweep and analysis pipelines.
///
/// Only [`ErrorKind::Configuration`] aborts a whole sweep. Every other kind is
/// contained to one run or one artifact by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid protocol or malformed sweep inputs, discovered before dispatch.
    Configuration,
    /// The simulator could not be launched or waited on.
    RunInvocation,
    /// The simulator exited with a nonzero status.
    RunFailure,
    /// An artifact is unreadable or lacks usable columns.
    DataFormat,
    /// An expected artifact is absent.
    MissingArtifact,
    /// A chart could not be drawn or written.
    Render,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::RunInvocation | ErrorKind::RunFailure => 3,
            ErrorKind::DataFormat | ErrorKind::MissingArtifact => 4,
            ErrorKind::Render => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            exit_code: kind.exit_code(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RunInvocation, message)
    }

    pub fn run_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RunFailure, message)
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataFormat, message)
    }

    pub fn missing_artifact(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingArtifact, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
