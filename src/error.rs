//! Crate-wide error type.
//!
//! Every failure that can end a run is an [`AppError`]. The [`ErrorKind`]
//! keeps the failure channels distinguishable for callers and decides the
//! process exit code.

/// Which stage of the pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad command-line input.
    Argument,
    /// The point-prediction model artifact could not be loaded.
    ModelLoad,
    /// The solver session could not be opened.
    EngineConnect,
    /// The open solver session rejected an operation.
    Session,
    /// The point-prediction model failed on a row.
    ModelInference,
    /// Every curve-fit attempt failed.
    FitExhausted,
    /// The fitted curve produced a non-finite value on the grid.
    Evaluation,
    /// Writing or reading an output file failed.
    Io,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::FitExhausted | ErrorKind::Evaluation => 2,
            ErrorKind::Argument
            | ErrorKind::ModelLoad
            | ErrorKind::EngineConnect
            | ErrorKind::Session
            | ErrorKind::ModelInference
            | ErrorKind::Io => 1,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
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
            .field("exit_code", &self.exit_code())
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
