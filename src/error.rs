//! Process-level error type.
//!
//! One error shape for the whole pipeline, carrying the process exit code:
//!
//! - 2: configuration/input errors (bad parameters, unreadable files),
//!   raised before any computation starts
//! - 3: insufficient data (empty observation series after loading)
//! - 4: external-source or computation failures (catalog unreachable,
//!   mismatched grids)
//!
//! Coverage gaps and degenerate statistics are NOT errors; they travel as
//! no-data cells and `None` aggregates instead.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
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
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
