//! Error types for the execution engine.
//!
//! Only infrastructure failures are errors here. Program outcomes — a failed
//! compile, a non-zero exit, a timeout — are facts about the submitted code
//! and travel as data inside `ExecutionResult`, never as `Err`.

use thiserror::Error;

/// Errors surfaced to callers of the orchestrator.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(#[from] ExecutorError),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Infrastructure-class failures inside a backend. Any of these signals the
/// orchestrator to retry the request once against the direct backend.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Docker daemon unreachable: {0}")]
    DaemonUnreachable(String),
    #[error("Bollard (Docker client) error: {0}")]
    Bollard(#[from] bollard::errors::Error),
    #[error("I/O error while staging code: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("staging failure: {0}")]
    Staging(String),
    #[error("malformed command in language profile: {0}")]
    InvalidProfile(String),
    #[error("container wait stream ended unexpectedly")]
    WaitChannelClosed,
}
