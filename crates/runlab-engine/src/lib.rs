//! Execution orchestration engine for untrusted code submissions.
//!
//! Callers hand the engine raw source text and a language identifier and get
//! back the program's stdout, stderr, exit code, and a success flag. The
//! engine decides how the code actually runs:
//!
//! - **Sandboxed backend**: a single-use Docker container with memory and CPU
//!   ceilings and no network access, the preferred path for untrusted input.
//! - **Direct backend**: the language toolchain as a host process with a
//!   wall-clock deadline, used when Docker is unreachable at startup or a
//!   specific sandboxed run fails for infrastructure reasons.
//!
//! The [`orchestrator::ExecutionOrchestrator`] is the only entry point;
//! backend selection and fallback are invisible to callers, who always
//! receive the same normalized [`executors::ExecutionResult`] shape.

pub mod config;
pub mod errors;
pub mod executors;
pub mod orchestrator;
pub mod profiles;

pub use config::EngineConfig;
pub use errors::{EngineError, ExecutorError};
pub use executors::{Backend, CodeExecutor, ExecutionResult};
pub use orchestrator::ExecutionOrchestrator;
pub use profiles::{LanguageProfile, LanguageRegistry};
