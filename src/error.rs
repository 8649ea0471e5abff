use thiserror::Error;

/// Failures this tool recognises and reports in the error envelope.
///
/// Anything else that escapes a component is an unexpected failure and is
/// rendered with an `Unexpected error:` prefix at the top level.
#[derive(Debug, Error)]
pub enum ToolError {
    /// An external process exited non-zero while the caller asked for a check.
    #[error("Command failed ({code}): {command}\nstdout: {stdout}\nstderr: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Timed out waiting for sys.boot_completed")]
    BootTimeout,

    /// A well-defined precondition was violated before any process ran.
    #[error("{0}")]
    InvalidInput(String),
}
