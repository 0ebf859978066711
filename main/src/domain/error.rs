use reqwest::StatusCode;

/// What can go wrong when issuing a command against the controller.
///
/// Read-path failures (mirror refreshes) are swallowed and logged at the
/// mirror boundary; only write-path failures surface through this type.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No response at all (network unreachable, timeout, abort).
    #[error("controller unreachable: {0}")]
    Transport(String),
    /// The controller answered with a non-success status. The message is the
    /// `detail` field of the structured error body if there was one, a
    /// generic text otherwise.
    #[error("controller rejected command ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    /// The controller answered, but the body didn't parse.
    #[error("malformed controller response: {0}")]
    Parse(String),
    /// The auto-movement policy refused to move because the configured
    /// target object is not visible. No request was issued.
    #[error("target object not visible")]
    TargetNotVisible,
}

impl From<reqwest::Error> for CommandError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CommandError::Parse(e.to_string())
        } else {
            CommandError::Transport(e.to_string())
        }
    }
}
