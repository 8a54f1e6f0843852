/// Shared error type used across all agent-harness crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("model error ({provider}): {message}")]
    ModelError { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    /// The agent's state machine rejected a transition, e.g. stepping a
    /// run that has already finished.
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid arguments for tool {tool}: {message}")]
    ToolArgumentInvalid { tool: String, message: String },

    #[error("tool {tool} failed: {message}")]
    ToolExecutionError { tool: String, message: String },

    /// Context could not be reduced below `memory.compaction_threshold_tokens`
    /// even after compaction ran.
    #[error("context budget exceeded: {0} tokens over the configured threshold")]
    ContextBudgetExceeded(usize),

    #[error("transport: {0}")]
    TransportError(String),

    #[error("grading error: {0}")]
    GradingError(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
