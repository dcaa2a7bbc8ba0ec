use thiserror::Error;

/// Errors returned by the model-call client and its typed wrappers.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an application-level error body.
    #[error("AI API error: {0}")]
    ApiError(String),

    /// The completion came back with no usable message content.
    #[error("empty completion for {context}")]
    EmptyResponse { context: String },

    /// The model's output did not contain the JSON the contract requires.
    #[error("unparseable model output for {context}: {reason}")]
    InvalidJson { context: String, reason: String },

    /// The model's output parsed but violated the decision contract
    /// (unknown campaign id, skip outside auto mode).
    #[error("invalid routing decision: {0}")]
    InvalidDecision(String),

    /// The generated email sequence violated a structural guarantee.
    #[error("invalid email sequence: {0}")]
    InvalidSequence(String),
}
