use thiserror::Error;

/// Errors returned by the outbound platform and notification clients.
#[derive(Debug, Error)]
pub enum OutboundError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform returned a non-2xx status with an error body.
    #[error("outbound API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
