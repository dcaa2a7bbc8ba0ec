use thiserror::Error;

/// Errors returned by the webset discovery client.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an application-level error body.
    #[error("discovery API error: {0}")]
    ApiError(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The polling attempt ceiling was exhausted before the webset went idle.
    #[error("webset {webset_id} still not idle after {attempts} poll attempts")]
    PollTimeout { webset_id: String, attempts: u32 },
}
