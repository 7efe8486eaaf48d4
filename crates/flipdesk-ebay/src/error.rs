use thiserror::Error;

/// Errors returned by the eBay API client.
#[derive(Debug, Error)]
pub enum EbayError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The client-credentials token exchange failed.
    #[error("eBay auth error: {0}")]
    Auth(String),

    /// Client id or secret is not configured.
    #[error("eBay credentials are not configured: {0} is missing")]
    MissingCredentials(&'static str),

    /// eBay answered with a non-success HTTP status.
    #[error("eBay returned HTTP {status} for {context}")]
    Upstream { context: String, status: u16 },

    /// A JSON body did not match the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A Trading API response body was not well-formed XML.
    #[error("XML parse error for {context}: {source}")]
    Xml {
        context: String,
        #[source]
        source: quick_xml::Error,
    },

    /// The Trading API answered with `<Ack>Failure</Ack>`.
    #[error("eBay {call} failed: {message}")]
    Api { call: String, message: String },

    #[error("invalid eBay base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl EbayError {
    /// `true` when the failure happened talking to eBay rather than in
    /// local configuration or credential exchange.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            EbayError::Http(_)
                | EbayError::Upstream { .. }
                | EbayError::Deserialize { .. }
                | EbayError::Xml { .. }
                | EbayError::Api { .. }
        )
    }
}
