use eyre::WrapErr;
use serde::Deserialize;
use std::str::FromStr;

/// A single remote list call failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteCallError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limit exceeded")]
    Throttling,
    #[error("could not dispatch request: {0}")]
    Dispatch(String),
    #[error("no credentials found")]
    NoCredentials,
    #[error("credentials expired")]
    CredentialsExpired,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },
    #[error("malformed response: {0}")]
    Response(String),
    #[error("other error {0}")]
    Unknown(String),
}

impl RemoteCallError {
    /// Classify an AWS error code.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "Throttling" | "ThrottlingException" | "RequestLimitExceeded" => Self::Throttling,
            "ExpiredToken" | "ExpiredTokenException" | "RequestExpired" => Self::CredentialsExpired,
            "InvalidClientTokenId" | "UnrecognizedClientException" | "MissingAuthenticationToken" => {
                Self::NoCredentials
            }
            c if c.ends_with("NotFound") || c.ends_with("NotFoundFault") => Self::NotFound(message),
            _ => Self::Service {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Worth sending the same request again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Throttling)
    }
}

/// A walk stopped before reaching its natural end.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    #[error("invalid walk configuration: {0}")]
    InvalidConfiguration(String),
    #[error("remote call failed after {emitted} items")]
    Remote {
        #[source]
        source: RemoteCallError,
        emitted: u64,
    },
    #[error("walk cancelled after {emitted} items")]
    Cancelled { emitted: u64 },
}

impl WalkError {
    /// Items successfully emitted before the walk stopped.
    pub fn emitted(&self) -> u64 {
        match self {
            Self::InvalidConfiguration(_) => 0,
            Self::Remote { emitted, .. } | Self::Cancelled { emitted } => *emitted,
        }
    }

    pub fn remote(&self) -> Option<&RemoteCallError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised by the command line front end.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error parsing --since argument")]
    ParseSince,
    #[error("error parsing --starting-token argument")]
    EmptyStartingToken,
    #[error("--max-items cannot be combined with --no-paginate")]
    MaxItemsWithoutPagination,
    #[error("listing did not start")]
    Incomplete(#[from] WalkError),
}

/// Body of an AWS query-protocol error response.
#[derive(Debug, PartialEq, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: ErrorDetail,
    #[serde(rename = "RequestId")]
    pub request_id: String,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "Type")]
    pub type_: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl FromStr for ErrorResponse {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_xml_rs::from_str(s).wrap_err_with(|| format!("parsing xml from {}", s))
    }
}

impl From<ErrorResponse> for RemoteCallError {
    fn from(response: ErrorResponse) -> Self {
        RemoteCallError::from_code(&response.error.code, response.error.message)
    }
}
