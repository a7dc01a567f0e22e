//! Request and response bodies of the N1QL query service.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const SUCCESS: &str = "success";

/// Body posted to `/query/service`.
#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub statement: &'a str,
    pub args: &'a [Value],
    pub timeout: String,
    pub client_context_id: String,
}

/// Body returned by `/query/service`.
///
/// The service answers failed statements with a non-success HTTP status and
/// the same body shape, so both outcomes are decoded from it.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub errors: Vec<ServiceError>,
}

impl QueryResponse {
    /// Returns the result rows of a successful request.
    ///
    /// Reported service errors win over the status, so duplicate keys stay
    /// recognizable. A request that neither reports errors nor ends with
    /// HTTP success and `"status": "success"` is still a failure.
    pub fn into_results(self, http: StatusCode) -> Result<Vec<Value>, QueryError> {
        if !self.errors.is_empty() {
            return Err(QueryError::Service(self.errors));
        }
        if !http.is_success() || self.status != SUCCESS {
            return Err(QueryError::Status { http, status: self.status });
        }

        Ok(self.results)
    }
}

/// One entry of the `errors` array of a query response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Error)]
#[error("[{code}] {msg}")]
pub struct ServiceError {
    pub code: u32,
    #[serde(default)]
    pub msg: String,
}

impl ServiceError {
    /// `12009` is the generic DML failure, so its message decides.
    pub fn is_duplicate_key(&self) -> bool {
        match self.code {
            17012 => true,
            12009 => self.msg.to_lowercase().contains("duplicate key"),
            _ => false,
        }
    }
}

/// Failure of a single query service request.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request could not be sent or its body could not be read.
    #[error("query service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service rejected the statement.
    #[error("query service error: {}", join(.0))]
    Service(Vec<ServiceError>),
    /// The request failed without naming an error.
    #[error("query service answered {http} with status `{status}`")]
    Status { http: StatusCode, status: String },
}

impl QueryError {
    /// Whether the failure is an insert against an existing key.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            QueryError::Service(errors) => errors.iter().any(ServiceError::is_duplicate_key),
            QueryError::Transport(_) | QueryError::Status { .. } => false,
        }
    }
}

fn join(errors: &[ServiceError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
