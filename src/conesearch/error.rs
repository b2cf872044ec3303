use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Message returned to clients for every failure whose detail must stay
/// server-side.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred in processing the request";

/// A single invalid request field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Where the field came from, e.g. `query` or `path`.
    pub location: &'static str,
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn query(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldViolation {
            location: "query",
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error in {} {}: {}", self.location, self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Every protocol-level violation found in the request.
    Fields(Vec<FieldViolation>),
    /// The radius is valid for the protocol but above the catalog ceiling.
    RadiusExceedsCatalog { sr: f64, max_radius: f64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Fields(violations) => {
                let joined: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                f.write_str(&joined.join(", "))
            }
            ValidationError::RadiusExceedsCatalog { sr, max_radius } => write!(
                f,
                "SR value {:?} exceeds maximum allowable for catalog ({:?}).",
                sr, max_radius
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConeSearchError {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Unknown catalog: {0}")]
    NotFound(String),

    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    #[error("Result encoding failed: {0}")]
    Encoding(String),

    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

impl ConeSearchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConeSearchError::Validation(_) => StatusCode::BAD_REQUEST,
            ConeSearchError::NotFound(_) => StatusCode::NOT_FOUND,
            ConeSearchError::QueryExecution(_)
            | ConeSearchError::Encoding(_)
            | ConeSearchError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text that may cross the trust boundary into the response.
    pub fn client_message(&self) -> String {
        match self {
            ConeSearchError::Validation(_) | ConeSearchError::NotFound(_) => self.to_string(),
            ConeSearchError::QueryExecution(_)
            | ConeSearchError::Encoding(_)
            | ConeSearchError::Unknown(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConeSearchError::Validation(_) => "validation",
            ConeSearchError::NotFound(_) => "not_found",
            ConeSearchError::QueryExecution(_) => "query_execution",
            ConeSearchError::Encoding(_) => "encoding",
            ConeSearchError::Unknown(_) => "unknown",
        }
    }
}

impl From<ValidationError> for ConeSearchError {
    fn from(err: ValidationError) -> Self {
        ConeSearchError::Validation(err)
    }
}

impl From<rusqlite::Error> for ConeSearchError {
    fn from(err: rusqlite::Error) -> Self {
        ConeSearchError::QueryExecution(err.to_string())
    }
}
