//! Error types for sheet access and writes.

use reqwest::StatusCode;

/// Errors raised by the sheet access client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SheetsError {
    /// The API answered with a non-success status.
    #[error("Google Sheets API request failed ({status}): {body}")]
    Http { status: StatusCode, body: String },

    /// The request never produced a response.
    #[error("request to Google Sheets failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("failed to decode Google Sheets response: {0}")]
    Decode(String),

    /// The configured endpoint cannot carry path segments.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Sheet \"{0}\" not found in spreadsheet")]
    SheetNotFound(String),

    #[error("No student data found in the sheet")]
    NoStudentData,

    #[error("No sample data available for sheet \"{0}\"")]
    NoSampleData(String),
}

impl SheetsError {
    /// HTTP status of the failed request, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SheetsError::Http { status, .. } => Some(*status),
            SheetsError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Classified failure of a write.
///
/// Simulated writes are not errors; this only covers attempts that could not
/// be turned into a simulation, plus the classified reason carried by
/// simulations that follow a rejected attempt.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WriteError {
    #[error(
        "Authentication error: You need to sign in with your Google account to write to Google Sheets."
    )]
    Authentication,

    #[error("Permission denied: Make sure your Google Sheet is shared with edit permissions.")]
    PermissionDenied,

    #[error("{0}")]
    NotFound(String),

    #[error("Could not retrieve headers")]
    Headers,

    #[error("{0}")]
    Remote(String),
}

impl WriteError {
    pub(crate) fn student_not_found(id: &str) -> Self {
        WriteError::NotFound(format!("Student with ID {id} not found"))
    }
}

impl From<SheetsError> for WriteError {
    fn from(err: SheetsError) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED) => WriteError::Authentication,
            Some(StatusCode::FORBIDDEN) => WriteError::PermissionDenied,
            _ => match err {
                SheetsError::SheetNotFound(_) => WriteError::NotFound(err.to_string()),
                other => WriteError::Remote(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> SheetsError {
        SheetsError::Http {
            status: StatusCode::from_u16(status).unwrap(),
            body: "boom".to_string(),
        }
    }

    #[test]
    fn test_unauthorized_classifies_as_authentication() {
        let err = WriteError::from(http(401));
        assert!(matches!(err, WriteError::Authentication));
        assert!(err.to_string().starts_with("Authentication error:"));
    }

    #[test]
    fn test_forbidden_classifies_as_permission_denied() {
        let err = WriteError::from(http(403));
        assert!(matches!(err, WriteError::PermissionDenied));
        assert!(err.to_string().starts_with("Permission denied:"));
    }

    #[test]
    fn test_other_failures_keep_underlying_message() {
        let err = WriteError::from(http(500));
        assert_eq!(
            err.to_string(),
            "Google Sheets API request failed (500 Internal Server Error): boom"
        );
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(http(429).is_rate_limited());
        assert!(!http(500).is_rate_limited());
        assert!(!SheetsError::NoStudentData.is_rate_limited());
    }

    #[test]
    fn test_student_not_found_message() {
        assert_eq!(
            WriteError::student_not_found("42").to_string(),
            "Student with ID 42 not found"
        );
    }
}
