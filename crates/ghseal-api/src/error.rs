use thiserror::Error;

/// Errors from secrets API calls
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a 4xx/5xx status
    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a status error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the remote reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Turns a not-found error into `Ok(None)`, passing everything else through
pub trait NotFoundExt<T> {
    fn found(self) -> Result<Option<T>, ApiError>;
}

impl<T> NotFoundExt<T> for Result<T, ApiError> {
    fn found(self) -> Result<Option<T>, ApiError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_becomes_none() {
        let result: Result<u32, ApiError> = Err(ApiError::status(404, "Not Found"));
        assert!(matches!(result.found(), Ok(None)));

        let result: Result<u32, ApiError> = Ok(7);
        assert!(matches!(result.found(), Ok(Some(7))));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let result: Result<u32, ApiError> = Err(ApiError::status(403, "Forbidden"));
        let err = result.found().unwrap_err();
        assert_eq!(err.status_code(), Some(403));

        let result: Result<u32, ApiError> = Err(ApiError::Request("connection reset".into()));
        assert!(result.found().is_err());
    }
}
