use thiserror::Error;

/// Errors that abort a run before any row is processed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { column: String, table: String },

    #[error("cannot read table '{path}': {reason}")]
    InputUnreadable { path: String, reason: String },

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("cannot write '{path}': {reason}")]
    OutputUnwritable { path: String, reason: String },
}

impl ConfigurationError {
    pub fn invalid_setting(name: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidSetting {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a single GET did not produce a usable body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("failed to fetch: {0}")]
    Network(String),
}

impl FetchFailure {
    /// The HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::Http { status } => Some(*status),
            FetchFailure::Network(_) => None,
        }
    }
}

/// Outcome of one fetch: the body text of an HTTP 200, or a classified failure.
pub type FetchResult = Result<String, FetchFailure>;

/// Errors confined to one input row. The driver turns each into a skip.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error("expected 1 '{selector}' element, found {found}")]
    Mismatch { selector: String, found: usize },

    #[error("{reason}")]
    Unresolved { key: String, reason: String },
}

impl RowError {
    pub fn mismatch(selector: &str, found: usize) -> Self {
        RowError::Mismatch {
            selector: selector.to_string(),
            found,
        }
    }

    pub fn unresolved(key: &str, reason: impl Into<String>) -> Self {
        RowError::Unresolved {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = RowError::mismatch("nav#left-navigation", 0);
        assert_eq!(err.to_string(), "expected 1 'nav#left-navigation' element, found 0");

        let err = RowError::from(FetchFailure::Http { status: 404 });
        assert_eq!(err.to_string(), "HTTP 404");

        // The failure log already leads with the key.
        let err = RowError::unresolved("jdoe", "has no profile page");
        assert_eq!(err.to_string(), "has no profile page");

        let err = ConfigurationError::ColumnNotFound {
            column: "URL".into(),
            table: "input.csv".into(),
        };
        assert_eq!(err.to_string(), "column 'URL' not found in table 'input.csv'");
    }

    #[test]
    fn test_fetch_failure_status() {
        assert_eq!(FetchFailure::Http { status: 500 }.status(), Some(500));
        assert_eq!(FetchFailure::Network("timed out".into()).status(), None);
    }
}
