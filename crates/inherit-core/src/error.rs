use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for tooling that wraps the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingExtractor,
    ConflictingExtractors,
    InvalidPattern,
    ConfigParseError,
    RecordReadFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingExtractor => "E1001",
            Self::ConflictingExtractors => "E1002",
            Self::InvalidPattern => "E1003",
            Self::ConfigParseError => "E1005",
            Self::RecordReadFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingExtractor => "No dependency extractor configured",
            Self::ConflictingExtractors => "More than one dependency extractor configured",
            Self::InvalidPattern => "Extraction pattern does not compile",
            Self::ConfigParseError => "Config file parse error",
            Self::RecordReadFailed => "Record could not be read",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingExtractor => {
                Some("Set `pattern` in .inherit.toml or pass --pattern / an extractor function.")
            }
            Self::ConflictingExtractors => Some("Configure either a pattern or a function, not both."),
            Self::InvalidPattern => Some("Check the regular expression syntax."),
            Self::ConfigParseError => Some("Fix syntax in .inherit.toml and retry."),
            Self::RecordReadFailed => Some("Check that the file exists and is readable."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by engine construction and record loading.
///
/// Once an [`Engine`](crate::Engine) is built, integration and emission never
/// fail; every variant here happens before the first record is processed.
#[derive(Debug, thiserror::Error)]
pub enum InheritError {
    #[error("needs either a regular expression or an extractor function")]
    MissingExtractor,

    #[error("both a pattern and an extractor function were configured")]
    ConflictingExtractors,

    #[error("invalid extraction pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InheritError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingExtractor => ErrorCode::MissingExtractor,
            Self::ConflictingExtractors => ErrorCode::ConflictingExtractors,
            Self::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::Read { .. } => ErrorCode::RecordReadFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, InheritError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::MissingExtractor,
            ErrorCode::ConflictingExtractors,
            ErrorCode::InvalidPattern,
            ErrorCode::ConfigParseError,
            ErrorCode::RecordReadFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::ConfigParseError.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn missing_extractor_mentions_both_forms() {
        let err = InheritError::MissingExtractor;
        let text = err.to_string();
        assert!(text.contains("regular expression"));
        assert!(text.contains("function"));
        assert_eq!(err.code(), ErrorCode::MissingExtractor);
        assert!(err.hint().is_some());
    }
}
