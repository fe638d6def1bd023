//! Warning types for non-fatal errors during JSONL processing.

/// A non-fatal problem found while reading JSONL data.
///
/// The offending line is skipped and reading continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A line contained malformed JSON (or JSON of the wrong shape).
    MalformedJson {
        /// The 1-based line number where the error occurred.
        line_number: usize,
        /// A description of the parsing error.
        error: String,
    },

    /// A line was skipped for a reason other than malformed JSON.
    SkippedLine {
        /// The 1-based line number that was skipped.
        line_number: usize,
        /// The reason the line was skipped.
        reason: String,
    },
}

impl Warning {
    /// Returns the line number associated with this warning.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedJson { line_number, .. } | Self::SkippedLine { line_number, .. } => {
                *line_number
            }
        }
    }

    /// Returns a static string identifying the warning kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedJson { .. } => "malformed_json",
            Self::SkippedLine { .. } => "skipped_line",
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed JSON: {error}")
            }
            Self::SkippedLine {
                line_number,
                reason,
            } => write!(f, "line {line_number}: skipped: {reason}"),
        }
    }
}

impl std::error::Error for Warning {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line_and_cause() {
        let warning = Warning::MalformedJson {
            line_number: 5,
            error: "unexpected end of input".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "line 5: malformed JSON: unexpected end of input"
        );
        assert_eq!(warning.kind(), "malformed_json");
    }

    #[test]
    fn skipped_line_reports_number() {
        let warning = Warning::SkippedLine {
            line_number: 9,
            reason: "duplicate".to_string(),
        };
        assert_eq!(warning.line_number(), 9);
        assert_eq!(warning.kind(), "skipped_line");
    }
}
