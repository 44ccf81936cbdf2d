use std::fmt;

/// Machine-readable error codes for fatal planner failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputReadFailed,
    DependencyListingMalformed,
    MissingEarlyRequirement,
    OutputWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputReadFailed => "E1002",
            Self::DependencyListingMalformed => "E2001",
            Self::MissingEarlyRequirement => "E3001",
            Self::OutputWriteFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputReadFailed => "Input file could not be read",
            Self::DependencyListingMalformed => "Malformed dependency listing",
            Self::MissingEarlyRequirement => "Early-stage module has dependencies outside the early stage",
            Self::OutputWriteFailed => "Output file write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix the syntax of the --config file and retry."),
            Self::InputReadFailed => None,
            Self::DependencyListingMalformed => {
                Some("Every line must look like `path/to/mod.ko: dep1.ko dep2.ko`.")
            }
            Self::MissingEarlyRequirement => {
                Some("Move the listed modules into the early-stage module list.")
            }
            Self::OutputWriteFailed => Some("Check that the output directory exists and is writable."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while parsing the text inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A dependency listing line has no `:` separator.
    #[error("line {line}: expected `module:deps`, got {content:?}")]
    MissingColon { line: usize, content: String },
    /// A device-link line has no ` --> ` separator.
    #[error("line {line}: expected `supplier --> consumer`, got {content:?}")]
    MissingArrow { line: usize, content: String },
}

impl ParseError {
    /// Machine-readable code associated with this parse error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DependencyListingMalformed
    }
}

/// Fatal errors from stage planning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// An early-stage module depends on modules that are not themselves
    /// designated early-stage.
    #[error("\"{target}\" requires {} module(s) outside the early stage: {}", missing.len(), missing.join(", "))]
    MissingRequirements {
        /// Name of the early-stage module whose closure is incomplete.
        target: String,
        /// Names of the offending dependencies, dependencies-first.
        missing: Vec<String>,
    },
}

impl PlanError {
    /// Machine-readable code associated with this planning error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingRequirements { .. } => ErrorCode::MissingEarlyRequirement,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
