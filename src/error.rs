pub type StencilResult<T> = std::result::Result<T, StencilError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    UnclosedTag {
        /// The closing delimiter that was expected, e.g. "}}"
        expected: String,
    },
    EmptyTag,
    InvalidPath {
        name: String,
    },
    InvalidDelimiters {
        content: String,
    },
    UnexpectedSectionClose {
        name: String,
    },
    MismatchedSectionClose {
        expected: String,
        found: String,
    },
    UnclosedSection {
        name: String,
    },
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnclosedTag { expected } => {
                write!(f, "Tag opened but never closed (expected '{}')", expected)
            }
            Self::EmptyTag => {
                write!(f, "Tag has no name")
            }
            Self::InvalidPath { name } => {
                write!(f, "Invalid dotted name '{}'", name)
            }
            Self::InvalidDelimiters { content } => {
                write!(f, "Malformed delimiter change '{}'", content)
            }
            Self::UnexpectedSectionClose { name } => {
                write!(
                    f,
                    "Closing tag for section '{}' which was never opened",
                    name
                )
            }
            Self::MismatchedSectionClose { expected, found } => {
                write!(
                    f,
                    "Section '{}' closed by mismatched tag '{}'",
                    expected, found
                )
            }
            Self::UnclosedSection { name } => {
                write!(f, "Section '{}' opened but never closed", name)
            }
        }
    }
}

impl std::error::Error for SyntaxErrorKind {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub kind: SyntaxErrorKind,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Syntax error at line {}, column {}: {}",
            self.line, self.column, self.kind
        )
    }
}

impl std::error::Error for SyntaxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StencilError {
    Syntax(SyntaxError),
    MissingTemplate {
        template_name: String,
    },
    /// Engine misconfiguration, e.g. mutating a fixed partials collection.
    Config {
        message: String,
    },
    /// Artifact persistence failure. Never silently degraded to uncached
    /// operation; the caller decides what to do.
    Cache {
        message: String,
    },
    /// Runtime-only rendering failure. The compiled artifact itself is
    /// still valid; only this particular render triggered the condition.
    Render {
        message: String,
    },
}

impl std::fmt::Display for StencilError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(syntax_error) => {
                write!(f, "{}", syntax_error)
            }
            Self::MissingTemplate { template_name } => {
                write!(f, "Template not found: {}", template_name)
            }
            Self::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Cache { message } => {
                write!(f, "Cache error: {}", message)
            }
            Self::Render { message } => {
                write!(f, "Rendering error: {}", message)
            }
        }
    }
}

impl std::error::Error for StencilError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(syntax_error) => Some(syntax_error),
            Self::MissingTemplate { .. }
            | Self::Config { .. }
            | Self::Cache { .. }
            | Self::Render { .. } => None,
        }
    }
}

impl From<SyntaxError> for StencilError {
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}
