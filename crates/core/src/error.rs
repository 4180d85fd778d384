use serde::Serialize;

/// A structural irregularity the parser recovered from. Anomalies never
/// abort a parse; `index` is the position in the token stream where the
/// parser noticed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseAnomaly {
    /// `}` with no matching `{`.
    UnmatchedCloseBrace { index: usize },
    /// `key =` followed by `}` or end of input.
    MissingValue { key: String, index: usize },
    /// `=` or `{` where a key was expected.
    UnexpectedToken { index: usize },
    /// End of input inside a block.
    UnclosedBlock { index: usize },
    /// A block opened past the nesting limit. Its contents are skipped.
    NestingTooDeep { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected '{{' at token {index}")]
    ExpectedOpenBrace { index: usize },
}

/// Failure to find a declaration in raw source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("no top-level declaration of '{name}'")]
    NotFound { name: String },
    /// The opening pattern matched but braces never balanced.
    #[error("declaration of '{name}' is never closed")]
    Unterminated { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    #[error("subject '{subject}' has neither lifecycle hook block")]
    NoHooks { subject: String },
    #[error(transparent)]
    Locate(#[from] LocateError),
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("cannot read policy '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy: {0}")]
    Decode(#[from] toml::de::Error),
}
