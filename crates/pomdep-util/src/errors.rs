use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all pomdep operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PomdepError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed POM or metadata document.
    #[error("XML parse error: {message}")]
    #[diagnostic(help("The document is not a well-formed Maven descriptor"))]
    Xml { message: String },

    /// Dependency resolution failed (missing versions, bad scopes, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Two coordinates of the same name whose versions cannot be reconciled.
    #[error("Unresolvable version conflict: '{first}' vs '{second}'")]
    #[diagnostic(help(
        "Neither version satisfies the other's range; pin one of them explicitly"
    ))]
    Conflict { first: String, second: String },

    /// Network request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PomdepResult<T> = miette::Result<T>;
