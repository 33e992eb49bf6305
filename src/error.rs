//! Error types for template registration, loading, and rendering.
//!
//! Two error types split along the same line as the API surface:
//! [`RenderError`] for per-template operations (add, render) and
//! [`LoadError`] for directory scans. Engine errors are flattened into
//! stable variants so the underlying template engine stays an
//! implementation detail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from registering or rendering templates.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template source failed to parse at registration time.
    ///
    /// The offending `add_view`/`add_partial` call is rejected; entries
    /// registered earlier are unaffected.
    #[error("template \"{name}\" failed to parse: {message}")]
    Parse {
        /// Name the source was being registered under
        name: String,
        /// Parser diagnostic from the engine
        message: String,
    },

    /// Render requested for a view name that was never registered.
    #[error("view not found: \"{0}\"")]
    ViewNotFound(String),

    /// The engine failed while executing a template.
    ///
    /// Covers missing fields in the supplied data, references to functions
    /// or sub-templates the view was compiled without, and type mismatches.
    /// For streaming renders, bytes written before the failure stay written.
    #[error("error executing template \"{name}\": {message}")]
    Execution {
        /// The entry-point template that was executing
        name: String,
        /// Engine diagnostic
        message: String,
    },

    /// Caller-supplied data could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RenderError {
    pub(crate) fn parse(name: &str, err: minijinja::Error) -> Self {
        RenderError::Parse {
            name: name.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn execution(name: &str, err: minijinja::Error) -> Self {
        RenderError::Execution {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

/// Errors from scanning a template directory.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The walk finished without discovering a single view source.
    ///
    /// Usually means the directory layout is missing a `view/` or `views/`
    /// segment, or the extension allow-list filtered everything out.
    #[error("no view templates found under {}", root.display())]
    NoViews {
        /// Root directory that was scanned
        root: PathBuf,
    },

    /// The walk finished without discovering a single partial source.
    ///
    /// Reported separately from [`LoadError::NoViews`] so callers can tell
    /// which half of the directory convention was not followed.
    #[error("no partial templates found under {}", root.display())]
    NoPartials {
        /// Root directory that was scanned
        root: PathBuf,
    },

    /// A discovered file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The directory traversal itself failed.
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// A discovered source failed to register (e.g. a parse error).
    #[error(transparent)]
    Render(#[from] RenderError),
}
