//! Error kinds of an inventory run.
//!
//! Only [`InventoryError`] ever reaches the binary. Everything else is
//! reported as a log line at the component that detects it.

use std::path::PathBuf;

use thiserror::Error;

/// A proxy destination that could not be turned into a [`crate::proxy::target::Target`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetParseError {
    #[error("empty target")]
    Empty,
    #[error("'{0}' uses a variable and cannot be resolved statically")]
    Variable(String),
    #[error("unsupported scheme '{scheme}' in '{raw}'")]
    UnsupportedScheme { scheme: String, raw: String },
    #[error("missing host in '{0}'")]
    MissingHost(String),
    #[error("missing port in '{0}' and scheme has no default")]
    MissingPort(String),
    #[error("invalid port '{port}' in '{raw}'")]
    InvalidPort { port: String, raw: String },
    #[error("missing socket path in '{0}'")]
    MissingSocketPath(String),
}

/// A directive that was skipped during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("'{directive}' is missing its argument")]
    MissingArgument { directive: String },
    #[error("'{directive}' has an unusable target: {source}")]
    InvalidTarget {
        directive: String,
        #[source]
        source: TargetParseError,
    },
}

/// Failures that abort the run.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("no Nginx or Apache configuration directory is accessible (searched: {})", display_paths(.searched))]
    NoConfigAccessible { searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
