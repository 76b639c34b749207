//! CLI error types with exit code handling
//!
//! Every failure surfaced to the user goes through [`CliError`], which knows
//! the exit code it maps to.

use miette::Diagnostic;
use thiserror::Error;

use kubechart_convert::ConvertError;
use kubechart_core::CoreError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Manifests could not be found or read
    #[error("Input error: {message}")]
    #[diagnostic(code(kubechart::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// An object could not be converted and the run stopped
    #[error("Conversion failed: {message}")]
    #[diagnostic(
        code(kubechart::cli::conversion),
        help("re-run with --keep-going to convert the remaining objects")
    )]
    Conversion { message: String },

    /// Some objects failed while the run kept going
    #[error("{failed} object(s) could not be converted")]
    #[diagnostic(code(kubechart::cli::partial))]
    Partial { failed: usize },

    /// Filesystem problem while writing the chart
    #[error("IO error: {message}")]
    #[diagnostic(code(kubechart::cli::io))]
    Io {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid arguments
    #[error("{message}")]
    #[diagnostic(code(kubechart::cli::usage))]
    Usage { message: String },

    /// Internal error (unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(kubechart::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Conversion { .. } => exit_codes::CONVERSION_ERROR,
            CliError::Partial { .. } => exit_codes::PARTIAL_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn partial(failed: usize) -> Self {
        Self::Partial { failed }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let help = match &err {
            CoreError::InputNotFound(_) => Some("pass an existing manifest file or directory to --from".to_string()),
            CoreError::MalformedDocument { .. } => {
                Some("every document needs `kind` and `metadata.name`".to_string())
            }
            _ => None,
        };
        CliError::Input {
            message: err.to_string(),
            help,
        }
    }
}

impl From<ConvertError> for CliError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Core(core) => core.into(),
            ConvertError::Io(io) => io.into(),
            ConvertError::OutputNotDirectory(ref path) => CliError::Io {
                message: err.to_string(),
                help: Some(format!(
                    "remove {} or choose another --output directory",
                    path.display()
                )),
            },
            err if err.is_per_object() => CliError::Conversion {
                message: err.to_string(),
            },
            err => CliError::Internal {
                message: err.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
            help: None,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes() {
        let missing: CliError = CoreError::InputNotFound(PathBuf::from("nope")).into();
        assert_eq!(missing.exit_code(), exit_codes::INPUT_ERROR);

        let anchor: CliError = ConvertError::MissingAnchor {
            anchor: "volumes".into(),
        }
        .into();
        assert_eq!(anchor.exit_code(), exit_codes::CONVERSION_ERROR);

        let file: CliError = ConvertError::OutputNotDirectory(PathBuf::from("out/shop")).into();
        assert_eq!(file.exit_code(), exit_codes::IO_ERROR);

        assert_eq!(CliError::partial(2).exit_code(), exit_codes::PARTIAL_ERROR);
        assert_eq!(CliError::usage("bad").exit_code(), exit_codes::USAGE_ERROR);
    }
}
