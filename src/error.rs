//! Domain-specific error types for the convergence engine.
//!
//! Internal modules return [`anyhow::Result`] whose root cause is one of the
//! typed errors below, so callers that need to branch on a failure kind can
//! use [`anyhow::Error::downcast_ref`]. Command handlers at the CLI boundary
//! just propagate with `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! EngineError
//! ├── MissingExecutable   — tool not on the search path
//! ├── CommandFailed       — external tool exited non-zero
//! ├── ChecksumMismatch    — downloaded artifact digest differs
//! ├── CheckoutConflict    — dotfile checkout collides with existing files
//! ├── UnsupportedUrl      — fetch refused a non-HTTPS URL
//! ├── Fetch               — transport or HTTP status failure
//! ├── Io                  — filesystem failure on a named path
//! └── UnknownAlgorithm    — unsupported digest name
//! ConfigError             — playbook loading and validation
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while probing, fetching, or installing.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The executable could not be found on the configured search path.
    #[error("executable not found: {program}")]
    MissingExecutable {
        /// Program name as requested.
        program: String,
    },

    /// An external command exited with a non-zero status.
    #[error("{program} failed (exit {}): {stderr}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        /// Program name as requested.
        program: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// A file's digest did not match the expected value.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        /// File that was hashed.
        path: PathBuf,
        /// Expected hex digest.
        expected: String,
        /// Computed hex digest.
        actual: String,
    },

    /// Checking out a dotfile module collided with files already in the work tree.
    #[error("checkout of dotfile module '{module}' conflicts with existing files")]
    CheckoutConflict {
        /// Module name.
        module: String,
    },

    /// The fetch layer only opens `https://` URLs.
    #[error("refusing to open '{url}': only https URLs are allowed")]
    UnsupportedUrl {
        /// Offending URL.
        url: String,
    },

    /// The request could not be completed or returned an error status.
    #[error("fetching {url} failed: {reason}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Transport or status description.
        reason: String,
    },

    /// Filesystem operation failed on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Digest algorithm name not recognised.
    #[error("unknown hash algorithm '{0}': expected one of sha224, sha256, sha384, sha512")]
    UnknownAlgorithm(String),
}

impl EngineError {
    /// Attach a path to an [`std::io::Error`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that arise while loading a playbook.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The playbook file could not be read.
    #[error("cannot read playbook {}: {source}", .path.display())]
    Read {
        /// Path to the playbook.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The playbook is not valid TOML or does not match the schema.
    #[error("invalid playbook {}: {message}", .path.display())]
    Parse {
        /// Path to the playbook.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A step references a value that fails validation.
    #[error("step {index} ({kind}): {message}")]
    InvalidStep {
        /// Zero-based index in the `[[step]]` array.
        index: usize,
        /// Step kind.
        kind: String,
        /// What is wrong with it.
        message: String,
    },

    /// The home directory could not be determined.
    #[error("HOME environment variable is not set; pass --home")]
    NoHome,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn missing_executable_display() {
        let e = EngineError::MissingExecutable {
            program: "volta".to_string(),
        };
        assert_eq!(e.to_string(), "executable not found: volta");
    }

    #[test]
    fn command_failed_display_with_code() {
        let e = EngineError::CommandFailed {
            program: "dnf".to_string(),
            code: Some(1),
            stderr: "No match for argument: nosuchpkg".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "dnf failed (exit 1): No match for argument: nosuchpkg"
        );
    }

    #[test]
    fn command_failed_display_without_code() {
        let e = EngineError::CommandFailed {
            program: "git".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(e.to_string(), "git failed (exit signal): ");
    }

    #[test]
    fn checksum_mismatch_display() {
        let e = EngineError::ChecksumMismatch {
            path: PathBuf::from("/tmp/go.tar.gz"),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "checksum mismatch for /tmp/go.tar.gz: expected abc, got def"
        );
    }

    #[test]
    fn checkout_conflict_names_module() {
        let e = EngineError::CheckoutConflict {
            module: "base".to_string(),
        };
        assert!(e.to_string().contains("'base'"));
    }

    #[test]
    fn unsupported_url_display() {
        let e = EngineError::UnsupportedUrl {
            url: "ftp://example.com/x".to_string(),
        };
        assert!(e.to_string().contains("only https"));
    }

    #[test]
    fn io_has_source() {
        use std::error::Error as StdError;
        let e = EngineError::io("/nope", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/nope"));
    }

    #[test]
    fn config_error_invalid_step_display() {
        let e = ConfigError::InvalidStep {
            index: 2,
            kind: "dotfiles".to_string(),
            message: "module name is empty".to_string(),
        };
        assert_eq!(e.to_string(), "step 2 (dotfiles): module name is empty");
    }

    #[test]
    fn engine_error_survives_anyhow_round_trip() {
        let err: anyhow::Error = EngineError::MissingExecutable {
            program: "fc-list".to_string(),
        }
        .into();
        let err = err.context("probing fonts");
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::MissingExecutable { .. })
        ));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<EngineError>();
        assert_send_sync::<ConfigError>();
    }
}
