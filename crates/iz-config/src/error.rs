//! Error types for configuration, session and resolution operations.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for the identity and configuration layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field could not be resolved from any source.
    #[error("no {field} available: {hint}")]
    Unresolved {
        /// Field that is missing (e.g. `base URL`, `tenant`).
        field: &'static str,
        /// Concrete way for the user to supply the field.
        hint: String,
    },
    /// Neither a JWT nor a personal access token pair was resolved.
    #[error(
        "admin authentication required: run 'iz login', pass --jwt-token, or pass --personal-access-token with --personal-access-token-username"
    )]
    MissingAdminAuth,
    /// Key is not a recognised global setting.
    #[error("unknown configuration key '{key}' (valid keys: {valid})")]
    UnknownKey {
        /// Key supplied by the caller.
        key: String,
        /// Comma separated list of accepted keys.
        valid: String,
    },
    /// Key belongs to a profile rather than to the global settings.
    #[error("'{key}' is a profile setting; use 'iz profiles set {key} <value>' instead")]
    ProfileScopedKey {
        /// Key supplied by the caller.
        key: String,
    },
    /// Key is a global setting but was used with a profile command.
    #[error("'{key}' is a global setting; use 'iz config set {key} <value>' instead")]
    GlobalScopedKey {
        /// Key supplied by the caller.
        key: String,
    },
    /// Value rejected for a known key.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        /// Key being assigned.
        key: String,
        /// Offending value.
        value: String,
        /// Human-readable reason.
        reason: String,
    },
    /// Aggregate validation failure listing every violation.
    #[error("configuration is invalid:\n{}", render_violations(.violations))]
    Invalid {
        /// All violations found in the document.
        violations: Vec<Violation>,
    },
    /// Referenced profile does not exist.
    #[error("profile '{name}' not found (see 'iz profiles list')")]
    ProfileNotFound {
        /// Requested profile name.
        name: String,
    },
    /// Profile with the same name already exists.
    #[error("profile '{name}' already exists")]
    ProfileExists {
        /// Conflicting profile name.
        name: String,
    },
    /// Referenced session does not exist.
    #[error("session '{name}' not found (see 'iz sessions list')")]
    SessionNotFound {
        /// Requested session name.
        name: String,
    },
    /// Document already exists where a new one was requested.
    #[error("configuration file already exists at {}", .path.display())]
    AlreadyExists {
        /// Existing document path.
        path: PathBuf,
    },
    /// A per-user directory could not be determined.
    #[error("could not determine the {kind} directory")]
    NoDirectory {
        /// Directory kind (`config`, `home`).
        kind: &'static str,
    },
    /// Filesystem operation failed.
    #[error("failed to {operation} {}: {source}", .path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Document could not be parsed.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Path of the malformed document.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// Document could not be serialised.
    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error stems from user input or missing configuration rather
    /// than from an operational failure such as IO.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::Io { .. } | Self::Parse { .. } | Self::Serialize { .. } | Self::NoDirectory { .. }
        )
    }
}

/// Single validation failure found in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Key or path of the offending entry.
    pub key: String,
    /// Offending value as written in the document.
    pub value: String,
    /// Why the value is rejected.
    pub reason: String,
}

impl Display for Violation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} = '{}': {}", self.key, self.value, self.reason)
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
