use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, expanding or parsing a device profile.
///
/// All of these are fatal at load time (spec §7 `ConfigError`), except
/// [`ProfileError::UnsupportedProtocol`] which is a per-clause warning the
/// caller may downgrade; the loader never returns it on its own, but
/// [`crate::policy::Policy::parse_protocols`] surfaces it for the caller
/// to log and continue.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot read profile file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("profile {path} is missing required `device-info` block")]
    MissingDeviceInfo { path: PathBuf },

    #[error("include directive {directive:?} in {path} could not be resolved: {reason}")]
    UnresolvedInclude {
        path: PathBuf,
        directive: String,
        reason: String,
    },

    #[error("unknown field {field:?} on protocol {protocol:?}")]
    UnknownField { protocol: String, field: String },

    #[error("`self` used for {protocol} but the device has no address of that kind")]
    MissingSelfAddress { protocol: String },

    #[error("unknown address alias or malformed address/CIDR: {0:?}")]
    UnknownAddress(String),

    #[error("malformed duration literal {0:?}")]
    BadDuration(String),

    #[error("malformed rate literal {0:?}")]
    BadRate(String),

    #[error("malformed packet-size literal {0:?}")]
    BadPacketSize(String),

    #[error("conflicting statistics on policy {policy:?}: {reason}")]
    ConflictingStats { policy: String, reason: String },

    #[error("unsupported wildcard domain form {0:?} (only a leading `$` suffix match is defined)")]
    UnsupportedWildcard(String),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

/// A clause named a protocol with no registered parser. Not fatal: the
/// clause is skipped and the policy proceeds with its remaining clauses
/// (spec §7 `UnsupportedProtocol`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedProtocol(pub String);

impl std::fmt::Display for UnsupportedProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported protocol: {}", self.0)
    }
}
