use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("profile error: {0}")]
    Profile(#[from] fw_profile::ProfileError),

    #[error("cannot write ruleset to {path}: {source}")]
    WriteRuleset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot access classifier configuration at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed classifier configuration at {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("queue numbering overflowed u16 after {count} interactions")]
    QueueNumberingOverflow { count: usize },
}

pub type Result<T> = std::result::Result<T, CompileError>;
