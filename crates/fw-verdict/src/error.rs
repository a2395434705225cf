use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("cannot read log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("profile error: {0}")]
    Profile(#[from] fw_profile::ProfileError),
}

pub type Result<T> = std::result::Result<T, VerdictError>;
