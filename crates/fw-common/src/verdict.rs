use serde::{Deserialize, Serialize};
use std::fmt;

/// A firewall verdict, shared by the kernel ruleset text, the classifier,
/// and every stage of the CSV log pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Drop,
    /// Kernel-log-only: the decision was deferred to userspace.
    Queue,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Drop => "DROP",
            Verdict::Queue => "QUEUE",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Verdict {
    type Err = ParseVerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCEPT" => Ok(Verdict::Accept),
            "DROP" => Ok(Verdict::Drop),
            "QUEUE" => Ok(Verdict::Queue),
            other => Err(ParseVerdictError(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized verdict string: {0:?}")]
pub struct ParseVerdictError(String);
