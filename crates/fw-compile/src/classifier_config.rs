//! The classifier configuration artifact: a serializable description of
//! every NFQUEUE the ruleset installs and what `fw-classify` must check
//! for packets arriving on it. Replaces the original's Jinja2-templated
//! C code generation (`original_source/src/translator/NFQueue.py`'s
//! `render` step) with a data file the classifier loads at startup —
//! spec §9 REDESIGN FLAG.

use crate::error::{CompileError, Result};
use fw_common::Verdict;
use fw_profile::protocols::StatefulPredicate;
use fw_profile::stats::{DirectionalCounter, PacketSize, Rate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One queue's worth of classifier work: the predicates that must all
/// hold for the packet to be accepted, plus the statistics that gate or
/// count it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub queue_id: i32,
    /// `"single"` for a standalone policy, or the owning interaction's
    /// name — joined with `policy_name` by `fw-classify` to produce the
    /// same `interaction#policy` strings `fw-verdict` expects in a log.
    pub interaction_name: String,
    pub policy_name: String,
    pub is_transient: bool,
    pub is_periodic: bool,
    pub is_backward: bool,
    pub predicates: Vec<StatefulPredicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_size: Option<PacketSize>,
    #[serde(default, skip_serializing_if = "DirectionalCounter::is_empty")]
    pub packet_count: DirectionalCounter,
    #[serde(default, skip_serializing_if = "DirectionalCounter::is_empty")]
    pub duration_micros: DirectionalCounter,
    /// Verdict to apply once every predicate and statistic has been
    /// satisfied (always `Accept` for a compiled profile clause; a
    /// profile never authors an explicit drop, the default drop at the
    /// end of the chain covers everything unmatched).
    pub on_match: Verdict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub device_name: String,
    pub queues: Vec<QueueEntry>,
}

impl ClassifierConfig {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|source| CompileError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self).map_err(|source| CompileError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| CompileError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(file).map_err(|source| CompileError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })
    }
}
