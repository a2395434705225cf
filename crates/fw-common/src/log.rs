//! CSV log row schemas for the four stages of the logging pipeline
//! (kernel, classifier, merged, final) and the compiler's `--log-type`
//! selector.

use crate::Verdict;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects what the generated kernel ruleset logs on each matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogType {
    #[default]
    None,
    Csv,
    Pcap,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogType::None => "NONE",
            LogType::Csv => "CSV",
            LogType::Pcap => "PCAP",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LogType::None),
            "csv" => Ok(LogType::Csv),
            "pcap" => Ok(LogType::Pcap),
            other => Err(format!("unknown log type: {other}")),
        }
    }
}

/// Why a final-log row's expected verdict differs (or was confirmed) from
/// the actual verdict recorded by the classifier/kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    GroundTruth,
    Edited,
    Interaction,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::GroundTruth => "GROUND_TRUTH",
            Reason::Edited => "EDITED",
            Reason::Interaction => "INTERACTION",
        };
        f.write_str(s)
    }
}

/// A single row shared by the kernel log, the classifier log, and the
/// merged log: columns `id,hash,timestamp,policy,verdict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub id: u64,
    pub hash: String,
    pub timestamp: f64,
    /// Empty when the kernel emitted a bare default-drop with no
    /// interaction/policy name attached.
    #[serde(default)]
    pub policy: String,
    pub verdict: Verdict,
}

impl LogRow {
    /// A policy string with no `#` separator is the kernel's bare
    /// default-drop rule, carrying no interaction/policy name.
    pub fn is_default_drop(&self) -> bool {
        !self.policy.contains('#')
    }

    /// Splits `interaction#policy` into its two parts. `None` for a bare
    /// default-drop row.
    pub fn split_policy(&self) -> Option<(&str, &str)> {
        self.policy.split_once('#')
    }
}

/// A row in the final reconciled log: a [`LogRow`] plus the expected
/// verdict and the reason it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalLogRow {
    pub id: u64,
    pub hash: String,
    pub timestamp: f64,
    #[serde(default)]
    pub policy: String,
    /// The verdict actually produced by the kernel/classifier pipeline.
    pub actual_verdict: Verdict,
    pub expected_verdict: Verdict,
    pub reason: Reason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_drop_detection() {
        let row = LogRow {
            id: 1,
            hash: "abc".into(),
            timestamp: 0.0,
            policy: String::new(),
            verdict: Verdict::Drop,
        };
        assert!(row.is_default_drop());

        let row = LogRow {
            policy: "dns-then-https#p1".into(),
            ..row
        };
        assert!(!row.is_default_drop());
        assert_eq!(row.split_policy(), Some(("dns-then-https", "p1")));
    }

    #[test]
    fn log_type_round_trips_through_display() {
        for lt in [LogType::None, LogType::Csv, LogType::Pcap] {
            assert_eq!(lt.to_string().parse::<LogType>().unwrap(), lt);
        }
    }
}
