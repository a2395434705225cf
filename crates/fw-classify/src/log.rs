//! Appends one [`fw_common::log::LogRow`] per classified packet to a
//! single CSV file shared by every worker thread — spec §4.4's
//! "classifier log" side of the pipeline, joined against the kernel log
//! by `fw-verdict::merge`.
//!
//! One writer behind a `Mutex`, a narrow critical section per row: the
//! same shape `fw-classify::dns_map::DnsMap` uses for its shared state.

use crate::error::{ClassifyError, Result};
use fw_common::log::LogRow;
use fw_common::Verdict;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hex-encoded SHA-256 of the raw packet bytes, matching
/// `eval/latency/read_all.py::get_packet_hash`'s `hashlib.sha256(bytes(packet)).hexdigest()`
/// so a classifier-log row can be joined against the kernel log's hash
/// of the same packet.
pub fn packet_hash(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub struct PacketLog {
    writer: Mutex<csv::Writer<std::fs::File>>,
    next_id: AtomicU64,
}

impl PacketLog {
    /// Opens `path` for append, writing a header only if the file is new
    /// or empty (so `fw classify` can be restarted against an existing
    /// log without duplicating the header row).
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(ClassifyError::Log)?;
        let needs_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer
                .write_record(["id", "hash", "timestamp", "policy", "verdict"])
                .map_err(csv_io)?;
            writer.flush().map_err(ClassifyError::Log)?;
        }
        Ok(PacketLog {
            writer: Mutex::new(writer),
            next_id: AtomicU64::new(0),
        })
    }

    /// Appends one row. `hash` identifies the packet for the merge stage
    /// (spec §4.4: stable across the kernel and classifier logs for the
    /// same packet); `policy` is the already-joined `interaction#policy`
    /// string.
    pub fn record(&self, hash: String, policy: String, verdict: Verdict) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let row = LogRow {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            hash,
            timestamp,
            policy,
            verdict,
        };
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.serialize(&row).map_err(csv_io)?;
        writer.flush().map_err(ClassifyError::Log)
    }
}

fn csv_io(e: csv::Error) -> ClassifyError {
    ClassifyError::Log(std::io::Error::new(std::io::ErrorKind::Other, e))
}
