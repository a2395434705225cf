//! Userspace classifier: one worker thread per NFQUEUE, evaluating the
//! stateful predicates, rate limits and DNS bindings a profile's
//! `fw-compile` pass couldn't resolve purely in the kernel (spec §4.4).

pub mod dns_map;
pub mod error;
pub mod log;
pub mod packet;
pub mod state;
pub mod token_bucket;
#[cfg(target_os = "linux")]
pub mod worker;

use error::Result;
use fw_common::metrics::QueueMetrics;
use fw_compile::classifier_config::ClassifierConfig;
use log::PacketLog;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Spawns one worker thread per queue in `config`, sharing a single DNS
/// map and metrics registry, and blocks until every worker exits (either
/// on error or because `shutdown` was set). `log_dir`, if given, causes
/// every classified packet to be appended to `<log_dir>/classifier.csv`
/// (spec §4.4). NFQUEUE is Linux-only; non-Linux builds compile this
/// entry point but return [`error::ClassifyError::NotSupported`],
/// mirroring `assay-monitor::Monitor`'s stub-vs-linux split.
#[cfg(target_os = "linux")]
pub fn run(
    config: ClassifierConfig,
    log_dir: Option<&Path>,
    shutdown: Arc<AtomicBool>,
) -> Result<Arc<QueueMetrics>> {
    use dns_map::DnsMap;
    use state::InteractionState;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use worker::Worker;

    let dns_map = Arc::new(Mutex::new(DnsMap::new()));
    let metrics = Arc::new(QueueMetrics::new());
    let packet_log = log_dir
        .map(|dir| PacketLog::open(&dir.join("classifier.csv")).map(Arc::new))
        .transpose()?;

    // Every forward step of a given interaction shares one state machine
    // (current_step walks the interaction's sequence); a backward step
    // advances the same machine without rebinding its cached address.
    // Single policies get a private one-step machine each, keyed
    // separately so two single policies never collide on "single".
    let mut forward_step_counts: HashMap<String, usize> = HashMap::new();
    for entry in &config.queues {
        if entry.interaction_name != "single" && !entry.is_backward {
            *forward_step_counts
                .entry(entry.interaction_name.clone())
                .or_insert(0) += 1;
        }
    }

    let mut interaction_states: HashMap<String, Arc<Mutex<InteractionState>>> = HashMap::new();
    let mut handles = Vec::new();

    for entry in config.queues {
        let key = if entry.interaction_name == "single" {
            format!("single#{}", entry.policy_name)
        } else {
            entry.interaction_name.clone()
        };
        let total_steps = forward_step_counts.get(&key).copied().unwrap_or(1).max(1);
        let state = interaction_states
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(InteractionState::new(total_steps))))
            .clone();
        let worker = Worker::new(
            entry,
            Arc::clone(&dns_map),
            Some(state),
            Arc::clone(&metrics),
            packet_log.clone(),
            Arc::clone(&shutdown),
        );
        handles.push(std::thread::spawn(move || worker.run()));
    }

    for handle in handles {
        handle
            .join()
            .expect("worker thread panicked")?;
    }

    Ok(metrics)
}

#[cfg(not(target_os = "linux"))]
pub fn run(
    _config: ClassifierConfig,
    _log_dir: Option<&Path>,
    _shutdown: Arc<AtomicBool>,
) -> Result<Arc<QueueMetrics>> {
    Err(error::ClassifyError::NotSupported)
}
