//! One function per subcommand, each returning the process exit code
//! to use on success — matching `assay-cli::cli::commands::dispatch`'s
//! per-command `Result<i32>` shape.

use crate::cli::{ClassifyArgs, MergeArgs, ReconcileArgs, TranslateArgs};
use anyhow::Context;
use fw_common::exit_codes;
use fw_compile::classifier_config::ClassifierConfig;
use fw_profile::Profile;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub fn translate(args: TranslateArgs) -> anyhow::Result<i32> {
    let (profile, unsupported) = Profile::load(&args.profile_path)
        .with_context(|| format!("loading profile {}", args.profile_path.display()))?;
    for protocol in &unsupported {
        warn!(protocol = %protocol.0, "clause names an unregistered protocol, skipped");
    }

    let log_group = args.log_group.unwrap_or(100);
    let output = fw_compile::compile(
        &profile,
        &args.table,
        &args.chain,
        args.log_type.into(),
        log_group,
    )
    .context("compiling profile")?;

    info!(
        queues = output.config.queues.len(),
        device = %profile.device.name,
        "compiled profile"
    );

    if args.test {
        info!("--test given, not writing any output files");
        return Ok(exit_codes::SUCCESS);
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating output directory {}", args.out_dir.display()))?;
    let ruleset_path = args.out_dir.join("ruleset.nft");
    std::fs::write(&ruleset_path, &output.ruleset)
        .with_context(|| format!("writing ruleset to {}", ruleset_path.display()))?;

    let config_path = args.out_dir.join("classifier_config.json");
    output
        .config
        .write_to(&config_path)
        .context("writing classifier configuration")?;

    info!(
        ruleset = %ruleset_path.display(),
        config = %config_path.display(),
        "wrote compiled output"
    );
    Ok(exit_codes::SUCCESS)
}

pub fn classify(args: ClassifyArgs) -> anyhow::Result<i32> {
    let config = ClassifierConfig::read_from(&args.config_path)
        .with_context(|| format!("loading classifier config {}", args.config_path.display()))?;
    info!(device = %config.device_name, queues = config.queues.len(), "starting classifier");

    // Cleared by whatever supervises this process (spec §5: a cooperative
    // flag checked between blocking reads, not a forced thread-kill).
    let shutdown = Arc::new(AtomicBool::new(false));

    match fw_classify::run(config, args.log_dir.as_deref(), shutdown) {
        Ok(_metrics) => {
            info!("classifier exited cleanly");
            Ok(exit_codes::SUCCESS)
        }
        Err(fw_classify::error::ClassifyError::NotSupported) => {
            eprintln!("fatal: the classifier runtime requires Linux NFQUEUE support");
            Ok(exit_codes::RUNTIME_ERROR)
        }
        Err(e) => Err(anyhow::Error::new(e).context("classifier runtime failed")),
    }
}

pub fn merge(args: MergeArgs) -> anyhow::Result<i32> {
    fw_verdict::merge::merge_files(&args.kernel_log, &args.classifier_log, &args.out_log)
        .context("merging kernel and classifier logs")?;
    info!(out = %args.out_log.display(), "wrote merged log");
    Ok(exit_codes::SUCCESS)
}

pub fn reconcile(args: ReconcileArgs) -> anyhow::Result<i32> {
    fw_verdict::link::link_files(
        &args.merged_log,
        &args.edit_log,
        &args.profile_path,
        &args.ground_truth_log,
        &args.out_log,
    )
    .context("linking merged log to interactions")?;
    info!(out = %args.out_log.display(), "wrote final reconciled log");
    Ok(exit_codes::SUCCESS)
}
