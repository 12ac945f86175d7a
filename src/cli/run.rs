//! The fleet run: load, scan, report, alert.

use crate::cli::Cli;
use crate::config::{FleetConfig, Paths, TelegramConfig};
use crate::fleet::{FleetScheduler, FleetSummary, HostSpec, HostWorker, ThreadBudget};
use crate::notify::{Notifier, TelegramNotifier};
use crate::output::{self, OutputFormat};
use crate::report::{ResultAggregator, RunSummary};
use crate::types::DnsResolver;
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::{self, Write};
use tracing::{debug, info};

/// Run the whole fleet once.
///
/// Configuration problems abort before any host is scanned. Warnings do
/// not make the run fail; an undeliverable alert does.
pub async fn execute(cli: &Cli) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Paths::new()?.default_config_file(),
    };
    debug!("loading configuration from {}", path.display());

    let config = FleetConfig::load(&path)?;
    config.validate(!cli.no_telegram)?;
    let specs = config.host_specs(&cli.scan_defaults())?;

    let notifier = match (&config.telegram, cli.no_telegram) {
        (Some(telegram), false) => Some(telegram_notifier(telegram)?),
        _ => None,
    };

    let scheduler = FleetScheduler::new(ThreadBudget::from_limit(cli.threads_limit));
    info!(
        "scanning {} servers with thread budget {}",
        specs.len(),
        scheduler.budget()
    );

    let progress = cli.progress.then(MultiProgress::new);
    let resolver = DnsResolver::system();
    let workers = build_workers(specs, &resolver, progress.as_ref())?;
    let started_at = Utc::now();

    let (summary, alert) = match cli.output {
        OutputFormat::Plain => {
            output::print_run_header(workers.len(), &scheduler.budget().to_string());
            run_fleet(&scheduler, workers, ResultAggregator::stdout(), started_at).await
        }
        OutputFormat::Json | OutputFormat::Csv => {
            run_fleet(&scheduler, workers, ResultAggregator::new(io::sink()), started_at).await
        }
    };

    if let Some(progress) = &progress {
        progress.clear().context("failed to clear progress bars")?;
    }

    output::print_summary(&summary, cli.output).context("failed to write results")?;

    match (alert, notifier) {
        (Some(payload), Some(notifier)) => {
            info!("sending alert for {} warnings", summary.warnings.len());
            notifier
                .send(&payload)
                .await
                .context("failed to deliver alert")?;
        }
        (Some(_), None) => debug!("alerts disabled, {} warnings not sent", summary.warnings.len()),
        (None, _) => debug!("no warnings, nothing to send"),
    }

    Ok(())
}

fn telegram_notifier(telegram: &TelegramConfig) -> Result<TelegramNotifier> {
    TelegramNotifier::new(&telegram.token, telegram.chat_id.to_string())
        .context("failed to create Telegram client")
}

fn build_workers(
    specs: Vec<HostSpec>,
    resolver: &DnsResolver,
    progress: Option<&MultiProgress>,
) -> Result<Vec<HostWorker>> {
    let style = match progress {
        Some(_) => Some(
            ProgressStyle::with_template(
                "{spinner:.green} {msg:<16} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .context("invalid progress template")?
            .progress_chars("=>-"),
        ),
        None => None,
    };

    let workers = specs
        .into_iter()
        .map(|spec| {
            let name = spec.name.clone();
            let worker = HostWorker::tcp(spec).with_resolver(resolver.clone());
            match (progress, &style) {
                (Some(multi), Some(style)) => {
                    let pb = multi.add(ProgressBar::new(0));
                    pb.set_style(style.clone());
                    pb.set_message(name);
                    worker.with_progress(pb)
                }
                _ => worker,
            }
        })
        .collect();

    Ok(workers)
}

/// Scan the fleet into `aggregator`; returns the run summary and the alert
/// payload, if any warnings were raised.
async fn run_fleet<W: Write>(
    scheduler: &FleetScheduler,
    workers: Vec<HostWorker>,
    aggregator: ResultAggregator<W>,
    started_at: chrono::DateTime<Utc>,
) -> (RunSummary, Option<String>) {
    let FleetSummary {
        hosts,
        failed,
        peak_cost,
    } = scheduler.run(workers, &aggregator).await;
    info!("{hosts} servers scanned, {failed} failed, peak thread cost {peak_cost}");

    let alert = aggregator
        .has_warnings()
        .then(|| aggregator.build_alert_payload());
    (RunSummary::collect(&aggregator, started_at), alert)
}
