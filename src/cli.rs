use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use tokio::time::MissedTickBehavior;

use crate::auth::Token;
use crate::collector::{Collector, Opts};
use crate::config::Config;
use crate::exporters::{CloudwatchExporter, Exporter, StatsdExporter};
use crate::providers::buildkite::client::BuildkiteClient;

#[derive(Parser)]
#[command(name = "cistat")]
#[command(author, version, about = "CI build and agent metrics collector", long_about = None)]
pub struct Cli {
    /// Buildkite API access token
    #[arg(short, long, env = "BUILDKITE_TOKEN")]
    token: Option<String>,

    /// Buildkite organization slug
    #[arg(short, long, env = "BUILDKITE_ORG")]
    org: Option<String>,

    /// REST API endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Only count builds and agents on this queue
    #[arg(short, long)]
    queue: Option<String>,

    /// How far back finished builds are counted (e.g. 30m, 24h)
    #[arg(long, default_value = "24h", value_parser = parse_duration)]
    history: Duration,

    /// Collect every interval instead of once (e.g. 60s; 0 disables)
    #[arg(short, long, default_value = "0", value_parser = parse_duration)]
    interval: Duration,

    /// Backends to export snapshots to
    #[arg(short, long, value_enum)]
    backend: Vec<Backend>,

    /// StatsD host to send gauges to
    #[arg(long)]
    statsd_host: Option<String>,

    /// Namespace prefixed to every metric name
    #[arg(long)]
    namespace: Option<String>,

    /// Collect and dump without exporting
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Suppress the snapshot dump
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Log every classified record
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Path to a configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Console,
    Statsd,
    Cloudwatch,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let token = self
            .token
            .clone()
            .or_else(|| config.buildkite.token.clone())
            .context("Must provide an API access token (--token or BUILDKITE_TOKEN)")?;
        let org = self
            .org
            .clone()
            .or_else(|| config.buildkite.org.clone())
            .context("Must provide an organization slug (--org or BUILDKITE_ORG)")?;
        let endpoint = self
            .endpoint
            .clone()
            .unwrap_or_else(|| config.buildkite.endpoint.clone());
        let queue = self.queue.clone().or_else(|| config.buildkite.queue.clone());
        let namespace = self
            .namespace
            .clone()
            .unwrap_or_else(|| config.export.namespace.clone());
        let statsd_host = self
            .statsd_host
            .clone()
            .unwrap_or_else(|| config.export.statsd_host.clone());

        let client = BuildkiteClient::new(&endpoint, &Token::from(token))?;
        let collector = Collector::new(
            client,
            Opts {
                org: org.clone(),
                queue,
                history: self.history,
                debug: self.debug,
            },
        );

        let exporters = if self.dry_run {
            Vec::new()
        } else {
            self.build_exporters(&namespace, &statsd_host).await?
        };

        info!("Collecting metrics for organization: {org}");

        if self.interval.is_zero() {
            return self.run_cycle(&collector, &exporters).await;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Cycles are serialized: the next tick waits for this one.
            // A failed cycle is logged and retried on the next tick.
            ticker.tick().await;
            if let Err(e) = self.run_cycle(&collector, &exporters).await {
                error!("Collection cycle failed: {e:#}");
            }
        }
    }

    async fn run_cycle(&self, collector: &Collector, exporters: &[Exporter]) -> Result<()> {
        let started = Instant::now();

        let snapshot = collector.collect().await?;

        if !self.quiet {
            print!("{}", snapshot.dump());
        }

        for exporter in exporters {
            exporter
                .export(&snapshot)
                .await
                .with_context(|| format!("Failed to export to {}", exporter.name()))?;
        }

        info!("Finished in {:?}", started.elapsed());
        Ok(())
    }

    async fn build_exporters(&self, namespace: &str, statsd_host: &str) -> Result<Vec<Exporter>> {
        let mut exporters = Vec::new();

        for backend in &self.backend {
            exporters.push(match backend {
                Backend::Console => Exporter::Console,
                Backend::Statsd => {
                    Exporter::Statsd(StatsdExporter::new(statsd_host, namespace).await?)
                }
                Backend::Cloudwatch => {
                    Exporter::Cloudwatch(CloudwatchExporter::new(namespace).await)
                }
            });
        }

        Ok(exporters)
    }
}

/// Parse durations like "90s", "10m", "24h" or plain seconds.
fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();

    let (number, multiplier) = match value.chars().last() {
        Some('s') => (&value[..value.len() - 1], 1),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('h') => (&value[..value.len() - 1], 3600),
        _ => (value, 1),
    };

    let seconds: u64 = number
        .parse()
        .map_err(|_| format!("Invalid duration: {value}"))?;

    Ok(Duration::from_secs(seconds * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("ten minutes").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["cistat", "--org", "acme", "--token", "t"]).unwrap();
        assert_eq!(cli.history, Duration::from_secs(86_400));
        assert_eq!(cli.interval, Duration::ZERO);
        assert!(cli.backend.is_empty());
        assert!(!cli.dry_run);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_accepts_multiple_backends() {
        let cli = Cli::try_parse_from([
            "cistat", "--org", "acme", "--token", "t", "--backend", "statsd", "--backend",
            "cloudwatch",
        ])
        .unwrap();
        assert_eq!(cli.backend, vec![Backend::Statsd, Backend::Cloudwatch]);
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        let result = Cli::try_parse_from([
            "cistat", "--org", "acme", "--token", "t", "--backend", "graphite",
        ]);
        assert!(result.is_err());
    }
}
