pub mod cloudwatch;
pub mod statsd;

pub use cloudwatch::CloudwatchExporter;
pub use statsd::StatsdExporter;

use crate::collector::snapshot::Snapshot;
use crate::error::Result;

/// Monitoring backends a snapshot can be forwarded to. A closed set
/// selected at startup by configuration; every variant consumes the
/// snapshot read-only and may fail without touching it.
pub enum Exporter {
    /// Print the sorted dump to stdout
    Console,
    /// Send gauges to a StatsD daemon over UDP
    Statsd(StatsdExporter),
    /// Put metric data into CloudWatch
    Cloudwatch(CloudwatchExporter),
}

impl Exporter {
    pub async fn export(&self, snapshot: &Snapshot) -> Result<()> {
        match self {
            Exporter::Console => {
                print!("{}", snapshot.dump());
                Ok(())
            }
            Exporter::Statsd(exporter) => exporter.export(snapshot).await,
            Exporter::Cloudwatch(exporter) => exporter.export(snapshot).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Exporter::Console => "console",
            Exporter::Statsd(_) => "statsd",
            Exporter::Cloudwatch(_) => "cloudwatch",
        }
    }
}
