use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use aws_sdk_cloudwatch::Client;

use crate::collector::snapshot::Snapshot;
use crate::error::{CistatError, Result};

// PutMetricData accepts at most 20 data per call
const MAX_DATA_PER_CALL: usize = 20;

/// Puts snapshot counters into CloudWatch, dimensioned by queue and
/// pipeline. Credentials and region come from the default AWS
/// environment chain.
pub struct CloudwatchExporter {
    client: Client,
    namespace: String,
}

impl CloudwatchExporter {
    pub async fn new(namespace: &str) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        Self {
            client: Client::new(&config),
            namespace: namespace.to_string(),
        }
    }

    pub async fn export(&self, snapshot: &Snapshot) -> Result<()> {
        for chunk in metric_data(snapshot).chunks(MAX_DATA_PER_CALL) {
            self.client
                .put_metric_data()
                .namespace(&self.namespace)
                .set_metric_data(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| CistatError::Cloudwatch(e.to_string()))?;
        }
        Ok(())
    }
}

fn metric_data(snapshot: &Snapshot) -> Vec<MetricDatum> {
    let mut data = Vec::new();

    for (name, value) in &snapshot.totals {
        data.push(datum(name, *value, None));
    }
    for (queue, counts) in &snapshot.queues {
        for (name, value) in counts {
            data.push(datum(&format!("queues.{name}"), *value, Some(("Queue", queue))));
        }
    }
    for (pipeline, counts) in &snapshot.pipelines {
        for (name, value) in counts {
            data.push(datum(
                &format!("pipelines.{name}"),
                *value,
                Some(("Pipeline", pipeline)),
            ));
        }
    }

    data
}

#[allow(clippy::cast_precision_loss)]
fn datum(name: &str, value: u64, dimension: Option<(&str, &str)>) -> MetricDatum {
    let mut builder = MetricDatum::builder()
        .metric_name(name)
        .value(value as f64)
        .unit(StandardUnit::Count);

    if let Some((dimension_name, dimension_value)) = dimension {
        builder = builder.dimensions(
            Dimension::builder()
                .name(dimension_name)
                .value(dimension_value)
                .build(),
        );
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.record_build("default", "app", "running");
        snapshot.record_build("deploy", "app", "failed");
        snapshot.record_agent("default", "idle");
        snapshot
    }

    #[test]
    fn test_metric_data_covers_all_dimensions() {
        let data = metric_data(&sample());

        // 3 totals + 3 queue entries + 2 pipeline entries
        assert_eq!(data.len(), 8);

        let totals: Vec<_> = data
            .iter()
            .filter(|d| d.dimensions().is_empty())
            .collect();
        assert_eq!(totals.len(), 3);

        let queue_data: Vec<_> = data
            .iter()
            .filter(|d| {
                d.dimensions()
                    .iter()
                    .any(|dim| dim.name() == Some("Queue"))
            })
            .collect();
        assert_eq!(queue_data.len(), 3);
        assert!(queue_data
            .iter()
            .any(|d| d.metric_name() == Some("queues.builds.failed")));
    }

    #[test]
    fn test_datum_carries_value_and_unit() {
        let datum = datum("builds.running", 7, Some(("Queue", "deploy")));

        assert_eq!(datum.metric_name(), Some("builds.running"));
        assert_eq!(datum.value(), Some(7.0));
        assert_eq!(datum.unit(), Some(&StandardUnit::Count));
        assert_eq!(datum.dimensions()[0].value(), Some("deploy"));
    }
}
