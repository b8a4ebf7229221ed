use std::collections::BTreeMap;

type Counts = BTreeMap<String, u64>;

/// Aggregated counters for one collection cycle.
///
/// Built fresh on every [`Collector::collect`](super::Collector::collect)
/// call and never mutated after it is returned, so it can be handed to any
/// number of exporters without synchronization. Every counter appearing in
/// a queue or pipeline breakdown also appears, summed, in `totals`.
///
/// Sorted maps keep iteration order stable, which is what makes
/// [`dump`](Snapshot::dump) deterministic.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Counter name to count, organization-wide
    pub totals: Counts,
    /// Per-queue breakdown of the same counters
    pub queues: BTreeMap<String, Counts>,
    /// Per-pipeline breakdown (builds only; agents have no pipeline)
    pub pipelines: BTreeMap<String, Counts>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one build under its state, queue and pipeline.
    pub fn record_build(&mut self, queue: &str, pipeline: &str, state: &str) {
        let counter = format!("builds.{state}");
        bump(&mut self.totals, &counter);
        bump(self.queues.entry(queue.to_string()).or_default(), &counter);
        bump(
            self.pipelines.entry(pipeline.to_string()).or_default(),
            &counter,
        );
    }

    /// Count one agent under its status and queue.
    pub fn record_agent(&mut self, queue: &str, status: &str) {
        let counter = format!("agents.{status}");
        bump(&mut self.totals, &counter);
        bump(self.queues.entry(queue.to_string()).or_default(), &counter);
    }

    /// Render the snapshot as sorted text: totals first, then queues,
    /// then pipelines. Byte-identical across calls on the same snapshot,
    /// so output can be diffed between runs.
    pub fn dump(&self) -> String {
        let mut out = String::new();

        for (name, value) in &self.totals {
            out.push_str(&format!("{name}={value}\n"));
        }
        for (queue, counts) in &self.queues {
            for (name, value) in counts {
                out.push_str(&format!("queues.{name}={value} [queue={queue}]\n"));
            }
        }
        for (pipeline, counts) in &self.pipelines {
            for (name, value) in counts {
                out.push_str(&format!(
                    "pipelines.{name}={value} [pipeline={pipeline}]\n"
                ));
            }
        }

        out
    }
}

fn bump(counts: &mut Counts, counter: &str) {
    *counts.entry(counter.to_string()).or_insert(0) += 1;
}
