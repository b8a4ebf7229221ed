use tokio::net::UdpSocket;

use crate::collector::snapshot::Snapshot;
use crate::error::Result;

// Conservative fit for a 1500-byte MTU
const MAX_DATAGRAM_BYTES: usize = 1400;

/// Sends snapshot counters as gauges in the Datadog StatsD format:
/// queue and pipeline breakdowns are tagged, totals are not.
pub struct StatsdExporter {
    socket: UdpSocket,
    namespace: String,
}

impl StatsdExporter {
    /// Create an exporter sending to `host` (a `host:port` pair), with
    /// every metric name prefixed by `namespace`.
    pub async fn new(host: &str, namespace: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(host).await?;

        Ok(Self {
            socket,
            namespace: namespace.to_string(),
        })
    }

    pub async fn export(&self, snapshot: &Snapshot) -> Result<()> {
        for packet in packets(&gauge_lines(&self.namespace, snapshot)) {
            self.socket.send(packet.as_bytes()).await?;
        }
        Ok(())
    }
}

fn gauge_lines(namespace: &str, snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();

    for (name, value) in &snapshot.totals {
        lines.push(format!("{namespace}.{name}:{value}|g"));
    }
    for (queue, counts) in &snapshot.queues {
        for (name, value) in counts {
            lines.push(format!("{namespace}.queues.{name}:{value}|g|#queue:{queue}"));
        }
    }
    for (pipeline, counts) in &snapshot.pipelines {
        for (name, value) in counts {
            lines.push(format!(
                "{namespace}.pipelines.{name}:{value}|g|#pipeline:{pipeline}"
            ));
        }
    }

    lines
}

/// Pack gauge lines into newline-separated datagrams under the size limit.
fn packets(lines: &[String]) -> Vec<String> {
    let mut packets = Vec::new();
    let mut current = String::new();

    for line in lines {
        if !current.is_empty() && current.len() + line.len() + 1 > MAX_DATAGRAM_BYTES {
            packets.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        packets.push(current);
    }

    packets
}
